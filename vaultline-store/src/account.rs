//! Accounts and the signed-in session.

use crate::error::StoreResult;
use vaultline_crypto::{
    DerivedKey, EncryptedData, KdfParams, PasswordVerifier, Salt, derive_key, generate_random_key,
    open, seal,
};
use vaultline_types::{AccountId, AccountInfo, Username};

/// The persisted account row.
///
/// `verifier` carries the password hash and its salt. The account key,
/// which protects storages in the public group, is stored sealed under a
/// key derived from the same password with `account_key_salt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub id: AccountId,
    pub username: Username,
    pub verifier: PasswordVerifier,
    pub account_key_salt: Salt,
    pub sealed_account_key: EncryptedData,
    pub kdf: KdfParams,
}

impl AccountRecord {
    /// Creates a new account with a fresh account key.
    pub fn create(username: Username, password: &str, kdf: &KdfParams) -> StoreResult<Self> {
        let verifier = PasswordVerifier::create(password, kdf)?;
        let account_key_salt = Salt::random();
        let wrapping_key = derive_key(password, &account_key_salt, kdf)?;
        let account_key = generate_random_key();
        let sealed_account_key = seal(&wrapping_key, account_key.as_bytes())?;

        Ok(Self {
            id: AccountId::new(),
            username,
            verifier,
            account_key_salt,
            sealed_account_key,
            kdf: *kdf,
        })
    }

    /// Checks `password` and recovers the account key.
    ///
    /// Returns `Ok(None)` for a wrong password.
    pub fn unlock(&self, password: &str) -> StoreResult<Option<AccountSession>> {
        if !self.verifier.verify(password)? {
            return Ok(None);
        }
        let wrapping_key = derive_key(password, &self.account_key_salt, &self.kdf)?;
        let raw = open(&wrapping_key, &self.sealed_account_key)?;
        let account_key = DerivedKey::from_slice(&raw)?;
        Ok(Some(AccountSession {
            info: self.info(),
            account_key,
        }))
    }

    pub fn info(&self) -> AccountInfo {
        AccountInfo {
            id: self.id,
            username: self.username.to_string(),
        }
    }
}

/// A signed-in account. Holds the public-group key in memory only.
#[derive(Debug, Clone)]
pub struct AccountSession {
    pub info: AccountInfo,
    account_key: DerivedKey,
}

impl AccountSession {
    pub fn account_id(&self) -> AccountId {
        self.info.id
    }

    /// Key for storages that are not bound to a visibility group.
    pub fn public_group_key(&self) -> &DerivedKey {
        &self.account_key
    }
}
