//! Account rows: sign-up, sign-in and lookups.

use super::{Catalog, now_millis, parse_id, salt_from_blob};
use crate::account::{AccountRecord, AccountSession};
use crate::error::{StoreError, StoreResult};
use rusqlite::{OptionalExtension, params};
use tracing::info;
use vaultline_crypto::{EncryptedData, KdfParams, PasswordVerifier};
use vaultline_types::{AccountId, AccountInfo, Username};

type AccountRow = (String, String, Vec<u8>, Vec<u8>, String, Vec<u8>, String);

const SELECT_ACCOUNT: &str = "SELECT id, username, password_hash, password_salt, kdf_json, \
     account_key_salt, sealed_account_key FROM accounts";

fn record_from_row(row: AccountRow) -> StoreResult<AccountRecord> {
    let (id, username, hash, salt, kdf_json, key_salt, sealed_json) = row;
    let kdf: KdfParams = serde_json::from_str(&kdf_json)?;
    let sealed_account_key: EncryptedData = serde_json::from_str(&sealed_json)?;
    Ok(AccountRecord {
        id: parse_id(&id)?,
        username: Username::parse(&username)
            .map_err(|e| StoreError::InvalidState(format!("corrupt username in catalog: {e}")))?,
        verifier: PasswordVerifier {
            hash,
            salt: salt_from_blob(&salt)?,
            params: kdf,
        },
        account_key_salt: salt_from_blob(&key_salt)?,
        sealed_account_key,
        kdf,
    })
}

impl Catalog {
    /// Registers a new account. Usernames are unique across the catalog.
    pub fn sign_up(
        &self,
        username: &Username,
        password: &str,
        kdf: &KdfParams,
    ) -> StoreResult<AccountInfo> {
        if self.find_account(username)?.is_some() {
            return Err(StoreError::NotUnique {
                scope: "account",
                name: username.to_string(),
            });
        }

        let record = AccountRecord::create(username.clone(), password, kdf)?;
        let conn = self.lock_conn();
        conn.execute(
            "INSERT INTO accounts (id, username, password_hash, password_salt, kdf_json, \
             account_key_salt, sealed_account_key, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.id.to_string(),
                record.username.as_str(),
                record.verifier.hash,
                record.verifier.salt.as_bytes().to_vec(),
                serde_json::to_string(&record.kdf)?,
                record.account_key_salt.as_bytes().to_vec(),
                serde_json::to_string(&record.sealed_account_key)?,
                now_millis(),
            ],
        )?;

        info!(account_id = %record.id, "account created");
        Ok(record.info())
    }

    /// Checks credentials. Unknown usernames and wrong passwords both
    /// yield `Ok(None)`.
    pub fn sign_in(&self, username: &Username, password: &str) -> StoreResult<Option<AccountSession>> {
        let Some(record) = self.find_account(username)? else {
            return Ok(None);
        };
        let session = record.unlock(password)?;
        match &session {
            Some(s) => info!(account_id = %s.account_id(), "signed in"),
            None => info!(account_id = %record.id, "sign-in rejected"),
        }
        Ok(session)
    }

    pub fn find_account(&self, username: &Username) -> StoreResult<Option<AccountRecord>> {
        let conn = self.lock_conn();
        let row: Option<AccountRow> = conn
            .query_row(
                &format!("{SELECT_ACCOUNT} WHERE username = ?"),
                params![username.as_str()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .optional()?;
        drop(conn);
        row.map(record_from_row).transpose()
    }

    pub fn get_account(&self, id: &AccountId) -> StoreResult<AccountRecord> {
        let conn = self.lock_conn();
        let row: Option<AccountRow> = conn
            .query_row(
                &format!("{SELECT_ACCOUNT} WHERE id = ?"),
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .optional()?;
        drop(conn);
        match row {
            Some(row) => record_from_row(row),
            None => Err(StoreError::NotFound(format!("account {id}"))),
        }
    }

    pub fn account_count(&self) -> StoreResult<u64> {
        let conn = self.lock_conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
