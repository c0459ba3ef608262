use crate::error::{GroupError, GroupResult};
use serde::{Deserialize, Serialize};
use vaultline_crypto::{
    DerivedKey, KdfParams, KeyCheck, PasswordVerifier, Salt, derive_key, is_derived_key_valid,
};
use vaultline_types::{AccountId, GroupId, GroupInfo};

/// The persisted form of a visibility group.
///
/// Holds everything needed to check a password and re-derive the group key,
/// but never the key itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityGroup {
    pub id: GroupId,
    pub owner: AccountId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub verifier: PasswordVerifier,
    /// Salt of the key derivation. Independent of the verifier salt.
    pub key_salt: Salt,
    pub key_check: KeyCheck,
    pub kdf: KdfParams,
}

impl VisibilityGroup {
    /// Derives the group key if `password` is the group password.
    ///
    /// Returns `Ok(None)` for a wrong password.
    pub fn unlock(&self, password: &str) -> GroupResult<Option<DerivedKey>> {
        if !self.verifier.verify(password)? {
            return Ok(None);
        }
        let key = derive_key(password, &self.key_salt, &self.kdf)?;
        if !is_derived_key_valid(&key, &self.key_check) {
            tracing::warn!(group_id = %self.id, "verifier accepted password but key check failed");
            return Ok(None);
        }
        Ok(Some(key))
    }

    pub fn info(&self, is_open: bool) -> GroupInfo {
        GroupInfo {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            is_open,
        }
    }
}

/// A freshly created group together with its key, so the creator does not
/// pay for a second derivation.
#[derive(Debug)]
pub struct ProvisionedGroup {
    pub group: VisibilityGroup,
    pub key: DerivedKey,
}

/// Builds a new group record: verifier, key salt and key-check token.
pub fn provision_group(
    owner: AccountId,
    name: &str,
    description: Option<String>,
    password: &str,
    kdf: &KdfParams,
) -> GroupResult<ProvisionedGroup> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GroupError::EmptyName);
    }

    let verifier = PasswordVerifier::create(password, kdf)?;
    let key_salt = Salt::random();
    let key = derive_key(password, &key_salt, kdf)?;
    let key_check = KeyCheck::new(&key)?;

    let group = VisibilityGroup {
        id: GroupId::new(),
        owner,
        name: name.to_string(),
        description,
        verifier,
        key_salt,
        key_check,
        kdf: *kdf,
    };
    Ok(ProvisionedGroup { group, key })
}

/// Where group records come from.
pub trait GroupSource {
    fn load_group(&self, id: &GroupId) -> GroupResult<Option<VisibilityGroup>>;

    fn list_groups(&self, owner: &AccountId) -> GroupResult<Vec<VisibilityGroup>>;
}
