use crate::error::GroupResult;
use crate::group::GroupSource;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use vaultline_crypto::DerivedKey;
use vaultline_types::{AccountId, GroupId};

/// Keys of the currently open visibility groups.
///
/// Owned by the host for the lifetime of one signed-in session and passed
/// by reference to whatever needs to resolve a group key. Evicted keys are
/// zeroized when dropped.
#[derive(Default)]
pub struct GroupKeyring {
    keys: RwLock<HashMap<GroupId, DerivedKey>>,
}

impl GroupKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_keys(&self) -> RwLockReadGuard<'_, HashMap<GroupId, DerivedKey>> {
        self.keys.read().unwrap_or_else(|poisoned| {
            tracing::warn!("recovering from poisoned group keyring lock");
            poisoned.into_inner()
        })
    }

    fn write_keys(&self) -> RwLockWriteGuard<'_, HashMap<GroupId, DerivedKey>> {
        self.keys.write().unwrap_or_else(|poisoned| {
            tracing::warn!("recovering from poisoned group keyring lock");
            poisoned.into_inner()
        })
    }

    /// Opens one group. A wrong password or an unknown group yields
    /// `Ok(false)` and leaves the keyring untouched.
    pub fn open(
        &self,
        source: &dyn GroupSource,
        group_id: &GroupId,
        password: &str,
    ) -> GroupResult<bool> {
        let Some(group) = source.load_group(group_id)? else {
            tracing::debug!(group_id = %group_id, "open requested for unknown visibility group");
            return Ok(false);
        };

        match group.unlock(password)? {
            Some(key) => {
                self.write_keys().insert(group.id, key);
                tracing::info!(group_id = %group.id, "visibility group opened");
                Ok(true)
            }
            None => {
                tracing::debug!(group_id = %group.id, "visibility group password rejected");
                Ok(false)
            }
        }
    }

    /// Tries `password` against every closed group of `owner` and opens each
    /// one it matches. Returns how many groups were opened.
    pub fn open_by_password(
        &self,
        source: &dyn GroupSource,
        owner: &AccountId,
        password: &str,
    ) -> GroupResult<usize> {
        let mut opened = 0;
        for group in source.list_groups(owner)? {
            if self.is_open(&group.id) {
                continue;
            }
            if let Some(key) = group.unlock(password)? {
                self.write_keys().insert(group.id, key);
                opened += 1;
            }
        }
        tracing::info!(owner = %owner, opened, "opened visibility groups by password");
        Ok(opened)
    }

    /// Inserts a key obtained elsewhere, e.g. right after provisioning.
    pub fn admit(&self, group_id: GroupId, key: DerivedKey) {
        self.write_keys().insert(group_id, key);
    }

    /// Closes the given groups and returns those that were open.
    pub fn close(&self, group_ids: &[GroupId]) -> Vec<GroupId> {
        let mut keys = self.write_keys();
        let closed: Vec<GroupId> = group_ids
            .iter()
            .filter(|id| keys.remove(*id).is_some())
            .copied()
            .collect();
        drop(keys);
        for id in &closed {
            tracing::info!(group_id = %id, "visibility group closed");
        }
        closed
    }

    pub fn close_all(&self) -> Vec<GroupId> {
        let closed: Vec<GroupId> = self.write_keys().drain().map(|(id, _)| id).collect();
        if !closed.is_empty() {
            tracing::info!(count = closed.len(), "closed all visibility groups");
        }
        closed
    }

    pub fn key_for(&self, group_id: &GroupId) -> Option<DerivedKey> {
        self.read_keys().get(group_id).cloned()
    }

    pub fn is_open(&self, group_id: &GroupId) -> bool {
        self.read_keys().contains_key(group_id)
    }

    pub fn open_groups(&self) -> Vec<GroupId> {
        self.read_keys().keys().copied().collect()
    }
}

impl std::fmt::Debug for GroupKeyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupKeyring")
            .field("open_groups", &self.read_keys().len())
            .finish()
    }
}
