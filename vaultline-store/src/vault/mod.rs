//! The encrypted vault store.
//!
//! Operations are split by concern:
//! - `storages`: create / initialise / close / terminate storages
//! - `content`: boxes and templates
//! - `entries`: entry CRUD with positional validation

mod content;
mod entries;
mod storages;

pub use storages::NewStorage;

use crate::account::AccountSession;
use crate::backend::{BackendDefaults, BackendRegistry, StorageConnection};
use crate::catalog::{Catalog, StorageConfig};
use crate::error::{StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use vaultline_crypto::DerivedKey;
use vaultline_groups::GroupKeyring;
use vaultline_schema::SchemaCache;
use vaultline_types::{AccountId, GroupId, StorageId, StorageState};

/// Where keys come from for one call: the signed-in account (public group)
/// and the keyring of open visibility groups.
#[derive(Debug, Clone, Copy)]
pub struct KeyContext<'a> {
    pub session: &'a AccountSession,
    pub keyring: &'a GroupKeyring,
}

impl<'a> KeyContext<'a> {
    pub fn new(session: &'a AccountSession, keyring: &'a GroupKeyring) -> Self {
        Self { session, keyring }
    }

    pub fn owner(&self) -> AccountId {
        self.session.account_id()
    }

    /// Resolves the key of a group, or of the public group for `None`.
    pub fn key_for(&self, group: Option<GroupId>) -> StoreResult<DerivedKey> {
        match group {
            None => Ok(self.session.public_group_key().clone()),
            Some(id) => self.keyring.key_for(&id).ok_or(StoreError::GroupLocked(id)),
        }
    }

    pub fn is_locked(&self, group: Option<GroupId>) -> bool {
        group.is_some_and(|id| !self.keyring.is_open(&id))
    }
}

struct StorageSlot {
    state: StorageState,
    conn: Option<Box<dyn StorageConnection>>,
}

/// Storages, boxes, templates and entries of all accounts on this host.
///
/// Only configuration lives in the [`Catalog`]. Open connections and the
/// lifecycle state of each storage are held here, per process.
pub struct VaultStore {
    catalog: Catalog,
    backends: BackendRegistry,
    defaults: BackendDefaults,
    schemas: SchemaCache,
    slots: Mutex<HashMap<StorageId, StorageSlot>>,
}

impl VaultStore {
    pub fn new(catalog: Catalog, backends: BackendRegistry, defaults: BackendDefaults) -> Self {
        Self {
            catalog,
            backends,
            defaults,
            schemas: SchemaCache::new(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<StorageId, StorageSlot>> {
        self.slots.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("recovering from poisoned storage slot mutex");
            poisoned.into_inner()
        })
    }

    /// Loads a storage config, hiding storages of other accounts.
    fn owned_config(&self, ctx: &KeyContext<'_>, id: &StorageId) -> StoreResult<StorageConfig> {
        match self.catalog.get_storage(id)? {
            Some(config) if config.owner == ctx.owner() => Ok(config),
            _ => Err(StoreError::NotFound(format!("storage {id}"))),
        }
    }

    pub fn storage_state(&self, id: &StorageId) -> StorageState {
        self.lock_slots()
            .get(id)
            .map_or(StorageState::Configured, |slot| slot.state)
    }

    /// Runs `f` against the open connection of a storage. The first call
    /// after initialisation moves the storage to `Active`.
    fn with_open<T>(
        &self,
        ctx: &KeyContext<'_>,
        storage_id: &StorageId,
        f: impl FnOnce(&mut dyn StorageConnection, &DerivedKey) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let config = self.owned_config(ctx, storage_id)?;
        let key = ctx.key_for(config.visibility_group_id)?;

        let mut slots = self.lock_slots();
        let slot = slots
            .get_mut(storage_id)
            .filter(|slot| slot.state.is_usable())
            .ok_or_else(|| {
                StoreError::InvalidState(format!("storage {storage_id} is not initialised"))
            })?;
        if slot.state == StorageState::Initialised {
            slot.state = StorageState::Active;
            tracing::debug!(storage_id = %storage_id, "storage active");
        }
        let conn = slot.conn.as_deref_mut().ok_or_else(|| {
            StoreError::InvalidState(format!("storage {storage_id} has no connection"))
        })?;
        f(conn, &key)
    }
}

impl std::fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore")
            .field("backends", &self.backends)
            .field("open_storages", &self.lock_slots().len())
            .finish_non_exhaustive()
    }
}
