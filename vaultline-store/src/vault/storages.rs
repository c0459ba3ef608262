//! Storage lifecycle: create, initialise, close, terminate, list.

use super::{KeyContext, StorageSlot, VaultStore};
use crate::backend::BackendParams;
use crate::catalog::{StorageConfig, now_millis};
use crate::error::{StoreError, StoreResult};
use tracing::info;
use vaultline_crypto::{open_json, seal_json};
use vaultline_types::{Changed, Diff, GroupId, StorageId, StorageInfo, StorageState};

/// Parameters of `create_storage`.
#[derive(Debug, Clone, Default)]
pub struct NewStorage {
    pub name: String,
    pub description: Option<String>,
    /// `None` creates the storage in the public group.
    pub visibility_group_id: Option<GroupId>,
    /// Explicit backend parameters; the host defaults apply when absent.
    pub backend: Option<BackendParams>,
}

impl VaultStore {
    /// Registers a new storage for the signed-in account.
    ///
    /// The backend parameters are sealed under the target group's key, so
    /// the group must be open. Storage names are unique per account.
    pub fn create_storage(
        &self,
        ctx: &KeyContext<'_>,
        new: NewStorage,
    ) -> StoreResult<Changed<StorageInfo>> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("storage name must not be empty".into()));
        }

        let owner = ctx.owner();
        if let Some(group_id) = new.visibility_group_id {
            match self.catalog.get_group(&group_id)? {
                Some(group) if group.owner == owner => {}
                _ => return Err(StoreError::NotFound(format!("visibility group {group_id}"))),
            }
        }
        let key = ctx.key_for(new.visibility_group_id)?;

        if self.catalog.storage_name_taken(&owner, name)? {
            return Err(StoreError::NotUnique {
                scope: "storage",
                name: name.to_string(),
            });
        }

        let id = StorageId::new();
        let params = new
            .backend
            .unwrap_or_else(|| self.defaults.params_for(&id));
        self.backends.get(params.kind())?;

        let config = StorageConfig {
            id,
            owner,
            name: name.to_string(),
            description: new.description,
            visibility_group_id: new.visibility_group_id,
            backend_kind: params.kind(),
            sealed_params: seal_json(&key, &params)?,
            created_at: now_millis(),
        };
        self.catalog.insert_storage(&config)?;

        Ok(Changed {
            info: config.info(StorageState::Configured, false),
            diff: Diff::added(id),
        })
    }

    /// Opens the storage's backend. Fails with `GroupLocked` while the
    /// owning group is closed. Initialising an open storage is a no-op.
    pub fn initialise_storage(
        &self,
        ctx: &KeyContext<'_>,
        id: &StorageId,
    ) -> StoreResult<Changed<StorageInfo>> {
        let config = self.owned_config(ctx, id)?;
        let key = ctx.key_for(config.visibility_group_id)?;

        let state = self.storage_state(id);
        if state.is_usable() {
            return Ok(Changed::unchanged(config.info(state, false)));
        }

        let params: BackendParams = open_json(&key, &config.sealed_params)?;
        let conn = self.backends.open(&params)?;
        self.lock_slots().insert(
            *id,
            StorageSlot {
                state: StorageState::Initialised,
                conn: Some(conn),
            },
        );

        info!(storage_id = %id, backend = config.backend_kind.as_str(), "storage initialised");
        Ok(Changed::unchanged(config.info(StorageState::Initialised, false)))
    }

    pub fn close_storage(
        &self,
        ctx: &KeyContext<'_>,
        id: &StorageId,
    ) -> StoreResult<Changed<StorageInfo>> {
        let config = self.owned_config(ctx, id)?;
        if !self.close_slot(id)? {
            return Err(StoreError::InvalidState(format!("storage {id} is not open")));
        }
        Ok(Changed::unchanged(config.info(
            StorageState::Closed,
            ctx.is_locked(config.visibility_group_id),
        )))
    }

    /// Drops the connection of an open storage. Returns false if it was
    /// not open.
    fn close_slot(&self, id: &StorageId) -> StoreResult<bool> {
        let conn = {
            let mut slots = self.lock_slots();
            match slots.get_mut(id) {
                Some(slot) if slot.state.is_usable() => {
                    slot.state = StorageState::Closed;
                    slot.conn.take()
                }
                _ => return Ok(false),
            }
        };
        if let Some(conn) = conn {
            conn.close()?;
        }
        info!(storage_id = %id, "storage closed");
        Ok(true)
    }

    /// Deletes the storage configuration and releases backend resources.
    /// The returned view is the last one: its state is `Terminated` and the
    /// storage id is gone from every later listing.
    pub fn terminate_storage(
        &self,
        ctx: &KeyContext<'_>,
        id: &StorageId,
    ) -> StoreResult<Changed<StorageInfo>> {
        let config = self.owned_config(ctx, id)?;
        let key = ctx.key_for(config.visibility_group_id)?;
        let params: BackendParams = open_json(&key, &config.sealed_params)?;

        let slot = self.lock_slots().remove(id);
        if let Some(conn) = slot.and_then(|s| s.conn) {
            for template in conn.templates(None)? {
                self.schemas.invalidate(&template.id);
            }
            conn.close()?;
        }

        self.backends.destroy(&params)?;
        self.catalog.delete_storage(id)?;

        info!(storage_id = %id, "storage terminated");
        Ok(Changed {
            info: config.info(StorageState::Terminated, false),
            diff: Diff::removed([*id]),
        })
    }

    /// Closes every open storage bound to one of `group_ids`.
    pub fn close_group_storages(&self, group_ids: &[GroupId]) -> StoreResult<Vec<StorageId>> {
        let open: Vec<StorageId> = self
            .lock_slots()
            .iter()
            .filter(|(_, slot)| slot.state.is_usable())
            .map(|(id, _)| *id)
            .collect();

        let mut closed = Vec::new();
        for id in open {
            let bound = self
                .catalog
                .get_storage(&id)?
                .and_then(|c| c.visibility_group_id)
                .is_some_and(|g| group_ids.contains(&g));
            if bound && self.close_slot(&id)? {
                closed.push(id);
            }
        }
        Ok(closed)
    }

    /// Closes every open storage of the signed-in account.
    pub fn close_account_storages(&self, ctx: &KeyContext<'_>) -> StoreResult<Vec<StorageId>> {
        let mut closed = Vec::new();
        for config in self.catalog.list_storages(&ctx.owner())? {
            if self.close_slot(&config.id)? {
                closed.push(config.id);
            }
        }
        Ok(closed)
    }

    pub fn list_storages_info(&self, ctx: &KeyContext<'_>) -> StoreResult<Vec<StorageInfo>> {
        let configs = self.catalog.list_storages(&ctx.owner())?;
        Ok(configs
            .iter()
            .map(|c| {
                c.info(
                    self.storage_state(&c.id),
                    ctx.is_locked(c.visibility_group_id),
                )
            })
            .collect())
    }

    pub fn storage_info(&self, ctx: &KeyContext<'_>, id: &StorageId) -> StoreResult<StorageInfo> {
        let config = self.owned_config(ctx, id)?;
        Ok(config.info(
            self.storage_state(id),
            ctx.is_locked(config.visibility_group_id),
        ))
    }
}
