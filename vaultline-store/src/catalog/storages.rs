//! Data storage configuration rows.
//!
//! Names and the backend kind are catalog metadata. The backend parameters
//! (paths, file names) are sealed under the storage's group key.

use super::{Catalog, parse_id};
use crate::error::{StoreError, StoreResult};
use rusqlite::{OptionalExtension, params};
use tracing::info;
use vaultline_crypto::EncryptedData;
use vaultline_types::{AccountId, BackendKind, GroupId, StorageId, StorageInfo, StorageState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub id: StorageId,
    pub owner: AccountId,
    pub name: String,
    pub description: Option<String>,
    /// `None` places the storage in the account's public group.
    pub visibility_group_id: Option<GroupId>,
    pub backend_kind: BackendKind,
    pub sealed_params: EncryptedData,
    pub created_at: i64,
}

impl StorageConfig {
    pub fn info(&self, state: StorageState, locked: bool) -> StorageInfo {
        StorageInfo {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            visibility_group_id: self.visibility_group_id,
            backend_kind: self.backend_kind,
            state,
            locked,
        }
    }
}

type StorageRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    i64,
);

const SELECT_STORAGE: &str = "SELECT id, owner_id, name, description, visibility_group_id, \
     backend_kind, sealed_params, created_at FROM data_storages";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StorageRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn config_from_row(row: StorageRow) -> StoreResult<StorageConfig> {
    let (id, owner, name, description, group, kind, sealed_json, created_at) = row;
    Ok(StorageConfig {
        id: parse_id(&id)?,
        owner: parse_id(&owner)?,
        name,
        description,
        visibility_group_id: group.as_deref().map(parse_id::<GroupId>).transpose()?,
        backend_kind: BackendKind::parse(&kind)
            .ok_or_else(|| StoreError::InvalidState(format!("unknown backend kind '{kind}'")))?,
        sealed_params: serde_json::from_str(&sealed_json)?,
        created_at,
    })
}

impl Catalog {
    pub fn storage_name_taken(&self, owner: &AccountId, name: &str) -> StoreResult<bool> {
        let conn = self.lock_conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM data_storages WHERE owner_id = ? AND name = ?",
            params![owner.to_string(), name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn insert_storage(&self, config: &StorageConfig) -> StoreResult<()> {
        if self.storage_name_taken(&config.owner, &config.name)? {
            return Err(StoreError::NotUnique {
                scope: "storage",
                name: config.name.clone(),
            });
        }

        let conn = self.lock_conn();
        conn.execute(
            "INSERT INTO data_storages (id, owner_id, name, description, visibility_group_id, \
             backend_kind, sealed_params, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                config.id.to_string(),
                config.owner.to_string(),
                config.name,
                config.description,
                config.visibility_group_id.map(|g| g.to_string()),
                config.backend_kind.as_str(),
                serde_json::to_string(&config.sealed_params)?,
                config.created_at,
            ],
        )?;
        info!(storage_id = %config.id, backend = config.backend_kind.as_str(), "storage configured");
        Ok(())
    }

    pub fn get_storage(&self, id: &StorageId) -> StoreResult<Option<StorageConfig>> {
        let conn = self.lock_conn();
        let row = conn
            .query_row(
                &format!("{SELECT_STORAGE} WHERE id = ?"),
                params![id.to_string()],
                map_row,
            )
            .optional()?;
        drop(conn);
        row.map(config_from_row).transpose()
    }

    pub fn list_storages(&self, owner: &AccountId) -> StoreResult<Vec<StorageConfig>> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(&format!(
            "{SELECT_STORAGE} WHERE owner_id = ? ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
            .query_map(params![owner.to_string()], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);
        rows.into_iter().map(config_from_row).collect()
    }

    pub fn delete_storage(&self, id: &StorageId) -> StoreResult<()> {
        let conn = self.lock_conn();
        let deleted = conn.execute(
            "DELETE FROM data_storages WHERE id = ?",
            params![id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("storage {id}")));
        }
        info!(storage_id = %id, "storage configuration removed");
        Ok(())
    }
}
