//! Visibility group rows.

use super::{Catalog, now_millis};
use crate::error::{StoreError, StoreResult};
use rusqlite::{OptionalExtension, params};
use tracing::info;
use vaultline_groups::{GroupError, GroupResult, GroupSource, VisibilityGroup};
use vaultline_types::{AccountId, GroupId};

impl Catalog {
    /// Persists a provisioned group. Names are unique per owner.
    pub fn insert_group(&self, group: &VisibilityGroup) -> StoreResult<()> {
        let conn = self.lock_conn();
        let taken: i64 = conn.query_row(
            "SELECT COUNT(*) FROM visibility_groups WHERE owner_id = ? AND name = ?",
            params![group.owner.to_string(), group.name],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(StoreError::NotUnique {
                scope: "visibility group",
                name: group.name.clone(),
            });
        }

        conn.execute(
            "INSERT INTO visibility_groups (id, owner_id, name, record_json, created_at) \
             VALUES (?, ?, ?, ?, ?)",
            params![
                group.id.to_string(),
                group.owner.to_string(),
                group.name,
                serde_json::to_string(group)?,
                now_millis(),
            ],
        )?;
        info!(group_id = %group.id, "visibility group created");
        Ok(())
    }

    pub fn get_group(&self, id: &GroupId) -> StoreResult<Option<VisibilityGroup>> {
        let conn = self.lock_conn();
        let json: Option<String> = conn
            .query_row(
                "SELECT record_json FROM visibility_groups WHERE id = ?",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        drop(conn);
        json.map(|j| serde_json::from_str(&j).map_err(StoreError::from))
            .transpose()
    }

    pub fn groups_of(&self, owner: &AccountId) -> StoreResult<Vec<VisibilityGroup>> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(
            "SELECT record_json FROM visibility_groups WHERE owner_id = ? ORDER BY created_at, rowid",
        )?;
        let rows = stmt
            .query_map(params![owner.to_string()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        rows.iter()
            .map(|j| serde_json::from_str(j).map_err(StoreError::from))
            .collect()
    }

    /// Removes a group. Refused while any storage is still bound to it.
    pub fn delete_group(&self, owner: &AccountId, id: &GroupId) -> StoreResult<()> {
        let conn = self.lock_conn();
        let bound: i64 = conn.query_row(
            "SELECT COUNT(*) FROM data_storages WHERE visibility_group_id = ?",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        if bound > 0 {
            return Err(StoreError::InvalidState(format!(
                "visibility group {id} still has {bound} storage(s)"
            )));
        }

        let deleted = conn.execute(
            "DELETE FROM visibility_groups WHERE id = ? AND owner_id = ?",
            params![id.to_string(), owner.to_string()],
        )?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("visibility group {id}")));
        }
        info!(group_id = %id, "visibility group deleted");
        Ok(())
    }
}

impl GroupSource for Catalog {
    fn load_group(&self, id: &GroupId) -> GroupResult<Option<VisibilityGroup>> {
        self.get_group(id)
            .map_err(|e| GroupError::Source(e.to_string()))
    }

    fn list_groups(&self, owner: &AccountId) -> GroupResult<Vec<VisibilityGroup>> {
        self.groups_of(owner)
            .map_err(|e| GroupError::Source(e.to_string()))
    }
}
