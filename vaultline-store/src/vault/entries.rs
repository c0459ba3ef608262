//! Entries: validated, sealed value lists.

use super::content::open_template;
use super::{KeyContext, VaultStore};
use crate::backend::{EntryRecord, StorageConnection};
use crate::error::{StoreError, StoreResult};
use serde_json::Value;
use tracing::info;
use vaultline_crypto::{DerivedKey, open_json, seal_json};
use vaultline_types::{Changed, DataTemplate, Diff, EntryId, EntryInfo, StorageId, TemplateId};

fn open_entry(
    key: &DerivedKey,
    storage_id: &StorageId,
    record: &EntryRecord,
) -> StoreResult<EntryInfo> {
    let entry: EntryInfo = open_json(key, &record.sealed)?;
    if entry.id != record.id
        || entry.template_id != record.template_id
        || entry.box_id != record.box_id
        || entry.storage_id != *storage_id
    {
        return Err(StoreError::AuthFailure);
    }
    Ok(entry)
}

fn load_template(
    conn: &dyn StorageConnection,
    key: &DerivedKey,
    storage_id: &StorageId,
    template_id: &TemplateId,
) -> StoreResult<DataTemplate> {
    let record = conn
        .get_template(template_id)?
        .ok_or_else(|| StoreError::NotFound(format!("template {template_id}")))?;
    open_template(key, storage_id, &record)
}

impl VaultStore {
    /// Fills defaults, then validates `values` against the template's
    /// compiled schema.
    fn checked_values(&self, template: &DataTemplate, values: Vec<Value>) -> StoreResult<Vec<Value>> {
        let schema = self.schemas.get_or_compile(template.id, &template.fields)?;
        let values = schema.apply_defaults(values);
        schema.validate(&values)?;
        Ok(values)
    }

    /// Validates `values` positionally against the template, seals them
    /// and persists the entry.
    pub fn create_entry(
        &self,
        ctx: &KeyContext<'_>,
        storage_id: &StorageId,
        template_id: &TemplateId,
        values: Vec<Value>,
    ) -> StoreResult<Changed<EntryInfo>> {
        self.with_open(ctx, storage_id, |conn, key| {
            let template = load_template(conn, key, storage_id, template_id)?;
            let values = self.checked_values(&template, values)?;

            let entry = EntryInfo {
                id: EntryId::new(),
                storage_id: *storage_id,
                box_id: template.box_id,
                template_id: template.id,
                values,
            };
            conn.insert_entry(&EntryRecord {
                id: entry.id,
                box_id: entry.box_id,
                template_id: entry.template_id,
                sealed: seal_json(key, &entry)?,
            })?;

            info!(storage_id = %storage_id, entry_id = %entry.id, "entry created");
            Ok(Changed {
                diff: Diff::added(entry.id),
                info: entry,
            })
        })
    }

    /// Replaces an entry's values. The entry is resealed under a fresh IV;
    /// the diff is empty since nothing is added or removed.
    pub fn update_entry(
        &self,
        ctx: &KeyContext<'_>,
        storage_id: &StorageId,
        entry_id: &EntryId,
        values: Vec<Value>,
    ) -> StoreResult<Changed<EntryInfo>> {
        self.with_open(ctx, storage_id, |conn, key| {
            let record = conn
                .get_entry(entry_id)?
                .ok_or_else(|| StoreError::NotFound(format!("entry {entry_id}")))?;
            let mut entry = open_entry(key, storage_id, &record)?;
            let template = load_template(conn, key, storage_id, &entry.template_id)?;
            entry.values = self.checked_values(&template, values)?;

            let replaced = conn.replace_entry(&EntryRecord {
                sealed: seal_json(key, &entry)?,
                ..record
            })?;
            if !replaced {
                return Err(StoreError::NotFound(format!("entry {entry_id}")));
            }

            info!(storage_id = %storage_id, entry_id = %entry_id, "entry updated");
            Ok(Changed::unchanged(entry))
        })
    }

    pub fn get_entry(
        &self,
        ctx: &KeyContext<'_>,
        storage_id: &StorageId,
        entry_id: &EntryId,
    ) -> StoreResult<EntryInfo> {
        self.with_open(ctx, storage_id, |conn, key| {
            let record = conn
                .get_entry(entry_id)?
                .ok_or_else(|| StoreError::NotFound(format!("entry {entry_id}")))?;
            open_entry(key, storage_id, &record)
        })
    }

    pub fn delete_entry(
        &self,
        ctx: &KeyContext<'_>,
        storage_id: &StorageId,
        entry_id: &EntryId,
    ) -> StoreResult<Diff> {
        self.with_open(ctx, storage_id, |conn, _| {
            if !conn.delete_entry(entry_id)? {
                return Err(StoreError::NotFound(format!("entry {entry_id}")));
            }
            info!(storage_id = %storage_id, entry_id = %entry_id, "entry deleted");
            Ok(Diff::removed([*entry_id]))
        })
    }

    /// Lists decrypted entries, optionally only those of one template.
    pub fn list_entries(
        &self,
        ctx: &KeyContext<'_>,
        storage_id: &StorageId,
        template_id: Option<&TemplateId>,
    ) -> StoreResult<Vec<EntryInfo>> {
        self.with_open(ctx, storage_id, |conn, key| {
            conn.entries(template_id)?
                .iter()
                .map(|record| open_entry(key, storage_id, record))
                .collect()
        })
    }
}
