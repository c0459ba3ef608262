//! Boxes and templates.

use super::{KeyContext, VaultStore};
use crate::backend::{BoxRecord, StorageConnection, TemplateRecord};
use crate::error::{StoreError, StoreResult};
use tracing::info;
use uuid::Uuid;
use vaultline_crypto::{DerivedKey, open_json, seal_json};
use vaultline_schema::compile;
use vaultline_types::{
    BoxId, BoxInfo, Changed, DataBox, DataTemplate, Diff, FieldSpec, StorageId, TemplateId,
    TemplateInfo,
};

/// Opens a sealed box and checks it belongs where it was found.
pub(super) fn open_box(
    key: &DerivedKey,
    storage_id: &StorageId,
    record: &BoxRecord,
) -> StoreResult<DataBox> {
    let data_box: DataBox = open_json(key, &record.sealed)?;
    if data_box.id != record.id || data_box.storage_id != *storage_id {
        return Err(StoreError::AuthFailure);
    }
    Ok(data_box)
}

pub(super) fn open_template(
    key: &DerivedKey,
    storage_id: &StorageId,
    record: &TemplateRecord,
) -> StoreResult<DataTemplate> {
    let template: DataTemplate = open_json(key, &record.sealed)?;
    if template.id != record.id
        || template.box_id != record.box_id
        || template.storage_id != *storage_id
    {
        return Err(StoreError::AuthFailure);
    }
    Ok(template)
}

fn require_name(kind: &str, name: &str) -> StoreResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::InvalidInput(format!("{kind} name must not be empty")));
    }
    Ok(name.to_string())
}

impl VaultStore {
    pub fn create_box(
        &self,
        ctx: &KeyContext<'_>,
        storage_id: &StorageId,
        name: &str,
        description: Option<String>,
    ) -> StoreResult<Changed<BoxInfo>> {
        let name = require_name("box", name)?;
        self.with_open(ctx, storage_id, |conn, key| {
            for record in conn.boxes()? {
                if open_box(key, storage_id, &record)?.name == name {
                    return Err(StoreError::NotUnique { scope: "box", name });
                }
            }

            let data_box = DataBox {
                id: BoxId::new(),
                storage_id: *storage_id,
                name,
                description,
            };
            conn.insert_box(&BoxRecord {
                id: data_box.id,
                sealed: seal_json(key, &data_box)?,
            })?;

            info!(storage_id = %storage_id, box_id = %data_box.id, "box created");
            Ok(Changed {
                info: BoxInfo::from(&data_box),
                diff: Diff::added(data_box.id),
            })
        })
    }

    /// Deletes a box with all its templates and their entries.
    pub fn delete_box(
        &self,
        ctx: &KeyContext<'_>,
        storage_id: &StorageId,
        box_id: &BoxId,
    ) -> StoreResult<Diff> {
        self.with_open(ctx, storage_id, |conn, _| {
            if conn.get_box(box_id)?.is_none() {
                return Err(StoreError::NotFound(format!("box {box_id}")));
            }

            let mut removed: Vec<Uuid> = Vec::new();
            for template in conn.templates(Some(box_id))? {
                removed.extend(self.remove_template(conn, &template.id)?);
            }
            conn.delete_box(box_id)?;
            removed.push(box_id.as_uuid());

            info!(storage_id = %storage_id, box_id = %box_id, removed = removed.len(), "box deleted");
            Ok(Diff::removed(removed))
        })
    }

    pub fn list_boxes(
        &self,
        ctx: &KeyContext<'_>,
        storage_id: &StorageId,
    ) -> StoreResult<Vec<BoxInfo>> {
        self.with_open(ctx, storage_id, |conn, key| {
            conn.boxes()?
                .iter()
                .map(|record| open_box(key, storage_id, record).map(|b| BoxInfo::from(&b)))
                .collect()
        })
    }

    /// Creates a template in a box. The field list is compiled first, so a
    /// template that could never accept an entry is rejected. Template
    /// names are unique per storage.
    pub fn create_template(
        &self,
        ctx: &KeyContext<'_>,
        storage_id: &StorageId,
        box_id: &BoxId,
        name: &str,
        description: Option<String>,
        fields: Vec<FieldSpec>,
    ) -> StoreResult<Changed<TemplateInfo>> {
        let name = require_name("template", name)?;
        compile(&fields)?;

        self.with_open(ctx, storage_id, |conn, key| {
            if conn.get_box(box_id)?.is_none() {
                return Err(StoreError::NotFound(format!("box {box_id}")));
            }
            for record in conn.templates(None)? {
                if open_template(key, storage_id, &record)?.name == name {
                    return Err(StoreError::NotUnique {
                        scope: "template",
                        name,
                    });
                }
            }

            let template = DataTemplate {
                id: TemplateId::new(),
                storage_id: *storage_id,
                box_id: *box_id,
                name,
                description,
                fields,
            };
            conn.insert_template(&TemplateRecord {
                id: template.id,
                box_id: *box_id,
                sealed: seal_json(key, &template)?,
            })?;
            self.schemas.get_or_compile(template.id, &template.fields)?;

            info!(storage_id = %storage_id, template_id = %template.id, fields = template.fields.len(), "template created");
            Ok(Changed {
                info: TemplateInfo::from(&template),
                diff: Diff::added(template.id),
            })
        })
    }

    /// Deletes a template and every entry created from it.
    pub fn delete_template(
        &self,
        ctx: &KeyContext<'_>,
        storage_id: &StorageId,
        template_id: &TemplateId,
    ) -> StoreResult<Diff> {
        self.with_open(ctx, storage_id, |conn, _| {
            if conn.get_template(template_id)?.is_none() {
                return Err(StoreError::NotFound(format!("template {template_id}")));
            }
            let removed = self.remove_template(conn, template_id)?;
            info!(storage_id = %storage_id, template_id = %template_id, "template deleted");
            Ok(Diff::removed(removed))
        })
    }

    /// Removes a template and its entries; returns the removed ids,
    /// entries first.
    fn remove_template(
        &self,
        conn: &mut dyn StorageConnection,
        template_id: &TemplateId,
    ) -> StoreResult<Vec<Uuid>> {
        let mut removed = Vec::new();
        for entry in conn.entries(Some(template_id))? {
            conn.delete_entry(&entry.id)?;
            removed.push(entry.id.as_uuid());
        }
        conn.delete_template(template_id)?;
        self.schemas.invalidate(template_id);
        removed.push(template_id.as_uuid());
        Ok(removed)
    }

    /// Lists templates, optionally only those of one box.
    pub fn list_templates(
        &self,
        ctx: &KeyContext<'_>,
        storage_id: &StorageId,
        box_id: Option<&BoxId>,
    ) -> StoreResult<Vec<TemplateInfo>> {
        self.with_open(ctx, storage_id, |conn, key| {
            conn.templates(box_id)?
                .iter()
                .map(|record| {
                    open_template(key, storage_id, record).map(|t| TemplateInfo::from(&t))
                })
                .collect()
        })
    }
}
