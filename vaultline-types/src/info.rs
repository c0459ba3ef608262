//! Non-secret projections sent to the display process.
//!
//! None of these types hold key material, sealed payloads, backend
//! connection parameters, or rows belonging to another account.

use crate::field::FieldSpec;
use crate::ids::{AccountId, BoxId, EntryId, GroupId, StorageId, TemplateId};
use crate::model::{BackendKind, DataBox, DataTemplate, StorageState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub id: AccountId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub id: GroupId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub id: StorageId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visibility_group_id: Option<GroupId>,
    pub backend_kind: BackendKind,
    pub state: StorageState,
    /// True when the owning group's key is not resident.
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxInfo {
    pub id: BoxId,
    pub storage_id: StorageId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&DataBox> for BoxInfo {
    fn from(b: &DataBox) -> Self {
        Self {
            id: b.id,
            storage_id: b.storage_id,
            name: b.name.clone(),
            description: b.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    pub id: TemplateId,
    pub storage_id: StorageId,
    pub box_id: BoxId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldSpec>,
}

impl From<&DataTemplate> for TemplateInfo {
    fn from(t: &DataTemplate) -> Self {
        Self {
            id: t.id,
            storage_id: t.storage_id,
            box_id: t.box_id,
            name: t.name.clone(),
            description: t.description.clone(),
            fields: t.fields.clone(),
        }
    }
}

/// A decrypted entry. `values[i]` belongs to the template's `fields[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryInfo {
    pub id: EntryId,
    pub storage_id: StorageId,
    pub box_id: BoxId,
    pub template_id: TemplateId,
    pub values: Vec<serde_json::Value>,
}
