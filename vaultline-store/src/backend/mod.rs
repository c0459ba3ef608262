//! Concrete storage backends.
//!
//! A backend turns decrypted [`BackendParams`] into a live
//! [`StorageConnection`]. Connections only ever see sealed records; all
//! encryption happens in [`crate::VaultStore`].

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::LocalSqliteBackend;

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use vaultline_crypto::EncryptedData;
use vaultline_types::{BackendKind, BoxId, EntryId, StorageId, TemplateId};

/// Connection parameters of one storage. Persisted sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BackendParams {
    #[serde(rename_all = "camelCase")]
    LocalSqlite { directory: PathBuf, file_name: String },
    Memory { name: String },
}

impl BackendParams {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::LocalSqlite { .. } => BackendKind::LocalSqlite,
            Self::Memory { .. } => BackendKind::Memory,
        }
    }
}

/// How parameters are chosen when a storage is created without explicit ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDefaults {
    pub kind: BackendKind,
    /// Directory for local SQLite storage files.
    pub directory: PathBuf,
}

impl BackendDefaults {
    pub fn params_for(&self, storage_id: &StorageId) -> BackendParams {
        match self.kind {
            BackendKind::LocalSqlite => BackendParams::LocalSqlite {
                directory: self.directory.clone(),
                file_name: format!("{storage_id}.sqlite"),
            },
            BackendKind::Memory => BackendParams::Memory {
                name: storage_id.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxRecord {
    pub id: BoxId,
    pub sealed: EncryptedData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRecord {
    pub id: TemplateId,
    pub box_id: BoxId,
    pub sealed: EncryptedData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub id: EntryId,
    pub box_id: BoxId,
    pub template_id: TemplateId,
    pub sealed: EncryptedData,
}

/// Record CRUD on one open storage. Listings return records in insertion
/// order.
pub trait StorageConnection: Send {
    fn insert_box(&mut self, record: &BoxRecord) -> StoreResult<()>;
    fn boxes(&self) -> StoreResult<Vec<BoxRecord>>;
    fn get_box(&self, id: &BoxId) -> StoreResult<Option<BoxRecord>>;
    fn delete_box(&mut self, id: &BoxId) -> StoreResult<bool>;

    fn insert_template(&mut self, record: &TemplateRecord) -> StoreResult<()>;
    fn templates(&self, box_id: Option<&BoxId>) -> StoreResult<Vec<TemplateRecord>>;
    fn get_template(&self, id: &TemplateId) -> StoreResult<Option<TemplateRecord>>;
    fn delete_template(&mut self, id: &TemplateId) -> StoreResult<bool>;

    fn insert_entry(&mut self, record: &EntryRecord) -> StoreResult<()>;
    /// Overwrites an existing entry. Returns false if it does not exist.
    fn replace_entry(&mut self, record: &EntryRecord) -> StoreResult<bool>;
    fn entries(&self, template_id: Option<&TemplateId>) -> StoreResult<Vec<EntryRecord>>;
    fn get_entry(&self, id: &EntryId) -> StoreResult<Option<EntryRecord>>;
    fn delete_entry(&mut self, id: &EntryId) -> StoreResult<bool>;

    fn close(self: Box<Self>) -> StoreResult<()>;
}

pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn open(&self, params: &BackendParams) -> StoreResult<Box<dyn StorageConnection>>;

    /// Releases everything the storage holds. Missing resources are not an
    /// error.
    fn destroy(&self, params: &BackendParams) -> StoreResult<()>;
}

/// Backends by kind.
pub struct BackendRegistry {
    backends: HashMap<BackendKind, Box<dyn Backend>>,
}

impl BackendRegistry {
    pub fn empty() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Local SQLite files plus a process-local memory backend.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(LocalSqliteBackend));
        registry.register(Box::new(MemoryBackend::default()));
        registry
    }

    pub fn register(&mut self, backend: Box<dyn Backend>) {
        self.backends.insert(backend.kind(), backend);
    }

    pub fn get(&self, kind: BackendKind) -> StoreResult<&dyn Backend> {
        self.backends
            .get(&kind)
            .map(|b| b.as_ref())
            .ok_or_else(|| StoreError::InvalidInput(format!("no backend registered for {}", kind.as_str())))
    }

    pub fn open(&self, params: &BackendParams) -> StoreResult<Box<dyn StorageConnection>> {
        self.get(params.kind())?.open(params)
    }

    pub fn destroy(&self, params: &BackendParams) -> StoreResult<()> {
        self.get(params.kind())?.destroy(params)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("kinds", &self.backends.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn params_are_tagged_by_kind() {
        let params = BackendParams::LocalSqlite {
            directory: PathBuf::from("/tmp/v"),
            file_name: "a.sqlite".into(),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "localSqlite", "directory": "/tmp/v", "fileName": "a.sqlite" })
        );
        assert_eq!(params.kind(), BackendKind::LocalSqlite);
    }

    #[test]
    fn defaults_derive_names_from_storage_id() {
        let id = StorageId::new();
        let defaults = BackendDefaults {
            kind: BackendKind::Memory,
            directory: PathBuf::new(),
        };
        assert_eq!(
            defaults.params_for(&id),
            BackendParams::Memory { name: id.to_string() }
        );
    }
}
