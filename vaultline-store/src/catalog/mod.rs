//! The host-side catalog: accounts, visibility groups and storage configs.

mod accounts;
mod groups;
mod schema;
mod storages;

pub use storages::StorageConfig;

use crate::error::{StoreError, StoreResult};
use rusqlite::Connection;
use schema::initialize_catalog_schema;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use vaultline_crypto::{SALT_SIZE, Salt};

/// Thread-safe catalog backed by SQLite.
#[derive(Clone)]
pub struct Catalog {
    conn: Arc<Mutex<Connection>>,
}

impl Catalog {
    /// Open (or create) the catalog database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        initialize_catalog_schema(&conn)?;
        tracing::info!(path = %path.display(), "catalog opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory catalog (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_catalog_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("recovering from poisoned catalog mutex");
            poisoned.into_inner()
        })
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn parse_id<T>(raw: &str) -> StoreResult<T>
where
    T: FromStr<Err = uuid::Error>,
{
    raw.parse()
        .map_err(|e| StoreError::InvalidState(format!("corrupt identifier: {e}")))
}

pub(crate) fn salt_from_blob(blob: &[u8]) -> StoreResult<Salt> {
    let bytes: [u8; SALT_SIZE] = blob
        .try_into()
        .map_err(|_| StoreError::InvalidState("corrupt salt in catalog".into()))?;
    Ok(Salt::from_bytes(bytes))
}
