//! DDL for the catalog database.

use crate::error::StoreResult;
use rusqlite::Connection;

const ACCOUNTS_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password_hash BLOB NOT NULL,
    password_salt BLOB NOT NULL,
    kdf_json TEXT NOT NULL,
    account_key_salt BLOB NOT NULL,
    sealed_account_key TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
"#;

const VISIBILITY_GROUPS_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS visibility_groups (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES accounts(id),
    name TEXT NOT NULL,
    record_json TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (owner_id, name)
);
"#;

const DATA_STORAGES_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS data_storages (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES accounts(id),
    name TEXT NOT NULL,
    description TEXT,
    visibility_group_id TEXT REFERENCES visibility_groups(id),
    backend_kind TEXT NOT NULL,
    sealed_params TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (owner_id, name)
);
"#;

pub(crate) fn initialize_catalog_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(ACCOUNTS_DDL)?;
    conn.execute_batch(VISIBILITY_GROUPS_DDL)?;
    conn.execute_batch(DATA_STORAGES_DDL)?;
    Ok(())
}
