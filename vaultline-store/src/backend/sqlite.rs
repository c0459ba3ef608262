//! One SQLite file per storage.

use super::{
    Backend, BackendParams, BoxRecord, EntryRecord, StorageConnection, TemplateRecord,
};
use crate::catalog::parse_id;
use crate::error::{StoreError, StoreResult};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use vaultline_crypto::EncryptedData;
use vaultline_types::{BackendKind, BoxId, EntryId, TemplateId};

const STORAGE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS boxes (
    id TEXT PRIMARY KEY,
    iv BLOB NOT NULL,
    data BLOB NOT NULL
);
CREATE TABLE IF NOT EXISTS templates (
    id TEXT PRIMARY KEY,
    box_id TEXT NOT NULL,
    iv BLOB NOT NULL,
    data BLOB NOT NULL
);
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    box_id TEXT NOT NULL,
    template_id TEXT NOT NULL,
    iv BLOB NOT NULL,
    data BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_entries_template ON entries(template_id);
"#;

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSqliteBackend;

fn file_path(params: &BackendParams) -> StoreResult<PathBuf> {
    let BackendParams::LocalSqlite {
        directory,
        file_name,
    } = params
    else {
        return Err(StoreError::InvalidInput("expected localSqlite parameters".into()));
    };
    let name = Path::new(file_name);
    if file_name.is_empty() || name.file_name() != Some(name.as_os_str()) {
        return Err(StoreError::InvalidInput(format!(
            "storage file name '{file_name}' must be a bare file name"
        )));
    }
    Ok(directory.join(name))
}

impl Backend for LocalSqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::LocalSqlite
    }

    fn open(&self, params: &BackendParams) -> StoreResult<Box<dyn StorageConnection>> {
        let path = file_path(params)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch(STORAGE_DDL)?;
        tracing::debug!(path = %path.display(), "local storage opened");
        Ok(Box::new(SqliteConnection { conn }))
    }

    fn destroy(&self, params: &BackendParams) -> StoreResult<()> {
        let path = file_path(params)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "local storage file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

struct SqliteConnection {
    conn: Connection,
}

fn sealed(iv: Vec<u8>, data: Vec<u8>) -> EncryptedData {
    EncryptedData { iv, data }
}

type BoxRow = (String, Vec<u8>, Vec<u8>);
type TemplateRow = (String, String, Vec<u8>, Vec<u8>);
type EntryRow = (String, String, String, Vec<u8>, Vec<u8>);

fn box_from_row((id, iv, data): BoxRow) -> StoreResult<BoxRecord> {
    Ok(BoxRecord {
        id: parse_id(&id)?,
        sealed: sealed(iv, data),
    })
}

fn template_from_row((id, box_id, iv, data): TemplateRow) -> StoreResult<TemplateRecord> {
    Ok(TemplateRecord {
        id: parse_id(&id)?,
        box_id: parse_id(&box_id)?,
        sealed: sealed(iv, data),
    })
}

fn entry_from_row((id, box_id, template_id, iv, data): EntryRow) -> StoreResult<EntryRecord> {
    Ok(EntryRecord {
        id: parse_id(&id)?,
        box_id: parse_id(&box_id)?,
        template_id: parse_id(&template_id)?,
        sealed: sealed(iv, data),
    })
}

impl StorageConnection for SqliteConnection {
    fn insert_box(&mut self, record: &BoxRecord) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO boxes (id, iv, data) VALUES (?, ?, ?)",
            params![record.id.to_string(), record.sealed.iv, record.sealed.data],
        )?;
        Ok(())
    }

    fn boxes(&self) -> StoreResult<Vec<BoxRecord>> {
        let mut stmt = self.conn.prepare("SELECT id, iv, data FROM boxes ORDER BY rowid")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<BoxRow>, _>>()?;
        rows.into_iter().map(box_from_row).collect()
    }

    fn get_box(&self, id: &BoxId) -> StoreResult<Option<BoxRecord>> {
        let row: Option<BoxRow> = self
            .conn
            .query_row(
                "SELECT id, iv, data FROM boxes WHERE id = ?",
                params![id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        row.map(box_from_row).transpose()
    }

    fn delete_box(&mut self, id: &BoxId) -> StoreResult<bool> {
        let n = self
            .conn
            .execute("DELETE FROM boxes WHERE id = ?", params![id.to_string()])?;
        Ok(n > 0)
    }

    fn insert_template(&mut self, record: &TemplateRecord) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO templates (id, box_id, iv, data) VALUES (?, ?, ?, ?)",
            params![
                record.id.to_string(),
                record.box_id.to_string(),
                record.sealed.iv,
                record.sealed.data
            ],
        )?;
        Ok(())
    }

    fn templates(&self, box_id: Option<&BoxId>) -> StoreResult<Vec<TemplateRecord>> {
        let map = |row: &rusqlite::Row<'_>| -> rusqlite::Result<TemplateRow> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        };
        let rows = match box_id {
            Some(b) => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, box_id, iv, data FROM templates WHERE box_id = ? ORDER BY rowid",
                )?;
                let rows = stmt
                    .query_map(params![b.to_string()], map)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT id, box_id, iv, data FROM templates ORDER BY rowid")?;
                let rows = stmt.query_map([], map)?.collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        rows.into_iter().map(template_from_row).collect()
    }

    fn get_template(&self, id: &TemplateId) -> StoreResult<Option<TemplateRecord>> {
        let row: Option<TemplateRow> = self
            .conn
            .query_row(
                "SELECT id, box_id, iv, data FROM templates WHERE id = ?",
                params![id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        row.map(template_from_row).transpose()
    }

    fn delete_template(&mut self, id: &TemplateId) -> StoreResult<bool> {
        let n = self
            .conn
            .execute("DELETE FROM templates WHERE id = ?", params![id.to_string()])?;
        Ok(n > 0)
    }

    fn insert_entry(&mut self, record: &EntryRecord) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO entries (id, box_id, template_id, iv, data) VALUES (?, ?, ?, ?, ?)",
            params![
                record.id.to_string(),
                record.box_id.to_string(),
                record.template_id.to_string(),
                record.sealed.iv,
                record.sealed.data
            ],
        )?;
        Ok(())
    }

    fn replace_entry(&mut self, record: &EntryRecord) -> StoreResult<bool> {
        let n = self.conn.execute(
            "UPDATE entries SET box_id = ?, template_id = ?, iv = ?, data = ? WHERE id = ?",
            params![
                record.box_id.to_string(),
                record.template_id.to_string(),
                record.sealed.iv,
                record.sealed.data,
                record.id.to_string()
            ],
        )?;
        Ok(n > 0)
    }

    fn entries(&self, template_id: Option<&TemplateId>) -> StoreResult<Vec<EntryRecord>> {
        let map = |row: &rusqlite::Row<'_>| -> rusqlite::Result<EntryRow> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        };
        let rows = match template_id {
            Some(t) => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, box_id, template_id, iv, data FROM entries \
                     WHERE template_id = ? ORDER BY rowid",
                )?;
                let rows = stmt
                    .query_map(params![t.to_string()], map)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, box_id, template_id, iv, data FROM entries ORDER BY rowid",
                )?;
                let rows = stmt.query_map([], map)?.collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        rows.into_iter().map(entry_from_row).collect()
    }

    fn get_entry(&self, id: &EntryId) -> StoreResult<Option<EntryRecord>> {
        let row: Option<EntryRow> = self
            .conn
            .query_row(
                "SELECT id, box_id, template_id, iv, data FROM entries WHERE id = ?",
                params![id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;
        row.map(entry_from_row).transpose()
    }

    fn delete_entry(&mut self, id: &EntryId) -> StoreResult<bool> {
        let n = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?", params![id.to_string()])?;
        Ok(n > 0)
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }
}
