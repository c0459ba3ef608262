//! Process-local backend. Contents survive close/reopen but not a restart.

use super::{
    Backend, BackendParams, BoxRecord, EntryRecord, StorageConnection, TemplateRecord,
};
use crate::error::{StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use vaultline_types::{BackendKind, BoxId, EntryId, TemplateId};

#[derive(Debug, Default)]
struct MemoryTables {
    boxes: Vec<BoxRecord>,
    templates: Vec<TemplateRecord>,
    entries: Vec<EntryRecord>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("recovering from poisoned memory backend mutex");
        poisoned.into_inner()
    })
}

#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    stores: Arc<Mutex<HashMap<String, Arc<Mutex<MemoryTables>>>>>,
}

impl Backend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn open(&self, params: &BackendParams) -> StoreResult<Box<dyn StorageConnection>> {
        let BackendParams::Memory { name } = params else {
            return Err(StoreError::InvalidInput("expected memory parameters".into()));
        };
        let tables = Arc::clone(lock(&self.stores).entry(name.clone()).or_default());
        Ok(Box::new(MemoryConnection { tables }))
    }

    fn destroy(&self, params: &BackendParams) -> StoreResult<()> {
        let BackendParams::Memory { name } = params else {
            return Err(StoreError::InvalidInput("expected memory parameters".into()));
        };
        lock(&self.stores).remove(name);
        Ok(())
    }
}

struct MemoryConnection {
    tables: Arc<Mutex<MemoryTables>>,
}

fn remove_where<T>(items: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> bool {
    let before = items.len();
    items.retain(|item| !pred(item));
    items.len() != before
}

impl StorageConnection for MemoryConnection {
    fn insert_box(&mut self, record: &BoxRecord) -> StoreResult<()> {
        lock(&self.tables).boxes.push(record.clone());
        Ok(())
    }

    fn boxes(&self) -> StoreResult<Vec<BoxRecord>> {
        Ok(lock(&self.tables).boxes.clone())
    }

    fn get_box(&self, id: &BoxId) -> StoreResult<Option<BoxRecord>> {
        Ok(lock(&self.tables).boxes.iter().find(|b| b.id == *id).cloned())
    }

    fn delete_box(&mut self, id: &BoxId) -> StoreResult<bool> {
        Ok(remove_where(&mut lock(&self.tables).boxes, |b| b.id == *id))
    }

    fn insert_template(&mut self, record: &TemplateRecord) -> StoreResult<()> {
        lock(&self.tables).templates.push(record.clone());
        Ok(())
    }

    fn templates(&self, box_id: Option<&BoxId>) -> StoreResult<Vec<TemplateRecord>> {
        Ok(lock(&self.tables)
            .templates
            .iter()
            .filter(|t| box_id.is_none_or(|b| t.box_id == *b))
            .cloned()
            .collect())
    }

    fn get_template(&self, id: &TemplateId) -> StoreResult<Option<TemplateRecord>> {
        Ok(lock(&self.tables)
            .templates
            .iter()
            .find(|t| t.id == *id)
            .cloned())
    }

    fn delete_template(&mut self, id: &TemplateId) -> StoreResult<bool> {
        Ok(remove_where(&mut lock(&self.tables).templates, |t| t.id == *id))
    }

    fn insert_entry(&mut self, record: &EntryRecord) -> StoreResult<()> {
        lock(&self.tables).entries.push(record.clone());
        Ok(())
    }

    fn replace_entry(&mut self, record: &EntryRecord) -> StoreResult<bool> {
        let mut tables = lock(&self.tables);
        match tables.entries.iter_mut().find(|e| e.id == record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn entries(&self, template_id: Option<&TemplateId>) -> StoreResult<Vec<EntryRecord>> {
        Ok(lock(&self.tables)
            .entries
            .iter()
            .filter(|e| template_id.is_none_or(|t| e.template_id == *t))
            .cloned()
            .collect())
    }

    fn get_entry(&self, id: &EntryId) -> StoreResult<Option<EntryRecord>> {
        Ok(lock(&self.tables).entries.iter().find(|e| e.id == *id).cloned())
    }

    fn delete_entry(&mut self, id: &EntryId) -> StoreResult<bool> {
        Ok(remove_where(&mut lock(&self.tables).entries, |e| e.id == *id))
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
