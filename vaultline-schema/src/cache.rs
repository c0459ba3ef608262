use crate::compile::{CompiledSchema, compile};
use crate::error::SchemaResult;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use vaultline_types::{FieldSpec, TemplateId};

/// Compiled schemas keyed by template.
///
/// Templates are immutable once created, so an entry only leaves the cache
/// when its template is deleted.
#[derive(Debug, Default)]
pub struct SchemaCache {
    compiled: RwLock<HashMap<TemplateId, Arc<CompiledSchema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached schema for `template_id`, compiling `fields` on a miss.
    pub fn get_or_compile(
        &self,
        template_id: TemplateId,
        fields: &[FieldSpec],
    ) -> SchemaResult<Arc<CompiledSchema>> {
        {
            let compiled = self.compiled.read().unwrap_or_else(|p| p.into_inner());
            if let Some(schema) = compiled.get(&template_id) {
                return Ok(Arc::clone(schema));
            }
        }

        let schema = Arc::new(compile(fields)?);
        let mut compiled = self.compiled.write().unwrap_or_else(|p| p.into_inner());
        Ok(Arc::clone(compiled.entry(template_id).or_insert(schema)))
    }

    pub fn invalidate(&self, template_id: &TemplateId) {
        self.compiled
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(template_id);
    }

    pub fn len(&self) -> usize {
        self.compiled.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
