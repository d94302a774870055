//! Model descriptors and the registry resolving a path segment to one.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{FieldDescriptor, WriteSchema};
use crate::error::ConfigError;

use super::ModelAccessor;

/// Path segments that cannot name a model because fixed routes use them.
pub const RESERVED_PATHS: &[&str] = &["models"];

/// One model exposed through the generic handlers. Holds accessors, never data.
pub struct ModelDescriptor {
    pub name: String,
    pub table_name: String,
    pub path_segment: String,
    pub schema: WriteSchema,
    pub fields: Vec<FieldDescriptor>,
    pub accessor: Arc<dyn ModelAccessor>,
}

impl ModelDescriptor {
    /// Path segment defaults to the table name with `_` replaced by `-`.
    pub fn new(name: impl Into<String>, table_name: impl Into<String>, accessor: Arc<dyn ModelAccessor>) -> Self {
        let table_name = table_name.into();
        Self {
            name: name.into(),
            path_segment: path_for_table(&table_name),
            table_name,
            schema: WriteSchema::new(),
            fields: Vec::new(),
            accessor,
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldDescriptor>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_schema(mut self, schema: WriteSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_path(mut self, path_segment: impl Into<String>) -> Self {
        self.path_segment = path_segment.into();
        self
    }

    pub fn metadata(&self) -> ModelMetadata<'_> {
        ModelMetadata {
            name: &self.name,
            table_name: &self.table_name,
            fields: &self.fields,
        }
    }
}

impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("name", &self.name)
            .field("table_name", &self.table_name)
            .field("path_segment", &self.path_segment)
            .field("fields", &self.fields.len())
            .finish()
    }
}

/// Body of the metadata endpoint.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata<'a> {
    pub name: &'a str,
    pub table_name: &'a str,
    pub fields: &'a [FieldDescriptor],
}

/// `user_accounts` -> `user-accounts`.
pub fn path_for_table(table: &str) -> String {
    table.replace('_', "-")
}

/// `user_accounts` -> `User Accounts`.
pub fn display_name_for_table(table: &str) -> String {
    table
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Registered models, built once at startup and immutable afterwards.
#[derive(Default, Debug)]
pub struct ModelRegistry {
    models: Vec<Arc<ModelDescriptor>>,
    by_path: HashMap<String, Arc<ModelDescriptor>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ModelDescriptor) -> Result<Arc<ModelDescriptor>, ConfigError> {
        let path = descriptor.path_segment.clone();
        let routable = !path.is_empty() && !path.contains(['/', ':', '*', '{', '}']);
        if !routable || RESERVED_PATHS.contains(&path.as_str()) {
            return Err(ConfigError::ReservedPathSegment(path));
        }
        if self.by_path.contains_key(&path) {
            return Err(ConfigError::DuplicatePathSegment(path));
        }
        let descriptor = Arc::new(descriptor);
        tracing::debug!(model = %descriptor.name, path = %path, "model registered");
        self.by_path.insert(path, Arc::clone(&descriptor));
        self.models.push(Arc::clone(&descriptor));
        Ok(descriptor)
    }

    pub fn get(&self, path_segment: &str) -> Option<&Arc<ModelDescriptor>> {
        self.by_path.get(path_segment)
    }

    /// Models in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModelDescriptor>> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
