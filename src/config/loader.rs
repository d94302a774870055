//! Load in-memory models from a JSON model file.

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use crate::config::types::{FieldDescriptor, WriteSchema};
use crate::error::ConfigError;
use crate::model::{FieldValue, InMemoryAccessor, ModelDescriptor, ModelRegistry, Record};

/// Top-level shape of a model file: `{"models": [...]}`.
#[derive(Debug, Deserialize)]
pub struct ModelFile {
    pub models: Vec<ModelDefinition>,
}

#[derive(Debug, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    pub table_name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub schema: WriteSchema,
    #[serde(default)]
    pub records: Vec<Value>,
}

fn default_primary_key() -> String {
    "id".into()
}

impl ModelDefinition {
    /// Build a descriptor backed by an in-memory accessor. Record values are coerced by the
    /// declared field types; undeclared fields keep their JSON shape.
    pub fn into_descriptor(self) -> Result<ModelDescriptor, ConfigError> {
        let mut records = Vec::with_capacity(self.records.len());
        for (i, raw) in self.records.iter().enumerate() {
            let obj = raw.as_object().ok_or_else(|| {
                ConfigError::Load(format!("model {}: record {} is not an object", self.name, i))
            })?;
            let record: Record = obj
                .iter()
                .map(|(k, v)| {
                    let value = match self.fields.iter().find(|f| &f.name == k) {
                        Some(f) => FieldValue::from_json_typed(v, f.field_type),
                        None => FieldValue::from_json(v),
                    };
                    (k.clone(), value)
                })
                .collect();
            records.push(record);
        }
        let accessor = Arc::new(InMemoryAccessor::new(self.primary_key, records));
        let mut descriptor = ModelDescriptor::new(self.name, self.table_name, accessor)
            .with_fields(self.fields)
            .with_schema(self.schema);
        if let Some(path) = self.path {
            descriptor = descriptor.with_path(path);
        }
        Ok(descriptor)
    }
}

pub fn parse_models(json: &str) -> Result<Vec<ModelDefinition>, ConfigError> {
    let file: ModelFile = serde_json::from_str(json)?;
    Ok(file.models)
}

/// Read a model file and register each model, in file order.
pub fn load_models_file(path: &Path, registry: &mut ModelRegistry) -> Result<usize, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let models = parse_models(&raw)?;
    let count = models.len();
    for def in models {
        registry.register(def.into_descriptor()?)?;
    }
    tracing::info!(path = %path.display(), count, "loaded model file");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldType;

    const FILE: &str = r#"{
        "models": [
            {
                "name": "Transactions",
                "table_name": "upi_transactions",
                "fields": [
                    {"name": "id", "type": "integer", "readonly": true},
                    {"name": "amount", "type": "decimal"},
                    {"name": "status", "type": "enum", "choices": ["Success", "Failed"]}
                ],
                "schema": {"amount": {"required": true, "minimum": 1}},
                "records": [
                    {"id": 1, "amount": 250, "status": "Success"},
                    {"id": 2, "amount": 90.5, "status": "Failed"}
                ]
            },
            {"name": "Users", "table_name": "users", "path": "people", "primary_key": "user_id"}
        ]
    }"#;

    #[tokio::test]
    async fn model_file_builds_in_memory_descriptors() {
        let defs = parse_models(FILE).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[1].primary_key, "user_id");

        let mut registry = ModelRegistry::new();
        for def in defs {
            registry.register(def.into_descriptor().unwrap()).unwrap();
        }
        let tx = registry.get("upi-transactions").unwrap();
        assert_eq!(tx.fields[1].field_type, FieldType::Decimal);
        assert!(tx.schema.contains_key("amount"));
        let records = tx.accessor.list().await.unwrap();
        assert_eq!(records[0].get("amount"), &FieldValue::Decimal(250.0));
        assert!(registry.get("people").is_some());
    }

    #[test]
    fn non_object_records_are_rejected() {
        let defs = parse_models(r#"{"models": [{"name": "A", "table_name": "a", "records": [3]}]}"#).unwrap();
        let err = defs.into_iter().next().unwrap().into_descriptor().unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(parse_models("{"), Err(ConfigError::Parse(_))));
    }
}
