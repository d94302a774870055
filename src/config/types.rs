//! Declarative model metadata: field descriptors and write validation rules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Semantic type of a field. Drives search-field selection and typed write coercion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Decimal,
    String,
    Text,
    Boolean,
    Timestamp,
    Enum,
}

impl FieldType {
    /// Only string and text fields take part in free-text search.
    pub fn is_searchable(self) -> bool {
        matches!(self, FieldType::String | FieldType::Text)
    }
}

/// Names of the fields free-text search looks at, in declaration order.
pub fn searchable_fields(fields: &[FieldDescriptor]) -> Vec<&str> {
    fields
        .iter()
        .filter(|f| f.field_type.is_searchable())
        .map(|f| f.name.as_str())
        .collect()
}

/// One column of a model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            readonly: false,
            unique: false,
            choices: None,
            references: None,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn references(mut self, table: impl Into<String>) -> Self {
        self.references = Some(table.into());
        self
    }

    pub fn default_value(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Per-field rule applied to create/update bodies.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// Write schema of a model: field name -> rule.
pub type WriteSchema = HashMap<String, ValidationRule>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_descriptor_serializes_type_key() {
        let f = FieldDescriptor::new("status", FieldType::Enum).choices(["Success", "Failed"]);
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["type"], "enum");
        assert_eq!(json["choices"], serde_json::json!(["Success", "Failed"]));
        assert!(json.get("references").is_none());
    }

    #[test]
    fn field_descriptor_flags_default_to_false() {
        let f: FieldDescriptor = serde_json::from_str(r#"{"name":"email","type":"string"}"#).unwrap();
        assert!(!f.required && !f.readonly && !f.unique);
        assert!(f.field_type.is_searchable());
        assert!(!FieldType::Enum.is_searchable());
    }

    #[test]
    fn searchable_fields_are_string_or_text() {
        let fields = vec![
            FieldDescriptor::new("id", FieldType::Integer),
            FieldDescriptor::new("name", FieldType::String),
            FieldDescriptor::new("bio", FieldType::Text),
            FieldDescriptor::new("status", FieldType::Enum),
        ];
        assert_eq!(searchable_fields(&fields), vec!["name", "bio"]);
    }
}
