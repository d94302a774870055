//! Write-body validation from the model's schema and field flags.

use crate::config::{FieldDescriptor, ValidationRule, WriteSchema};
use crate::error::AppError;
use crate::model::{FieldValue, Record};
use regex::Regex;
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create body: every required rule must be satisfied.
    pub fn validate(body: &Map<String, Value>, rules: &WriteSchema) -> Result<(), AppError> {
        for (col, rule) in rules {
            let val = body.get(col);
            if rule.required == Some(true) && (val.is_none() || val == Some(&Value::Null)) {
                return Err(AppError::Validation(format!("{} is required", col)));
            }
            if let Some(v) = val {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for PATCH). Required is not enforced for missing fields.
    pub fn validate_partial(body: &Map<String, Value>, rules: &WriteSchema) -> Result<(), AppError> {
        for (col, v) in body {
            if let Some(rule) = rules.get(col) {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }

    /// Reject unknown and readonly fields. A model without field descriptors accepts any key.
    pub fn check_writable(body: &Map<String, Value>, fields: &[FieldDescriptor]) -> Result<(), AppError> {
        if fields.is_empty() {
            return Ok(());
        }
        for key in body.keys() {
            match fields.iter().find(|f| &f.name == key) {
                None => return Err(AppError::Validation(format!("unknown field {}", key))),
                Some(f) if f.readonly => return Err(AppError::Validation(format!("{} is readonly", key))),
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Convert a validated body into a record, coercing values by declared field type.
    pub fn to_record(body: &Map<String, Value>, fields: &[FieldDescriptor]) -> Record {
        body.iter()
            .map(|(k, v)| {
                let value = match fields.iter().find(|f| &f.name == k) {
                    Some(f) => FieldValue::from_json_typed(v, f.field_type),
                    None => FieldValue::from_json(v),
                };
                (k.clone(), value)
            })
            .collect()
    }
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(max) = rule.max_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
    }
    if let Some(min) = rule.min_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
    }
    if let Some(ref pattern) = rule.pattern {
        let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", col)))?;
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", col)));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {:?}",
                col,
                allowed.iter().take(5).collect::<Vec<_>>()
            )));
        }
    }
    if let Some(min) = rule.minimum {
        if let Some(n) = v.as_f64() {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
            }
        }
    }
    if let Some(max) = rule.maximum {
        if let Some(n) = v.as_f64() {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    match format.to_lowercase().as_str() {
        "email" => {
            if let Some(s) = v.as_str() {
                if !s.contains('@') || s.len() < 3 {
                    return Err(AppError::Validation(format!("{} must be a valid email", col)));
                }
            }
        }
        "uuid" => {
            if let Some(s) = v.as_str() {
                if uuid::Uuid::parse_str(s).is_err() {
                    return Err(AppError::Validation(format!("{} must be a valid UUID", col)));
                }
            }
        }
        "datetime" => {
            if let Some(s) = v.as_str() {
                if chrono::DateTime::parse_from_rfc3339(s).is_err() {
                    return Err(AppError::Validation(format!("{} must be an RFC 3339 timestamp", col)));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldType;
    use serde_json::json;

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn schema() -> WriteSchema {
        let mut s = WriteSchema::new();
        s.insert(
            "mobile".into(),
            ValidationRule {
                required: Some(true),
                pattern: Some(r"^\d{10}$".into()),
                ..Default::default()
            },
        );
        s.insert(
            "status".into(),
            ValidationRule {
                allowed: Some(vec![json!("Success"), json!("Pending"), json!("Failed")]),
                ..Default::default()
            },
        );
        s.insert(
            "amount".into(),
            ValidationRule {
                minimum: Some(1.0),
                ..Default::default()
            },
        );
        s
    }

    #[test]
    fn required_pattern_allowed_minimum() {
        assert!(RequestValidator::validate(&body(json!({"mobile": "9876543210"})), &schema()).is_ok());
        assert!(RequestValidator::validate(&body(json!({})), &schema()).is_err());
        assert!(RequestValidator::validate(&body(json!({"mobile": "98765"})), &schema()).is_err());
        assert!(RequestValidator::validate(&body(json!({"mobile": "9876543210", "status": "Lost"})), &schema()).is_err());
        assert!(RequestValidator::validate(&body(json!({"mobile": "9876543210", "amount": 0})), &schema()).is_err());
    }

    #[test]
    fn partial_skips_required() {
        assert!(RequestValidator::validate_partial(&body(json!({"status": "Pending"})), &schema()).is_ok());
        assert!(RequestValidator::validate_partial(&body(json!({"status": "Nope"})), &schema()).is_err());
    }

    #[test]
    fn readonly_and_unknown_fields_are_rejected() {
        let fields = vec![
            FieldDescriptor::new("id", FieldType::Integer).readonly(),
            FieldDescriptor::new("name", FieldType::String),
        ];
        assert!(RequestValidator::check_writable(&body(json!({"name": "A"})), &fields).is_ok());
        assert!(RequestValidator::check_writable(&body(json!({"id": 4})), &fields).is_err());
        assert!(RequestValidator::check_writable(&body(json!({"colour": "red"})), &fields).is_err());
        assert!(RequestValidator::check_writable(&body(json!({"colour": "red"})), &[]).is_ok());
    }

    #[test]
    fn to_record_coerces_by_field_type() {
        let fields = vec![
            FieldDescriptor::new("amount", FieldType::Decimal),
            FieldDescriptor::new("created_at", FieldType::Timestamp),
        ];
        let r = RequestValidator::to_record(
            &body(json!({"amount": 100, "created_at": "2024-01-01T00:00:00Z", "note": "x"})),
            &fields,
        );
        assert_eq!(r.get("amount"), &FieldValue::Decimal(100.0));
        assert!(matches!(r.get("created_at"), FieldValue::Timestamp(_)));
        assert_eq!(r.get("note"), &FieldValue::Text("x".into()));
    }
}
