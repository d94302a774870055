//! Data accessor seam: how a model's records are fetched and written.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::Record;

/// Operations a model may support.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    GetById,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Operation::List => "List",
            Operation::GetById => "Get by ID",
            Operation::Create => "Create",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
        }
    }
}

#[derive(Error, Debug)]
pub enum AccessorError {
    #[error("{} not implemented", .0.label())]
    NotImplemented(Operation),
    #[error("{0}")]
    Fetch(String),
    #[error("data fetch timed out")]
    Timeout,
    #[error("{0}")]
    Db(#[from] sqlx::Error),
}

/// Record id taken from a request path: integer when numeric-looking, text otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordId {
    Integer(i64),
    Text(String),
}

impl RecordId {
    /// `"42"` -> 42, `"1.9"` -> 1 (truncated), `"USR12"` -> text.
    pub fn coerce(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return RecordId::Integer(n);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() && !trimmed.is_empty() && f.abs() < i64::MAX as f64 => {
                RecordId::Integer(f.trunc() as i64)
            }
            _ => RecordId::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Integer(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

/// Accessor for one model. Only `list` is mandatory; the rest report `NotImplemented` unless overridden.
#[async_trait]
pub trait ModelAccessor: Send + Sync {
    /// Fetch every record. Records must be flat and homogeneous.
    async fn list(&self) -> Result<Vec<Record>, AccessorError>;

    async fn get_by_id(&self, _id: &RecordId) -> Result<Option<Record>, AccessorError> {
        Err(AccessorError::NotImplemented(Operation::GetById))
    }

    async fn create(&self, _data: Record) -> Result<Record, AccessorError> {
        Err(AccessorError::NotImplemented(Operation::Create))
    }

    /// Returns `None` when no record has this id.
    async fn update(&self, _id: &RecordId, _data: Record) -> Result<Option<Record>, AccessorError> {
        Err(AccessorError::NotImplemented(Operation::Update))
    }

    /// Returns `false` when no record has this id.
    async fn delete(&self, _id: &RecordId) -> Result<bool, AccessorError> {
        Err(AccessorError::NotImplemented(Operation::Delete))
    }

    /// Operations this accessor overrides. Exposed in the model index.
    fn operations(&self) -> &'static [Operation] {
        &[Operation::List]
    }
}
