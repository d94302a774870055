//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::model::AccessorError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("reserved path segment: {0}")]
    ReservedPathSegment(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("config parse: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    NotImplemented(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Server(String),
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) | AppError::Server(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::NotImplemented(_) => (StatusCode::NOT_IMPLEMENTED, "NOT_IMPLEMENTED"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        }
    }
}

impl From<AccessorError> for AppError {
    fn from(e: AccessorError) -> Self {
        match e {
            AccessorError::NotImplemented(op) => {
                AppError::NotImplemented(format!("{} not implemented for this model", op.label()))
            }
            other => AppError::Server(other.to_string()),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            status: "error",
            error: ErrorDetail {
                code,
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Operation;

    #[test]
    fn accessor_errors_map_to_envelope_codes() {
        let e: AppError = AccessorError::NotImplemented(Operation::GetById).into();
        assert_eq!(e.status_and_code(), (StatusCode::NOT_IMPLEMENTED, "NOT_IMPLEMENTED"));
        assert_eq!(e.to_string(), "Get by ID not implemented for this model");

        let e: AppError = AccessorError::Fetch("connection refused".into()).into();
        assert_eq!(e.status_and_code(), (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR"));
        assert_eq!(e.to_string(), "connection refused");
    }
}
