use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Map, Value as JsonValue};

use crate::models::enums::CandidateStatus;

pub type Result<T> = std::result::Result<T, Error>;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid {0}")]
    InvalidReference(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: CandidateStatus,
        to: CandidateStatus,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_)
            | Error::Validation(_)
            | Error::InvalidReference(_)
            | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) | Error::InvalidTransition { .. } => StatusCode::CONFLICT,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Upstream(_) | Error::Reqwest(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) | Error::Database(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn field_messages(errors: &validator::ValidationErrors) -> JsonValue {
    let mut fields = Map::new();
    for (field, errs) in errors.field_errors() {
        let messages: Vec<JsonValue> = errs
            .iter()
            .map(|e| {
                let text = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                JsonValue::String(text)
            })
            .collect();
        fields.insert(field.to_string(), JsonValue::Array(messages));
    }
    JsonValue::Object(fields)
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = match &self {
            Error::Validation(err) => json!({
                "error": "Validation failed",
                "fields": field_messages(err),
            }),
            Error::Database(err) => {
                tracing::error!(error = %err, "database error");
                json!({ "error": "An unexpected error occurred" })
            }
            Error::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                json!({ "error": "An unexpected error occurred" })
            }
            Error::Config(_) => json!({ "error": "An unexpected error occurred" }),
            Error::Reqwest(err) => json!({ "error": format!("External service error: {}", err) }),
            Error::BadRequest(msg)
            | Error::Conflict(msg)
            | Error::Unauthorized(msg)
            | Error::Forbidden(msg)
            | Error::NotFound(msg)
            | Error::Upstream(msg) => json!({ "error": msg }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                let code = db_err.code().map(|c| c.to_string());
                match code.as_deref() {
                    Some(UNIQUE_VIOLATION) => {
                        Error::Conflict(format!("Duplicate value violates {}", constraint))
                    }
                    Some(FOREIGN_KEY_VIOLATION) => Error::InvalidReference(constraint),
                    Some(CHECK_VIOLATION) => {
                        Error::BadRequest(format!("Value violates {}", constraint))
                    }
                    _ => Error::Database(sqlx::Error::Database(db_err)),
                }
            }
            other => Error::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_status() {
        assert_eq!(
            Error::InvalidReference("department_id".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Conflict("dup".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::InvalidTransition {
                from: CandidateStatus::Applied,
                to: CandidateStatus::Offered
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Upstream("llm".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn messages_name_the_offending_field_and_states() {
        assert_eq!(
            Error::InvalidReference("hiring_manager_id".into()).to_string(),
            "Invalid hiring_manager_id"
        );
        assert_eq!(
            Error::InvalidTransition {
                from: CandidateStatus::Applied,
                to: CandidateStatus::Offered
            }
            .to_string(),
            "Invalid status transition from applied to offered"
        );
    }

    #[test]
    fn row_not_found_becomes_not_found() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
