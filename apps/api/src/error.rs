//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in ComTrack                               │
//! │                                                                         │
//! │  Handler                                                               │
//! │  Result<Json<Envelope<T>>, ApiError>                                   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ValidationError ─── bad period / date / name ──┐                      │
//! │  CoreError ───────── not found ─────────────────┤                      │
//! │  DbError ─────────── duplicate / query failed ──┼──► ApiError          │
//! │  JsonRejection ───── malformed body ────────────┘        │             │
//! │                                                           ▼             │
//! │                                      ┌───────────────────────────────┐ │
//! │                                      │ 400 VALIDATION_ERROR          │ │
//! │                                      │ 404 NOT_FOUND                 │ │
//! │                                      │ 409 CONFLICT                  │ │
//! │                                      │ 500 DATABASE_ERROR            │ │
//! │                                      └───────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged with their detail and answered with a
//! generic message.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use comtrack_core::{CoreError, ValidationError};
use comtrack_db::DbError;

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "success": false,
///   "error": "VALIDATION_ERROR",
///   "message": "period must be one of month, quarter, year"
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Machine-readable failure category; decides the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// 404
    NotFound,
    /// 400: bad period, date, id, name or body
    ValidationError,
    /// 409: duplicate entity type name
    Conflict,
    /// 500: storage failure, details only in the log
    DatabaseError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn missing(what: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", what, id))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// A storage failure. `detail` is logged, the client sees `public`.
    fn storage(detail: impl std::fmt::Display, public: &str) -> Self {
        tracing::error!(detail = %detail, "{}", public);
        ApiError::new(ErrorCode::DatabaseError, public)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.status().as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.code,
            "message": self.message,
        });
        (self.code.status(), Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::missing(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' is already taken", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!(detail = %message, "Rejected dangling reference");
                ApiError::bad_request("Referenced record does not exist")
            }
            DbError::ConnectionFailed(detail) => ApiError::storage(detail, "Database unavailable"),
            DbError::PoolExhausted => ApiError::storage("pool exhausted", "Database busy"),
            other @ (DbError::MigrationFailed(_) | DbError::QueryFailed(_) | DbError::Internal(_)) => {
                ApiError::storage(other, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EntityTypeNotFound(id) => ApiError::missing("Entity type", &id),
            CoreError::EntityNotFound(id) => ApiError::missing("Entity", &id),
            CoreError::TransactionNotFound(id) => ApiError::missing("Transaction", &id),
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_mapping() {
        let err: ApiError = DbError::duplicate("name", "Motor").into();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.code.status(), StatusCode::CONFLICT);
        assert!(err.message.contains("Motor"));

        let err: ApiError = DbError::QueryFailed("near SELECT: syntax error".into()).into();
        assert_eq!(err.code.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("syntax"), "internal detail is not leaked");

        let err: ApiError = DbError::not_found("Transaction", "abc").into();
        assert_eq!(err.code.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error_mapping() {
        let err: ApiError = ValidationError::required("name").into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "name is required");

        let err: ApiError = CoreError::EntityNotFound("x".into()).into();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
