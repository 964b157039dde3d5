//! # Domain Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request input ──► ValidationError ─┐                                   │
//! │                                     ├──► CoreError ──► ApiError (400)  │
//! │  missing parent ────────────────────┘                  ApiError (404)  │
//! │                                                                         │
//! │  sqlx::Error ──► DbError (comtrack-db) ──────────────► ApiError (5xx)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Period arithmetic itself cannot fail: a reference date always has a
//! month, a quarter and a financial year. Only parsing the request can.

use thiserror::Error;

/// A request referred to something that is not there, or was malformed.
#[derive(Debug, Error)]
pub enum CoreError {
    /// ## When This Occurs
    /// - Creating a partner under an unknown product category
    #[error("Entity type not found: {0}")]
    EntityTypeNotFound(String),

    /// ## When This Occurs
    /// - Listing transactions of an unknown partner
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Rejected input. Raised before the period calculator or the database is
/// involved.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} is longer than {max} characters")]
    TooLong { field: String, max: usize },

    /// Unparseable UUID, date, month or amount.
    #[error("invalid {field}: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A value outside a closed set, e.g. an unknown `period`.
    #[error("{field} must be one of {}", .allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
