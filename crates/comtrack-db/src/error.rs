//! # Storage Errors
//!
//! ```text
//! sqlx::Error ──► DbError ──► ApiError (apps/api) ──► HTTP status
//!
//!   RowNotFound              NotFound               404
//!   unique constraint        UniqueViolation        409
//!   foreign key constraint   ForeignKeyViolation    400
//!   pool timed out           PoolExhausted          500
//!   anything else            QueryFailed/Internal   500
//! ```
//!
//! Failed aggregations are not retried here; the caller decides.

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Everything that can go wrong talking to SQLite.
#[derive(Debug, Error)]
pub enum DbError {
    /// The addressed row does not exist.
    ///
    /// ## When This Occurs
    /// - Correcting the amount of an unknown transaction
    /// - Recording a transaction for an unknown entity
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A unique column already holds this value.
    ///
    /// ## When This Occurs
    /// - A second entity type with an existing name
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// SQLite rejected or failed a statement.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True for constraint failures a repository may translate into a
    /// domain-specific error.
    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. }
        )
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    // SQLite reports "UNIQUE constraint failed: table.column"
                    ErrorKind::UniqueViolation => DbError::duplicate(
                        message
                            .rsplit(": ")
                            .next()
                            .unwrap_or("value")
                            .to_string(),
                        "unknown",
                    ),
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert!(!err.is_constraint());
    }

    #[test]
    fn test_pool_errors() {
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::PoolExhausted
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolClosed),
            DbError::ConnectionFailed(_)
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            DbError::not_found("Entity", "abc").to_string(),
            "Entity not found: abc"
        );
        assert!(DbError::duplicate("name", "Motor").is_constraint());
    }
}
