//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          CoreError (rule violations)       │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ← categorized, Domain(CoreError) passes through │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError::kind() → Validation | Conflict | NotFound | Transport | ...  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller decides: fix input / reload and retry / give up                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use mostruario_core::{CoreError, ErrorKind, ValidationError};
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate product code
    /// - Any UNIQUE index violation not translated into a domain error
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (the schema rejected a value).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// An UPDATE hit one of the immutability triggers.
    #[error("Immutable row: {0}")]
    ImmutableRow(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// SQLite lock contention outlasted the busy timeout.
    #[error("Database busy: {0}")]
    Busy(String),

    /// The operation did not finish within its deadline.
    ///
    /// Any open transaction was dropped and rolled back.
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    /// Configuration could not be loaded or is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A domain rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Classifies the error for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Domain(err) => err.kind(),
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::CheckViolation { .. } => ErrorKind::Validation,
            DbError::UniqueViolation { .. }
            | DbError::ForeignKeyViolation { .. }
            | DbError::ImmutableRow(_) => ErrorKind::Conflict,
            DbError::ConnectionFailed(_)
            | DbError::PoolExhausted
            | DbError::Busy(_)
            | DbError::Timeout { .. } => ErrorKind::Transport,
            DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::TransactionFailed(_)
            | DbError::InvalidConfig(_)
            | DbError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the same call may succeed if retried unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Returns the domain error, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            DbError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// SQLite primary result codes for lock contention.
const SQLITE_BUSY: &str = "5";
const SQLITE_LOCKED: &str = "6";
/// SQLITE_BUSY_SNAPSHOT (extended code of BUSY).
const SQLITE_BUSY_SNAPSHOT: &str = "517";

/// Returns true when the sqlx error is a UNIQUE constraint failure.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → constraint kind, busy, or trigger abort
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                let code = db_err.code().map(|c| c.into_owned());

                if db_err.is_unique_violation() {
                    // "UNIQUE constraint failed: <table>.<column>[, ...]"
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation { message: msg }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation { message: msg }
                } else if msg.starts_with("immutable:") {
                    DbError::ImmutableRow(msg)
                } else if matches!(
                    code.as_deref(),
                    Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) | Some(SQLITE_BUSY_SNAPSHOT)
                ) || msg.contains("database is locked")
                {
                    DbError::Busy(msg)
                } else {
                    DbError::QueryFailed(msg)
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(DbError::not_found("Sale", "x").kind(), ErrorKind::NotFound);
        assert_eq!(
            DbError::Domain(CoreError::DuplicateSale("sc".into())).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(DbError::duplicate("code", "RG-1").kind(), ErrorKind::Conflict);
        assert_eq!(
            DbError::CheckViolation {
                message: "CHECK constraint failed".into()
            }
            .kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_transport_errors_are_retryable() {
        let timeout = DbError::Timeout {
            operation: "showcases.create".into(),
            after_ms: 10,
        };
        assert!(timeout.is_retryable());
        assert!(DbError::Busy("database is locked".into()).is_retryable());
        assert!(DbError::PoolExhausted.is_retryable());
        assert!(!DbError::Domain(CoreError::NothingToSettle("sc".into())).is_retryable());
    }

    #[test]
    fn test_validation_converts_to_domain() {
        let err: DbError = ValidationError::MustBeNonZero {
            field: "quantity".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
