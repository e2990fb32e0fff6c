//! Error types for the PostgreSQL storage backend.

use catalog_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for foreign key violations (23503).
pub const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL error code for check constraint violations (23514).
pub const PG_CHECK_VIOLATION: &str = "23514";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Class 08 is "connection exception".
fn is_connection_exception(err: &SqlxError) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().is_some_and(|code| code.starts_with("08"))
    } else {
        false
    }
}

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Database(e) => storage_error(e, "database operation failed"),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Classifies a sqlx error into the storage error taxonomy.
///
/// Pool exhaustion becomes `Timeout`, transport failures become `Connection`
/// and constraint violations become `InvalidInput`.
pub fn storage_error(err: SqlxError, context: &str) -> StorageError {
    match &err {
        SqlxError::PoolTimedOut => StorageError::timeout(format!("{context}: {err}")),
        SqlxError::Io(_)
        | SqlxError::Tls(_)
        | SqlxError::PoolClosed
        | SqlxError::WorkerCrashed => StorageError::connection(format!("{context}: {err}")),
        _ if is_connection_exception(&err) => {
            StorageError::connection(format!("{context}: {err}"))
        }
        _ if has_pg_error_code(&err, PG_FOREIGN_KEY_VIOLATION) => {
            StorageError::invalid_input(format!("{context}: referenced row does not exist"))
        }
        _ if has_pg_error_code(&err, PG_CHECK_VIOLATION) => {
            StorageError::invalid_input(format!("{context}: {err}"))
        }
        _ => StorageError::internal(format!("{context}: {err}")),
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
