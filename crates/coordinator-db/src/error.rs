use thiserror::Error;

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("persistence failed: {0}")]
    PersistenceFailed(String),
}

impl DbError {
    /// Classify a raw rusqlite error as `DuplicateKey` when it is a unique-
    /// constraint violation, otherwise fall through to `PersistenceFailed`.
    pub fn from_write(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref ffi_err, _) = e {
            if ffi_err.code == rusqlite::ErrorCode::ConstraintViolation {
                return DbError::DuplicateKey(e.to_string());
            }
        }
        DbError::PersistenceFailed(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
