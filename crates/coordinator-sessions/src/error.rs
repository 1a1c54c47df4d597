use thiserror::Error;

/// Errors that can occur against the session store.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No entry exists for this namespace/key pair (or it expired).
    #[error("session entry not found: {0}")]
    NotFound(String),

    /// The payload could not be serialized/deserialized to JSON.
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
