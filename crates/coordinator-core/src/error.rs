use thiserror::Error;

/// Sub-kind of an external adapter failure, used by the outbox to decide
/// retry vs. dead-letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterErrorKind {
    Timeout,
    Auth,
    NotFound,
    RateLimited,
    Transient,
    Permanent,
}

impl AdapterErrorKind {
    /// Whether the outbox should retry this failure (vs. dead-letter immediately).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AdapterErrorKind::Timeout | AdapterErrorKind::RateLimited | AdapterErrorKind::Transient
        )
    }
}

impl std::fmt::Display for AdapterErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::Auth => "auth",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Transient => "transient",
            Self::Permanent => "permanent",
        };
        write!(f, "{s}")
    }
}

/// Canonical error produced by every external adapter.
#[derive(Debug, Clone, Error)]
#[error("adapter error ({kind}): {message}")]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub message: String,
    /// Hint from the receiver (e.g. a 429's `Retry-After`), if present.
    pub retry_after: Option<std::time::Duration>,
}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, d: std::time::Duration) -> Self {
        self.retry_after = Some(d);
        self
    }
}

/// Top-level error taxonomy shared across coordinator crates.
///
/// Repositories raise specific kinds; handlers catch at the boundary and
/// choose to retry (outbox), degrade, or abort and report to the user.
/// Each subsystem crate (`coordinator-db`, `coordinator-sessions`, …) keeps
/// its own local error enum for its own internals and converts into this
/// one only at a cross-crate boundary (HTTP handler, scheduler job,
/// background task).
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error (request {request_id}): {message}")]
    Internal {
        request_id: String,
        message: String,
    },
}

impl CoordinatorError {
    /// Short error code for client-facing responses; never leaks internals.
    pub fn code(&self) -> &'static str {
        match self {
            CoordinatorError::Config(_) => "CONFIG_ERROR",
            CoordinatorError::Validation(_) => "VALIDATION_FAILED",
            CoordinatorError::NotFound(_) => "NOT_FOUND",
            CoordinatorError::DuplicateKey(_) => "DUPLICATE_KEY",
            CoordinatorError::Adapter(_) => "ADAPTER_ERROR",
            CoordinatorError::Persistence(_) => "PERSISTENCE_FAILED",
            CoordinatorError::Serialization(_) => "SERIALIZATION_ERROR",
            CoordinatorError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            request_id: uuid::Uuid::new_v4().to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
