use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Adapter(#[from] coordinator_core::error::AdapterError),

    #[error("classifier returned malformed output: {0}")]
    MalformedOutput(String),
}

pub type Result<T> = std::result::Result<T, ClassifyError>;
