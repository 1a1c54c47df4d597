use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error(transparent)]
    Db(#[from] coordinator_db::DbError),

    #[error("no adapter registered for target '{0}'")]
    NoAdapterRegistered(String),

    #[error("malformed outbox payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OutboxError>;
