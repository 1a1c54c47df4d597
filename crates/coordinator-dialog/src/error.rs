use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialogError {
    #[error(transparent)]
    Db(#[from] coordinator_db::DbError),

    #[error(transparent)]
    Session(#[from] coordinator_sessions::SessionError),

    #[error(transparent)]
    Classify(#[from] coordinator_classify::ClassifyError),

    #[error(transparent)]
    Tasks(#[from] coordinator_tasks::TasksError),

    #[error("unknown conversation stage string: {0}")]
    UnknownStage(String),
}

pub type Result<T> = std::result::Result<T, DialogError>;
