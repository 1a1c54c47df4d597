use thiserror::Error;

#[derive(Debug, Error)]
pub enum TasksError {
    #[error(transparent)]
    Db(#[from] coordinator_db::DbError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("illegal status transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, TasksError>;
