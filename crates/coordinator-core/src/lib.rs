//! `coordinator-core` — shared types, config, and error taxonomy used by
//! every other `coordinator-*` crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::CoordinatorConfig;
pub use error::{AdapterError, AdapterErrorKind, CoordinatorError, Result};
pub use types::{
    ConversationId, Priority, SessionNamespace, StoreKey, TaskId, TaskRef, TaskStatus, UserRef,
    UserRole,
};
