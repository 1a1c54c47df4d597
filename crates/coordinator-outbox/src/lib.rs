//! `coordinator-outbox` — durable at-least-once delivery for everything the
//! coordinator sends to an external collaborator.
//!
//! Writers enqueue via [`coordinator_db::OutboxRepo`] in the same
//! transaction as the domain write; this crate only drains and dispatches.

pub mod error;
pub mod worker;

pub use error::{OutboxError, Result};
pub use worker::OutboxWorkerPool;
