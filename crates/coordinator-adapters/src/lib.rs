//! `coordinator-adapters` — the boundary crate for every external
//! collaborator the coordinator talks to.
//!
//! An adapter owns its own HTTP client/session and nothing else: it holds no
//! reference to a repository and keeps no cross-request state beyond its own
//! connection. Every call is wrapped in [`tokio::time::timeout`] by the
//! caller via [`OperationClass::budget`].

pub mod adapter;
pub mod calendar_mail;
pub mod llm;
pub mod tabular_store;
pub mod transport;
pub mod types;
pub mod webhook_target;

pub use adapter::Adapter;
pub use calendar_mail::CalendarMailAdapter;
pub use coordinator_core::error::{AdapterError, AdapterErrorKind};
pub use llm::LlmAdapter;
pub use tabular_store::TabularStoreAdapter;
pub use transport::TransportAdapter;
pub use types::{AdapterKind, AdapterOp, AdapterOutcome, OperationClass};
pub use webhook_target::WebhookTargetAdapter;
