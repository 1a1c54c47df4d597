//! `coordinator-classify` — intent classification and confidence routing
//!.

pub mod classifier;
pub mod error;
pub mod router;
pub mod types;

pub use classifier::IntentClassifier;
pub use error::{ClassifyError, Result};
pub use router::route;
pub use types::{Intent, IntentResult, RoutingDecision};
