use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use coordinator_core::types::SessionNamespace;

/// A single namespaced entry: `payload` plus its absolute expiry.
///
/// `durable` reflects whether this entry actually reached the external
/// cache or is only held in the process-local fallback map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    pub payload: serde_json::Value,
    pub expires_at: DateTime<Utc>,
    pub durable: bool,
}

impl SessionEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// `{key -> payload}` listing returned by `list(ns)`.
#[derive(Debug, Clone, Serialize)]
pub struct ListedEntry {
    pub key: String,
    pub payload: serde_json::Value,
}

/// Per-namespace live entry counts returned by `stats()`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub per_namespace: HashMap<String, usize>,
    pub backend_connected: bool,
}
