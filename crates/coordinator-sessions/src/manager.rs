use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use coordinator_core::types::{SessionNamespace, StoreKey};
use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, instrument, warn};

use crate::db::CacheBackend;
use crate::error::Result;
use crate::types::{ListedEntry, SessionEntry, StoreStats};

/// Sweep interval for the background TTL reaper.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// `(namespace, key) -> JSON payload` store with per-entry TTL.
///
/// Writes are attempted against the external cache first; on failure (or
/// when no cache is configured) they fall back to a process-local map with
/// identical read/write semantics, flagged as non-durable. A per-key async
/// mutex serializes writers under the same `(ns, key)` pair; writers under
/// different keys proceed independently.
pub struct SessionStore {
    backend: CacheBackend,
    local: DashMap<String, SessionEntry>,
    locks: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl SessionStore {
    pub async fn connect(cache_url: Option<&str>) -> Arc<Self> {
        let store = Arc::new(Self {
            backend: CacheBackend::connect(cache_url).await,
            local: DashMap::new(),
            locks: DashMap::new(),
        });
        store.clone().spawn_sweeper();
        store
    }

    fn lock_for(&self, composite_key: &str) -> Arc<AsyncMutex<()>> {
        self.locks
            .entry(composite_key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// `get(ns, key) -> payload | null`.
    #[instrument(skip(self), fields(ns = %ns, key))]
    pub async fn get(&self, ns: SessionNamespace, key: &str) -> Result<Option<serde_json::Value>> {
        let composite = StoreKey::new(ns, key).to_string();

        if let Some(raw) = self.backend.get(&composite).await {
            let payload: serde_json::Value = serde_json::from_str(&raw)?;
            return Ok(Some(payload));
        }

        let now = Utc::now();
        match self.local.get(&composite) {
            Some(entry) if !entry.is_expired(now) => Ok(Some(entry.payload.clone())),
            Some(_) => {
                self.local.remove(&composite);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// `set(ns, key, payload, ttl)`. Cancellation after the
    /// store-side write commits is not honored by design — callers that
    /// await this future to completion always see the write land.
    #[instrument(skip(self, payload), fields(ns = %ns, key, ttl_secs = ttl.as_secs()))]
    pub async fn set(
        &self,
        ns: SessionNamespace,
        key: &str,
        payload: serde_json::Value,
        ttl: Duration,
    ) -> Result<()> {
        let composite = StoreKey::new(ns, key).to_string();
        let guard = self.lock_for(&composite);
        let _permit = guard.lock().await;

        let serialized = serde_json::to_string(&payload)?;
        let durable = self.backend.set_ex(&composite, &serialized, ttl.as_secs()).await;

        if !durable {
            debug!("cache write failed or unconfigured, writing to local fallback map");
        }

        self.local.insert(
            composite,
            SessionEntry {
                payload,
                expires_at: Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default(),
                durable,
            },
        );
        Ok(())
    }

    /// Convenience wrapper using the namespace's default TTL.
    pub async fn set_default_ttl(
        &self,
        ns: SessionNamespace,
        key: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        self.set(ns, key, payload, ns.default_ttl()).await
    }

    /// `clear(ns, key)`.
    #[instrument(skip(self), fields(ns = %ns, key))]
    pub async fn clear(&self, ns: SessionNamespace, key: &str) -> Result<()> {
        let composite = StoreKey::new(ns, key).to_string();
        let guard = self.lock_for(&composite);
        let _permit = guard.lock().await;

        self.backend.del(&composite).await;
        self.local.remove(&composite);
        Ok(())
    }

    /// `list(ns) -> [{key, payload}]`. Local-map entries are
    /// authoritative here: the external cache has no efficient scan-by-
    /// prefix primitive wired up, so listing only reflects what has also
    /// landed (or fallen back) locally.
    #[instrument(skip(self), fields(ns = %ns))]
    pub fn list(&self, ns: SessionNamespace) -> Vec<ListedEntry> {
        let prefix = format!("{ns}:");
        let now = Utc::now();
        self.local
            .iter()
            .filter(|e| e.key().starts_with(&prefix) && !e.value().is_expired(now))
            .map(|e| ListedEntry {
                key: e.key()[prefix.len()..].to_string(),
                payload: e.value().payload.clone(),
            })
            .collect()
    }

    /// `stats() -> {per-ns counts}`.
    pub fn stats(&self) -> StoreStats {
        let now = Utc::now();
        let mut per_namespace: HashMap<String, usize> = HashMap::new();
        for entry in self.local.iter() {
            if entry.value().is_expired(now) {
                continue;
            }
            if let Some((ns, _)) = entry.key().split_once(':') {
                *per_namespace.entry(ns.to_string()).or_insert(0) += 1;
            }
        }
        StoreStats {
            per_namespace,
            backend_connected: self.backend.is_connected(),
        }
    }

    fn spawn_sweeper(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let now = Utc::now();
                let expired: Vec<String> = self
                    .local
                    .iter()
                    .filter(|e| e.value().is_expired(now))
                    .map(|e| e.key().clone())
                    .collect();
                for key in expired {
                    self.local.remove(&key);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_round_trips_through_local_fallback() {
        let store = SessionStore::connect(None).await;
        store
            .set(
                SessionNamespace::Action,
                "user-1",
                json!({"action": "clear_tasks"}),
                Duration::from_secs(5 * 60),
            )
            .await
            .unwrap();

        let got = store.get(SessionNamespace::Action, "user-1").await.unwrap();
        assert_eq!(got, Some(json!({"action": "clear_tasks"})));
    }

    #[tokio::test]
    async fn get_on_missing_key_returns_none() {
        let store = SessionStore::connect(None).await;
        let got = store.get(SessionNamespace::Validation, "missing").await.unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn clear_removes_entry() {
        let store = SessionStore::connect(None).await;
        store
            .set_default_ttl(SessionNamespace::Review, "task-1", json!({"ok": true}))
            .await
            .unwrap();
        store.clear(SessionNamespace::Review, "task-1").await.unwrap();
        let got = store.get(SessionNamespace::Review, "task-1").await.unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn list_scopes_to_namespace() {
        let store = SessionStore::connect(None).await;
        store
            .set_default_ttl(SessionNamespace::Batch, "k1", json!(1))
            .await
            .unwrap();
        store
            .set_default_ttl(SessionNamespace::Spec, "k2", json!(2))
            .await
            .unwrap();

        let batch_entries = store.list(SessionNamespace::Batch);
        assert_eq!(batch_entries.len(), 1);
        assert_eq!(batch_entries[0].key, "k1");
    }

    #[tokio::test]
    async fn stats_counts_live_entries_per_namespace() {
        let store = SessionStore::connect(None).await;
        store
            .set_default_ttl(SessionNamespace::Action, "a", json!(1))
            .await
            .unwrap();
        store
            .set_default_ttl(SessionNamespace::Action, "b", json!(2))
            .await
            .unwrap();

        let stats = store.stats();
        assert_eq!(stats.per_namespace.get("action"), Some(&2));
        assert!(!stats.backend_connected);
    }

    #[tokio::test]
    async fn expired_entry_is_not_returned() {
        let store = SessionStore::connect(None).await;
        store
            .set(
                SessionNamespace::Recent,
                "msg-1",
                json!("hello"),
                Duration::from_millis(1),
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let got = store.get(SessionNamespace::Recent, "msg-1").await.unwrap();
        assert_eq!(got, None);
    }
}
