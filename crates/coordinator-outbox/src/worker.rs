use std::collections::HashMap;
use std::sync::Arc;

use coordinator_adapters::{Adapter, AdapterKind, AdapterOp};
use coordinator_core::config::{OUTBOX_BACKOFF_CAP_SECS, TRANSPORT_ALERT_MAX_ATTEMPTS};
use coordinator_core::error::AdapterErrorKind;
use coordinator_db::{OutboxRepo, OutboxRow};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::Result;

const POLL_INTERVAL_SECS: u64 = 2;

/// Drains due outbox items, dispatching each to its registered adapter with
/// a retry/backoff/dead-letter contract.
///
/// A dead-lettered item that did not originate from the transport adapter
/// triggers a best-effort boss alert sent through the transport adapter with
/// a tight `max_attempts` so a persistently broken transport cannot recurse
/// into alerting about itself forever.
pub struct OutboxWorkerPool {
    repo: OutboxRepo,
    adapters: HashMap<AdapterKind, Arc<dyn Adapter>>,
    concurrency: usize,
    boss_conversation_id: Option<String>,
}

impl OutboxWorkerPool {
    pub fn new(repo: OutboxRepo, concurrency: usize) -> Self {
        Self {
            repo,
            adapters: HashMap::new(),
            concurrency,
            boss_conversation_id: None,
        }
    }

    pub fn register(&mut self, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    /// Conversation used for best-effort dead-letter alerts to the boss.
    pub fn with_boss_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.boss_conversation_id = Some(conversation_id.into());
        self
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("outbox worker pool started");
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(POLL_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.drain_once().await {
                        error!("outbox drain failed: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("outbox worker pool shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn drain_once(&self) -> Result<()> {
        let due = self.repo.claim_due(self.concurrency as i64)?;
        if due.is_empty() {
            return Ok(());
        }

        let mut set = JoinSet::new();
        for item in due {
            let repo = self.repo.clone();
            let adapter = self.adapters.get(&target_kind(&item.target_adapter)).cloned();
            let boss_conversation_id = self.boss_conversation_id.clone();
            set.spawn(async move {
                dispatch_one(repo, adapter, item, boss_conversation_id).await;
            });
        }
        while set.join_next().await.is_some() {}
        Ok(())
    }
}

fn target_kind(name: &str) -> AdapterKind {
    match name {
        "webhook_target" => AdapterKind::WebhookTarget,
        "tabular_store" => AdapterKind::TabularStore,
        "llm" => AdapterKind::Llm,
        "calendar_mail" => AdapterKind::CalendarMail,
        _ => AdapterKind::Transport,
    }
}

async fn dispatch_one(
    repo: OutboxRepo,
    adapter: Option<Arc<dyn Adapter>>,
    item: OutboxRow,
    boss_conversation_id: Option<String>,
) {
    let Some(adapter) = adapter else {
        warn!(target = %item.target_adapter, "no adapter registered, retrying later");
        let _ = repo.mark_retry(&item.id, "no adapter registered", OUTBOX_BACKOFF_CAP_SECS);
        return;
    };

    let op: AdapterOp = match serde_json::from_value(item.payload.clone()) {
        Ok(op) => op,
        Err(e) => {
            error!(id = %item.id, error = %e, "dead-lettering outbox item with malformed payload");
            let _ = repo.mark_dead_letter(&item.id, &format!("malformed payload: {e}"));
            return;
        }
    };

    match adapter.execute(op).await {
        Ok(_) => {
            let _ = repo.mark_delivered(&item.id);
        }
        Err(e) if e.kind.is_retryable() => {
            info!(id = %item.id, error = %e, "outbox item failed, scheduling retry");
            let _ = repo.mark_retry(&item.id, &e.to_string(), OUTBOX_BACKOFF_CAP_SECS);
        }
        Err(e) => {
            warn!(id = %item.id, error = %e, "dead-lettering outbox item");
            let _ = repo.mark_dead_letter(&item.id, &e.to_string());
            alert_boss_of_dead_letter(&repo, &item, &e, boss_conversation_id);
        }
    }
}

fn alert_boss_of_dead_letter(
    repo: &OutboxRepo,
    item: &OutboxRow,
    error: &coordinator_core::error::AdapterError,
    boss_conversation_id: Option<String>,
) {
    if item.target_adapter == "transport" {
        error!(id = %item.id, error = %error, "transport delivery dead-lettered, logging only to avoid alert recursion");
        return;
    }

    let Some(conversation_id) = boss_conversation_id else {
        return;
    };

    let alert = AdapterOp::SendMessage {
        conversation_id,
        text: format!(
            "delivery to {} failed permanently ({}): {}",
            item.target_adapter, error.kind, error
        ),
    };
    let payload = serde_json::to_value(&alert).unwrap_or(serde_json::Value::Null);
    let idempotency_key = format!("dead-letter-alert:{}", item.id);
    if let Err(e) = repo.enqueue("transport", &payload, &idempotency_key, TRANSPORT_ALERT_MAX_ATTEMPTS) {
        error!(error = %e, "failed to enqueue dead-letter alert");
    }
}
