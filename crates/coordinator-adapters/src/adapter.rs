use async_trait::async_trait;
use coordinator_core::error::{AdapterError, AdapterErrorKind};

use crate::types::{AdapterKind, AdapterOp, AdapterOutcome};

/// Common interface implemented by every external-collaborator adapter
/// (transport, webhook target, tabular store, LLM, calendar/mail).
///
/// Implementations must be `Send + Sync` so they can be shared across the
/// outbox worker pool and the dialog engine. An adapter holds only its own
/// connection/session state and never a reference to a repository.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Stable identifier for this adapter, used for outbox routing and logs.
    fn kind(&self) -> AdapterKind;

    /// Execute one operation against the external collaborator.
    ///
    /// Implementations are expected to wrap their own I/O in
    /// [`tokio::time::timeout`] using `op.class().budget()` and translate a
    /// timeout into [`AdapterErrorKind::Timeout`].
    async fn execute(&self, op: AdapterOp) -> Result<AdapterOutcome, AdapterError>;
}

/// Classify a `reqwest` failure into the retry taxonomy the outbox understands.
pub fn classify_reqwest_error(e: &reqwest::Error) -> AdapterErrorKind {
    if e.is_timeout() {
        AdapterErrorKind::Timeout
    } else if e.is_connect() {
        AdapterErrorKind::Transient
    } else if let Some(status) = e.status() {
        if status.as_u16() == 429 {
            AdapterErrorKind::RateLimited
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            AdapterErrorKind::Auth
        } else if status.as_u16() == 404 {
            AdapterErrorKind::NotFound
        } else if status.is_server_error() {
            AdapterErrorKind::Transient
        } else {
            AdapterErrorKind::Permanent
        }
    } else {
        AdapterErrorKind::Transient
    }
}

/// Run `fut` under the timeout dictated by `op`'s [`crate::types::OperationClass`],
/// collapsing an elapsed deadline into `AdapterErrorKind::Timeout`.
pub async fn with_budget<F, T>(
    op: &AdapterOp,
    fut: F,
) -> Result<T, AdapterError>
where
    F: std::future::Future<Output = Result<T, AdapterError>>,
{
    let budget = op.class().budget();
    match tokio::time::timeout(budget, fut).await {
        Ok(inner) => inner,
        Err(_) => Err(AdapterError::new(
            AdapterErrorKind::Timeout,
            format!("operation exceeded {}ms budget", budget.as_millis()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AdapterOp;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn with_budget_times_out_slow_futures() {
        let op = AdapterOp::SendMessage {
            conversation_id: "c1".into(),
            text: "hi".into(),
        };
        let result: Result<(), AdapterError> = with_budget(&op, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        assert!(matches!(
            result,
            Err(AdapterError {
                kind: AdapterErrorKind::Timeout,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn with_budget_returns_inner_ok_when_fast() {
        let op = AdapterOp::AppendRow {
            sheet: "tasks".into(),
            row: serde_json::json!({}),
        };
        let result = with_budget(&op, async { Ok::<_, AdapterError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
