use async_trait::async_trait;
use coordinator_core::error::{AdapterError, AdapterErrorKind};
use tracing::instrument;

use crate::adapter::{classify_reqwest_error, with_budget, Adapter};
use crate::types::{AdapterKind, AdapterOp, AdapterOutcome};

/// Delivers chat messages to the configured chat transport's send-message
/// API. Deliberately generic rather than a named chat provider, so a
/// deployment can point it at whichever transport it actually runs.
pub struct TransportAdapter {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TransportAdapter {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl Adapter for TransportAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Transport
    }

    #[instrument(skip(self, op))]
    async fn execute(&self, op: AdapterOp) -> Result<AdapterOutcome, AdapterError> {
        let AdapterOp::SendMessage {
            conversation_id,
            text,
        } = &op
        else {
            return Err(AdapterError::new(
                AdapterErrorKind::Permanent,
                "transport adapter received an unsupported operation",
            ));
        };

        with_budget(&op, async {
            self.client
                .post(format!("{}/messages", self.base_url))
                .bearer_auth(&self.token)
                .json(&serde_json::json!({
                    "conversation_id": conversation_id,
                    "text": text,
                }))
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map(|_| AdapterOutcome::Delivered)
                .map_err(|e| AdapterError::new(classify_reqwest_error(&e), e.to_string()))
        })
        .await
    }
}
