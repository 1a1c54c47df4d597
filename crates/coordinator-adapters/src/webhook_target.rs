use async_trait::async_trait;
use coordinator_core::error::{AdapterError, AdapterErrorKind};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::instrument;

use crate::adapter::{classify_reqwest_error, with_budget, Adapter};
use crate::types::{AdapterKind, AdapterOp, AdapterOutcome};

type HmacSha256 = Hmac<Sha256>;

/// Posts task/conversation events to a boss-configured external webhook
/// URL, HMAC-signing the body the way an outgoing webhook dispatcher does
/// so the receiver can authenticate the call.
pub struct WebhookTargetAdapter {
    client: reqwest::Client,
}

impl WebhookTargetAdapter {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn sign(secret: &str, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("hmac accepts keys of any length");
        mac.update(body.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl Default for WebhookTargetAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for WebhookTargetAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::WebhookTarget
    }

    #[instrument(skip(self, op))]
    async fn execute(&self, op: AdapterOp) -> Result<AdapterOutcome, AdapterError> {
        let AdapterOp::PostWebhook { url, secret, body } = &op else {
            return Err(AdapterError::new(
                AdapterErrorKind::Permanent,
                "webhook target adapter received an unsupported operation",
            ));
        };

        let payload = body.to_string();
        let mut request = self.client.post(url).header("content-type", "application/json");
        if let Some(secret) = secret {
            request = request.header("x-coordinator-signature", Self::sign(secret, &payload));
        }

        with_budget(&op, async {
            request
                .body(payload)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map(|_| AdapterOutcome::Delivered)
                .map_err(|e| AdapterError::new(classify_reqwest_error(&e), e.to_string()))
        })
        .await
    }
}
