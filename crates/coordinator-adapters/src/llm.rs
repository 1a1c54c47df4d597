use async_trait::async_trait;
use coordinator_core::error::{AdapterError, AdapterErrorKind};
use tracing::instrument;

use crate::adapter::{classify_reqwest_error, with_budget, Adapter};
use crate::types::{AdapterKind, AdapterOp, AdapterOutcome};

/// Calls an OpenAI-compatible chat completion endpoint for intent
/// classification and free-form dialog fallback.
pub struct LlmAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Adapter for LlmAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Llm
    }

    #[instrument(skip(self, op))]
    async fn execute(&self, op: AdapterOp) -> Result<AdapterOutcome, AdapterError> {
        let AdapterOp::CompleteChat {
            system_prompt,
            messages,
        } = &op
        else {
            return Err(AdapterError::new(
                AdapterErrorKind::Permanent,
                "llm adapter received an unsupported operation",
            ));
        };

        let mut full_messages = vec![serde_json::json!({"role": "system", "content": system_prompt})];
        full_messages.extend(messages.iter().cloned());

        with_budget(&op, async {
            let resp = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&serde_json::json!({
                    "model": self.model,
                    "messages": full_messages,
                }))
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| AdapterError::new(classify_reqwest_error(&e), e.to_string()))?;

            let body: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| AdapterError::new(AdapterErrorKind::Transient, e.to_string()))?;

            let text = body["choices"][0]["message"]["content"]
                .as_str()
                .unwrap_or_default()
                .to_string();

            Ok(AdapterOutcome::Completion { text })
        })
        .await
    }
}
