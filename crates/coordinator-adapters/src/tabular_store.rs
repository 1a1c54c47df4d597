use async_trait::async_trait;
use coordinator_core::error::{AdapterError, AdapterErrorKind};
use tracing::instrument;

use crate::adapter::{classify_reqwest_error, with_budget, Adapter};
use crate::types::{AdapterKind, AdapterOp, AdapterOutcome};

/// Appends rows to an external tabular store (e.g. a spreadsheet-backed
/// reporting API) used for the boss-facing task export mirror.
pub struct TabularStoreAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TabularStoreAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Read-side lookup used by tier 2 of assignee resolution. Not part of the `Adapter` trait: the trait's `execute` only
    /// models the outbox's write path, and this is a direct, un-retried
    /// read against the derived-view mirror.
    #[instrument(skip(self))]
    pub async fn lookup_assignee(&self, name: &str) -> Result<Option<String>, AdapterError> {
        let resp = self
            .client
            .get(format!("{}/assignees/{}", self.base_url, name))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AdapterError::new(classify_reqwest_error(&e), e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp
            .error_for_status()
            .map_err(|e| AdapterError::new(classify_reqwest_error(&e), e.to_string()))?;

        let transport_id = resp
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("transport_id").and_then(|t| t.as_str()).map(String::from));
        Ok(transport_id)
    }
}

#[async_trait]
impl Adapter for TabularStoreAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::TabularStore
    }

    #[instrument(skip(self, op))]
    async fn execute(&self, op: AdapterOp) -> Result<AdapterOutcome, AdapterError> {
        let AdapterOp::AppendRow { sheet, row } = &op else {
            return Err(AdapterError::new(
                AdapterErrorKind::Permanent,
                "tabular store adapter received an unsupported operation",
            ));
        };

        with_budget(&op, async {
            let resp = self
                .client
                .post(format!("{}/sheets/{}/rows", self.base_url, sheet))
                .bearer_auth(&self.api_key)
                .json(row)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| AdapterError::new(classify_reqwest_error(&e), e.to_string()))?;

            let row_id = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("row_id").and_then(|r| r.as_str()).map(String::from));

            Ok(AdapterOutcome::Appended { row_id })
        })
        .await
    }
}
