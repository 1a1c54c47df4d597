use async_trait::async_trait;
use coordinator_core::error::{AdapterError, AdapterErrorKind};
use tracing::instrument;

use crate::adapter::{classify_reqwest_error, with_budget, Adapter};
use crate::types::{AdapterKind, AdapterOp, AdapterOutcome};

/// Creates calendar events and sends mail through a single provider API
/// (e.g. Google Workspace), authenticated with a stored OAuth access token.
pub struct CalendarMailAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl CalendarMailAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// The access token is supplied per call rather than held by the
    /// adapter, since it is refreshed and looked up per-user by the caller.
    pub async fn send(&self, access_token: &str, op: AdapterOp) -> Result<AdapterOutcome, AdapterError> {
        match &op {
            AdapterOp::CreateCalendarEvent { .. } => self.create_event(access_token, op).await,
            AdapterOp::SendMail { .. } => self.send_mail(access_token, op).await,
            _ => Err(AdapterError::new(
                AdapterErrorKind::Permanent,
                "calendar/mail adapter received an unsupported operation",
            )),
        }
    }

    async fn create_event(&self, access_token: &str, op: AdapterOp) -> Result<AdapterOutcome, AdapterError> {
        let AdapterOp::CreateCalendarEvent {
            attendee_email,
            title,
            starts_at,
            duration_minutes,
        } = &op
        else {
            unreachable!()
        };
        let ends_at = *starts_at + chrono::Duration::minutes(*duration_minutes);

        with_budget(&op, async {
            let resp = self
                .client
                .post(format!("{}/calendar/events", self.base_url))
                .bearer_auth(access_token)
                .json(&serde_json::json!({
                    "attendee": attendee_email,
                    "title": title,
                    "start": starts_at.to_rfc3339(),
                    "end": ends_at.to_rfc3339(),
                }))
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| AdapterError::new(classify_reqwest_error(&e), e.to_string()))?;

            let body: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| AdapterError::new(AdapterErrorKind::Transient, e.to_string()))?;
            let external_id = body["id"].as_str().unwrap_or_default().to_string();
            Ok(AdapterOutcome::EventCreated { external_id })
        })
        .await
    }

    async fn send_mail(&self, access_token: &str, op: AdapterOp) -> Result<AdapterOutcome, AdapterError> {
        let AdapterOp::SendMail { to, subject, body } = &op else {
            unreachable!()
        };

        with_budget(&op, async {
            self.client
                .post(format!("{}/mail/send", self.base_url))
                .bearer_auth(access_token)
                .json(&serde_json::json!({"to": to, "subject": subject, "body": body}))
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map(|_| AdapterOutcome::Delivered)
                .map_err(|e| AdapterError::new(classify_reqwest_error(&e), e.to_string()))
        })
        .await
    }
}

#[async_trait]
impl Adapter for CalendarMailAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::CalendarMail
    }

    /// Calendar/mail calls require a per-user OAuth token, so routine
    /// dispatch goes through [`CalendarMailAdapter::send`] instead; this
    /// trait method exists for uniform registration and rejects direct use.
    #[instrument(skip(self, _op))]
    async fn execute(&self, _op: AdapterOp) -> Result<AdapterOutcome, AdapterError> {
        Err(AdapterError::new(
            AdapterErrorKind::Permanent,
            "calendar/mail adapter requires a caller-supplied access token, use send() directly",
        ))
    }
}
