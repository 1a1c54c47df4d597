use std::time::Duration;

/// Which external collaborator an adapter speaks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    Transport,
    WebhookTarget,
    TabularStore,
    Llm,
    CalendarMail,
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Transport => "transport",
            Self::WebhookTarget => "webhook_target",
            Self::TabularStore => "tabular_store",
            Self::Llm => "llm",
            Self::CalendarMail => "calendar_mail",
        };
        write!(f, "{s}")
    }
}

/// Coarse shape of a call, used to pick the timeout budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationClass {
    Read,
    Write,
    BatchWrite,
}

impl OperationClass {
    pub fn budget(&self) -> Duration {
        match self {
            OperationClass::Read => Duration::from_secs(10),
            OperationClass::Write => Duration::from_secs(15),
            OperationClass::BatchWrite => Duration::from_secs(30),
        }
    }
}

/// A single unit of work handed to an [`crate::Adapter`]. Adapters only
/// understand the variants that match their own [`AdapterKind`]; anything
/// else is a caller bug and surfaces as `AdapterErrorKind::Permanent`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AdapterOp {
    SendMessage {
        conversation_id: String,
        text: String,
    },
    PostWebhook {
        url: String,
        secret: Option<String>,
        body: serde_json::Value,
    },
    AppendRow {
        sheet: String,
        row: serde_json::Value,
    },
    CompleteChat {
        system_prompt: String,
        messages: Vec<serde_json::Value>,
    },
    CreateCalendarEvent {
        attendee_email: String,
        title: String,
        starts_at: chrono::DateTime<chrono::Utc>,
        duration_minutes: i64,
    },
    SendMail {
        to: String,
        subject: String,
        body: String,
    },
}

impl AdapterOp {
    pub fn class(&self) -> OperationClass {
        match self {
            AdapterOp::SendMessage { .. }
            | AdapterOp::PostWebhook { .. }
            | AdapterOp::CreateCalendarEvent { .. }
            | AdapterOp::SendMail { .. } => OperationClass::Write,
            AdapterOp::AppendRow { .. } => OperationClass::BatchWrite,
            AdapterOp::CompleteChat { .. } => OperationClass::Read,
        }
    }
}

/// Successful result of an [`crate::Adapter::execute`] call.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum AdapterOutcome {
    Delivered,
    Appended { row_id: Option<String> },
    Completion { text: String },
    EventCreated { external_id: String },
    Empty,
}
