use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coordinator_core::config::OUTBOX_DEFAULT_MAX_ATTEMPTS;
use coordinator_core::types::{SessionNamespace, TaskStatus};
use coordinator_db::types::{AuditEvent, TaskPatch};

use crate::app::AppState;
use crate::error::GatewayError;

/// Destructive, natural-language-triggered bulk operations that bypass the
/// normal clarify/preview flow entirely and instead go through a one-shot
/// yes/no gate. Detected by phrase matching, never the LLM — same reasoning
/// as batch splitting in `coordinator-dialog`: a destructive action must
/// never hinge on a model's best guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum DangerousAction {
    ClearTasks,
    ArchiveTasks,
}

impl DangerousAction {
    fn detect(message: &str) -> Option<Self> {
        let lower = message.to_lowercase();
        if lower.contains("clear") && lower.contains("task") {
            Some(Self::ClearTasks)
        } else if lower.contains("archive") && lower.contains("task") {
            Some(Self::ArchiveTasks)
        } else {
            None
        }
    }

    fn confirmation_prompt(&self) -> &'static str {
        match self {
            Self::ClearTasks => "This will clear your open tasks. Are you sure? (yes/no)",
            Self::ArchiveTasks => "This will archive your completed tasks. Are you sure? (yes/no)",
        }
    }
}

/// A dangerous action awaiting a yes/no answer, stored with the deadline it
/// was offered under. The session store entry itself is kept alive well past
/// that deadline (see [`approval_store_ttl`]) purely so a late "yes" can be
/// told the approval lapsed, instead of the entry just vanishing and looking
/// like one was never offered.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PendingApproval {
    action: DangerousAction,
    expires_at: DateTime<Utc>,
}

fn approval_store_ttl() -> std::time::Duration {
    SessionNamespace::Action.default_ttl() + std::time::Duration::from_secs(60 * 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfirmationToken {
    Yes,
    No,
}

fn parse_confirmation(text: &str) -> Option<ConfirmationToken> {
    match text.trim().to_lowercase().as_str() {
        "yes" | "y" | "confirm" => Some(ConfirmationToken::Yes),
        "no" | "n" | "cancel" => Some(ConfirmationToken::No),
        _ => None,
    }
}

/// A slash command is always routed straight to the dialog engine, even
/// while an approval is pending — it is priority 1 and preempts everything
/// else, including a yes/no gate already in flight.
fn is_slash_command(message: &str) -> bool {
    message
        .trim()
        .split_whitespace()
        .next()
        .map(|tok| tok.starts_with('/'))
        .unwrap_or(false)
}

/// Top-level per-message priority table: a slash command always preempts,
/// then a pending approval's yes/no answer, then a dangerous-action phrase
/// starting a new one, otherwise the message is handed off to
/// [`coordinator_dialog::DialogEngine`], whose own stage machine implements
/// the remaining "open conversation > classify-and-start" ordering.
pub async fn route_message(
    state: &AppState,
    transport: &str,
    transport_user: &str,
    message: &str,
) -> Result<Vec<String>, GatewayError> {
    if is_slash_command(message) {
        return dispatch_to_dialog(state, transport, transport_user, message).await;
    }

    if let Some(pending) = state
        .session_store
        .get(SessionNamespace::Action, transport_user)
        .await?
    {
        let approval: PendingApproval = serde_json::from_value(pending)
            .map_err(|e| GatewayError::BadRequest(format!("corrupt pending approval: {e}")))?;

        match parse_confirmation(message) {
            Some(ConfirmationToken::Yes) => {
                state
                    .session_store
                    .clear(SessionNamespace::Action, transport_user)
                    .await?;
                if Utc::now() > approval.expires_at {
                    return Ok(vec!["Approval expired, nothing done.".to_string()]);
                }
                return Ok(vec![execute_dangerous_action(state, approval.action)?]);
            }
            Some(ConfirmationToken::No) => {
                state
                    .session_store
                    .clear(SessionNamespace::Action, transport_user)
                    .await?;
                return Ok(vec!["Cancelled, nothing changed.".to_string()]);
            }
            None => {
                // Not a yes/no answer — leave the approval pending and treat
                // this as an ordinary message rather than discarding it.
            }
        }
    }

    if let Some(action) = DangerousAction::detect(message) {
        let approval = PendingApproval {
            action,
            expires_at: Utc::now() + chrono::Duration::from_std(SessionNamespace::Action.default_ttl())
                .unwrap_or_default(),
        };
        let payload = serde_json::to_value(&approval).unwrap_or(serde_json::Value::Null);
        state
            .session_store
            .set(SessionNamespace::Action, transport_user, payload, approval_store_ttl())
            .await?;
        return Ok(vec![action.confirmation_prompt().to_string()]);
    }

    dispatch_to_dialog(state, transport, transport_user, message).await
}

async fn dispatch_to_dialog(
    state: &AppState,
    transport: &str,
    transport_user: &str,
    message: &str,
) -> Result<Vec<String>, GatewayError> {
    let task_processor = state.task_processor();
    let engine = coordinator_dialog::DialogEngine {
        conversation_repo: &state.conversation_repo,
        session_store: &state.session_store,
        classifier: &state.classifier,
        task_processor: &task_processor,
    };
    let outcome = engine.handle(transport, transport_user, message).await?;
    Ok(outcome.replies)
}

fn execute_dangerous_action(state: &AppState, action: DangerousAction) -> Result<String, GatewayError> {
    match action {
        DangerousAction::ClearTasks => {
            let open = state.task_repo.list_not_completed(500, None)?;
            for task in &open {
                state.task_repo.update(
                    &task.id,
                    &TaskPatch {
                        soft_deleted: Some(true),
                        ..Default::default()
                    },
                )?;
                state.audit_repo.record(&AuditEvent {
                    entity_type: "task".to_string(),
                    entity_id: task.id.clone(),
                    actor: "boss".to_string(),
                    action: "cleared".to_string(),
                    before: Some(serde_json::json!({"status": task.status.to_string()})),
                    after: Some(serde_json::json!({"soft_deleted": true})),
                    timestamp: Utc::now(),
                })?;
                state.outbox_repo.enqueue(
                    "tabular_store",
                    &serde_json::json!({"op": "append_row", "sheet": "tasks_cleared", "row": {"task_id": task.id}}),
                    &format!("task-cleared:{}", task.id),
                    OUTBOX_DEFAULT_MAX_ATTEMPTS,
                )?;
            }
            Ok(format!("Cleared {} open task(s).", open.len()))
        }
        DangerousAction::ArchiveTasks => {
            let completed = state
                .task_repo
                .list_by_status(TaskStatus::Completed, 500, None)?;
            for task in &completed {
                state.task_repo.update(
                    &task.id,
                    &TaskPatch {
                        soft_deleted: Some(true),
                        ..Default::default()
                    },
                )?;
                state.audit_repo.record(&AuditEvent {
                    entity_type: "task".to_string(),
                    entity_id: task.id.clone(),
                    actor: "boss".to_string(),
                    action: "archived".to_string(),
                    before: Some(serde_json::json!({"soft_deleted": false})),
                    after: Some(serde_json::json!({"soft_deleted": true})),
                    timestamp: Utc::now(),
                })?;
                state.outbox_repo.enqueue(
                    "tabular_store",
                    &serde_json::json!({"op": "append_row", "sheet": "tasks_archived", "row": {"task_id": task.id}}),
                    &format!("task-archived:{}", task.id),
                    OUTBOX_DEFAULT_MAX_ATTEMPTS,
                )?;
            }
            Ok(format!("Archived {} completed task(s).", completed.len()))
        }
    }
}
