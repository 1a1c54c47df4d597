use std::time::Duration;

use coordinator_classify::{route, Intent, IntentClassifier, RoutingDecision};
use coordinator_core::types::{Priority, SessionNamespace};
use coordinator_db::ConversationRepo;
use coordinator_sessions::SessionStore;
use coordinator_tasks::{AssembledFields, TaskProcessor};
use tracing::instrument;

use crate::batch::try_split;
use crate::complexity::{depth_for_score, score_message, ClarificationDepth};
use crate::error::Result;
use crate::types::{ConversationState, DialogOutcome, DialogScratch};

const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Per-user dialog graph. Owns no state itself — state lives in
/// `ConversationRepo` (durable `stage`) and `SessionStore` (scratch, TTL'd).
pub struct DialogEngine<'a> {
    pub conversation_repo: &'a ConversationRepo,
    pub session_store: &'a SessionStore,
    pub classifier: &'a IntentClassifier,
    pub task_processor: &'a TaskProcessor<'a>,
}

impl<'a> DialogEngine<'a> {
    #[instrument(skip(self, message))]
    pub async fn handle(
        &self,
        transport: &str,
        transport_user: &str,
        message: &str,
    ) -> Result<DialogOutcome> {
        let conv = self.conversation_repo.get_or_create(transport, transport_user)?;
        self.conversation_repo.append_message(&conv.id, "user", message)?;

        let stale = chrono::Utc::now() - conv.updated_at
            > chrono::Duration::from_std(INACTIVITY_TIMEOUT).unwrap_or_default();
        let mut state = if stale {
            ConversationState::Idle
        } else {
            conv.state.parse().unwrap_or(ConversationState::Idle)
        };

        let trimmed = message.trim();
        let lower = trimmed.to_lowercase();

        if lower == "cancel" || lower == "/cancel" {
            self.clear_scratch(&conv.id).await?;
            return self.finish(&conv.id, ConversationState::Idle, "Cancelled.").await;
        }

        if lower.starts_with("/task") || lower.starts_with("/urgent") {
            self.clear_scratch(&conv.id).await?;
            state = ConversationState::Idle;
        }

        let outcome = match state {
            ConversationState::Idle => self.handle_idle(&conv.id, trimmed).await?,
            ConversationState::Creating | ConversationState::Clarifying => {
                self.handle_clarifying(&conv.id, trimmed).await?
            }
            ConversationState::Preview => self.handle_preview(&conv.id, trimmed).await?,
            ConversationState::BatchProcessing => self.handle_batch(&conv.id, trimmed).await?,
            ConversationState::AwaitingValidation => {
                self.handle_awaiting_validation(&conv.id, trimmed).await?
            }
            ConversationState::SubmittingProof
            | ConversationState::AddingNotes
            | ConversationState::AwaitingConfirm
            | ConversationState::SpecDetail
            | ConversationState::Modifying
            | ConversationState::Closed => DialogOutcome::reply(
                ConversationState::Idle,
                "Let's start over — what would you like to do?",
            ),
        };

        self.finish_outcome(&conv.id, outcome).await
    }

    async fn handle_idle(&self, conversation_id: &str, message: &str) -> Result<DialogOutcome> {
        let snapshot = self.context_snapshot(conversation_id)?;
        let result = self.classifier.classify(message, &snapshot).await?;
        let decision = route(result.confidence, false);

        if result.intent != Intent::CreateTask {
            return Ok(self.reply_for_non_creation_intent(result.intent));
        }

        if decision == RoutingDecision::AskClarifyingQuestion {
            return Ok(DialogOutcome::reply(
                ConversationState::Idle,
                "I didn't quite catch that. Could you rephrase what task you'd like created?",
            ));
        }

        if let Some(split) = try_split(message) {
            return self.start_batch(conversation_id, split).await;
        }

        let mut scratch = DialogScratch::default();
        seed_scratch_from_fields(&mut scratch, &result.extracted_fields);
        scratch.title.get_or_insert_with(|| message.to_string());
        scratch.complexity_score = Some(score_message(message));

        self.advance_creation(conversation_id, scratch).await
    }

    async fn handle_clarifying(&self, conversation_id: &str, message: &str) -> Result<DialogOutcome> {
        let mut scratch = self.load_scratch(conversation_id).await?;

        if let Some(question) = scratch.pending_question.take() {
            apply_answer(&mut scratch, &question, message);
        }

        self.advance_creation(conversation_id, scratch).await
    }

    /// Resolves the next unanswered mandatory field via the self-answering
    /// loop, or moves to `preview` once everything needed is known.
    async fn advance_creation(
        &self,
        conversation_id: &str,
        mut scratch: DialogScratch,
    ) -> Result<DialogOutcome> {
        let depth = depth_for_score(scratch.complexity_score.unwrap_or(5));

        if scratch.priority.is_none() {
            scratch.priority = Some("medium".to_string());
        }
        if scratch.estimated_minutes.is_none() {
            scratch.estimated_minutes = Some(coordinator_tasks::role_default_minutes(""));
        }

        if depth != ClarificationDepth::SkipAll && scratch.assignee_candidate.is_none() {
            scratch.pending_question = Some("assignee".to_string());
            self.save_scratch(conversation_id, &scratch).await?;
            return Ok(DialogOutcome::reply(
                ConversationState::Clarifying,
                "Who should this be assigned to?",
            ));
        }

        if depth == ClarificationDepth::FullClarification && scratch.deadline.is_none() {
            scratch.pending_question = Some("deadline".to_string());
            self.save_scratch(conversation_id, &scratch).await?;
            return Ok(DialogOutcome::reply(
                ConversationState::Clarifying,
                "Does this have a deadline?",
            ));
        }

        let preview_text = render_preview(&scratch);
        self.save_scratch(conversation_id, &scratch).await?;
        Ok(DialogOutcome::reply(ConversationState::Preview, preview_text))
    }

    async fn handle_preview(&self, conversation_id: &str, message: &str) -> Result<DialogOutcome> {
        let lower = message.to_lowercase();
        if is_affirmation(&lower) {
            let scratch = self.load_scratch(conversation_id).await?;
            return self.finalize_task(conversation_id, scratch).await;
        }
        if is_negation(&lower) {
            let mut scratch = self.load_scratch(conversation_id).await?;
            scratch.pending_question = Some("correction".to_string());
            self.save_scratch(conversation_id, &scratch).await?;
            return Ok(DialogOutcome::reply(
                ConversationState::Clarifying,
                "What should I change?",
            ));
        }
        Ok(DialogOutcome::reply(
            ConversationState::Preview,
            "Reply 'yes' to confirm or 'no' to change something.",
        ))
    }

    async fn handle_batch(&self, conversation_id: &str, message: &str) -> Result<DialogOutcome> {
        let lower = message.to_lowercase();
        let mut scratch = self.load_scratch(conversation_id).await?;

        if is_negation(&lower) && lower.contains("all") {
            self.clear_scratch(conversation_id).await?;
            return Ok(DialogOutcome::reply(ConversationState::Idle, "Batch cancelled."));
        }

        if is_affirmation(&lower) || lower == "skip" {
            if is_affirmation(&lower) {
                let single = DialogScratch {
                    title: scratch.title.clone(),
                    assignee_candidate: scratch.batch_shared_assignee.clone(),
                    priority: Some("medium".to_string()),
                    ..Default::default()
                };
                self.finalize_task(conversation_id, single).await?;
            }

            match scratch.batch_remaining.pop() {
                Some(next) => {
                    scratch.title = Some(next.title.clone());
                    self.save_scratch(conversation_id, &scratch).await?;
                    Ok(DialogOutcome::reply(
                        ConversationState::BatchProcessing,
                        format!("Next: {} — confirm? (yes/skip/cancel all)", next.title),
                    ))
                }
                None => {
                    self.clear_scratch(conversation_id).await?;
                    Ok(DialogOutcome::reply(ConversationState::Idle, "All done with the batch."))
                }
            }
        } else {
            Ok(DialogOutcome::reply(
                ConversationState::BatchProcessing,
                "Reply 'yes', 'skip', or 'cancel all'.",
            ))
        }
    }

    async fn handle_awaiting_validation(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<DialogOutcome> {
        let scratch = self.load_scratch(conversation_id).await?;
        let Some(task_id) = scratch.pending_question.clone() else {
            self.clear_scratch(conversation_id).await?;
            return Ok(DialogOutcome::reply(ConversationState::Idle, "Nothing pending review."));
        };

        let input = coordinator_tasks::ReviewInput {
            has_proof: !message.trim().is_empty(),
            proof_quality: if message.len() > 20 { 80.0 } else { 40.0 },
            notes_completeness: 70.0,
            criteria_coverage: 70.0,
            communication: 70.0,
        };
        let (updated, outcome) = self
            .task_processor
            .review_submission(&task_id, &input, conversation_id)?;

        self.clear_scratch(conversation_id).await?;
        let text = if outcome.passed {
            format!("{} marked completed.", updated.task_ref)
        } else {
            format!(
                "{} needs revision: {}",
                updated.task_ref,
                outcome.suggestions.join("; ")
            )
        };
        Ok(DialogOutcome::reply(ConversationState::Idle, text))
    }

    async fn start_batch(&self, conversation_id: &str, split: crate::batch::BatchSplit) -> Result<DialogOutcome> {
        let mut titles = split.task_titles;
        titles.reverse();
        let first = titles.pop();
        let mut scratch = DialogScratch {
            batch_shared_assignee: split.shared_assignee,
            batch_remaining: titles
                .into_iter()
                .map(|title| crate::types::BatchCandidate { title })
                .collect(),
            title: first.clone(),
            ..Default::default()
        };

        let Some(first_title) = first else {
            return Ok(DialogOutcome::reply(ConversationState::Idle, "No tasks found in that message."));
        };

        if split.skip_confirmation {
            let single = DialogScratch {
                title: Some(first_title.clone()),
                assignee_candidate: scratch.batch_shared_assignee.clone(),
                priority: Some("medium".to_string()),
                ..Default::default()
            };
            self.finalize_task(conversation_id, single).await?;
            return match scratch.batch_remaining.pop() {
                Some(next) => {
                    scratch.title = Some(next.title.clone());
                    self.save_scratch(conversation_id, &scratch).await?;
                    Ok(DialogOutcome::reply(
                        ConversationState::BatchProcessing,
                        format!("Created. Next: {} — confirm? (yes/skip/cancel all)", next.title),
                    ))
                }
                None => {
                    self.clear_scratch(conversation_id).await?;
                    Ok(DialogOutcome::reply(ConversationState::Idle, "All done with the batch."))
                }
            };
        }

        self.save_scratch(conversation_id, &scratch).await?;
        Ok(DialogOutcome::reply(
            ConversationState::BatchProcessing,
            format!("First: {first_title} — confirm? (yes/skip/cancel all)"),
        ))
    }

    async fn finalize_task(
        &self,
        conversation_id: &str,
        scratch: DialogScratch,
    ) -> Result<DialogOutcome> {
        let fields = AssembledFields {
            title: scratch.title.clone().unwrap_or_default(),
            description: scratch.description.clone(),
            assignee_candidate: scratch.assignee_candidate.clone(),
            priority: scratch.priority.as_deref().and_then(parse_priority),
            deadline: scratch.deadline.as_deref().and_then(parse_deadline),
            task_type: None,
            estimated_minutes: scratch.estimated_minutes,
            tags: scratch.tags.clone(),
            acceptance_criteria: scratch.acceptance_criteria.clone(),
            blocked_by: Vec::new(),
            external_thread_id: Some(conversation_id.to_string()),
        };

        let persisted = self.task_processor.assemble_and_persist(fields, conversation_id).await?;
        self.clear_scratch(conversation_id).await?;

        Ok(DialogOutcome {
            next_state: ConversationState::Idle,
            replies: vec![format!("Created {}.", persisted.task_ref)],
            task_persisted: Some(persisted),
        })
    }

    fn reply_for_non_creation_intent(&self, intent: Intent) -> DialogOutcome {
        let text = match intent {
            Intent::Help => "I can create tasks, check status, and process approvals. Try '/task <description>'.".to_string(),
            Intent::Greeting => "Hey — what do you need?".to_string(),
            other => format!("Got it ({}). That flow isn't handled by this turn yet.", other.as_str()),
        };
        DialogOutcome::reply(ConversationState::Idle, text)
    }

    async fn load_scratch(&self, conversation_id: &str) -> Result<DialogScratch> {
        let payload = self
            .session_store
            .get(SessionNamespace::Spec, conversation_id)
            .await?;
        Ok(match payload {
            Some(v) => serde_json::from_value(v).unwrap_or_default(),
            None => DialogScratch::default(),
        })
    }

    async fn save_scratch(&self, conversation_id: &str, scratch: &DialogScratch) -> Result<()> {
        let payload = serde_json::to_value(scratch).unwrap_or(serde_json::Value::Null);
        self.session_store
            .set_default_ttl(SessionNamespace::Spec, conversation_id, payload)
            .await?;
        Ok(())
    }

    async fn clear_scratch(&self, conversation_id: &str) -> Result<()> {
        self.session_store.clear(SessionNamespace::Spec, conversation_id).await?;
        Ok(())
    }

    fn context_snapshot(&self, conversation_id: &str) -> Result<String> {
        let recent = self.conversation_repo.recent_messages(conversation_id, 5)?;
        Ok(recent
            .into_iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn finish(&self, conversation_id: &str, state: ConversationState, reply: &str) -> Result<DialogOutcome> {
        self.finish_outcome(conversation_id, DialogOutcome::reply(state, reply)).await
    }

    async fn finish_outcome(&self, conversation_id: &str, outcome: DialogOutcome) -> Result<DialogOutcome> {
        self.conversation_repo.set_state(conversation_id, &outcome.next_state.to_string())?;
        for reply in &outcome.replies {
            self.conversation_repo.append_message(conversation_id, "bot", reply)?;
        }
        Ok(outcome)
    }
}

fn seed_scratch_from_fields(scratch: &mut DialogScratch, fields: &std::collections::HashMap<String, String>) {
    if let Some(assignee) = fields.get("assignee") {
        scratch.assignee_candidate = Some(assignee.clone());
    }
    if let Some(title) = fields.get("title_hint").or_else(|| fields.get("title")) {
        scratch.title = Some(title.clone());
    }
    if let Some(priority) = fields.get("priority") {
        scratch.priority = Some(priority.clone());
    }
    if let Some(deadline) = fields.get("deadline") {
        scratch.deadline = Some(deadline.clone());
    }
}

fn apply_answer(scratch: &mut DialogScratch, question: &str, answer: &str) {
    match question {
        "assignee" => scratch.assignee_candidate = Some(answer.trim().to_string()),
        "deadline" => scratch.deadline = Some(answer.trim().to_string()),
        "correction" => scratch.title = Some(answer.trim().to_string()),
        _ => {}
    }
}

fn parse_priority(s: &str) -> Option<Priority> {
    match s.to_lowercase().as_str() {
        "urgent" => Some(Priority::Urgent),
        "high" => Some(Priority::High),
        "medium" => Some(Priority::Medium),
        "low" => Some(Priority::Low),
        _ => None,
    }
}

fn parse_deadline(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

fn render_preview(scratch: &DialogScratch) -> String {
    format!(
        "Preview: \"{}\" for {} (priority {}). Confirm? (yes/no)",
        scratch.title.as_deref().unwrap_or(""),
        scratch.assignee_candidate.as_deref().unwrap_or("unassigned"),
        scratch.priority.as_deref().unwrap_or("medium"),
    )
}

fn is_affirmation(lower: &str) -> bool {
    matches!(lower, "yes" | "y" | "yep" | "yeah" | "confirm")
}

fn is_negation(lower: &str) -> bool {
    matches!(lower, "no" | "n" | "nope" | "cancel that")
}
