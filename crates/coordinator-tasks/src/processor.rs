use chrono::Utc;
use coordinator_adapters::AdapterOp;
use coordinator_core::config::OUTBOX_DEFAULT_MAX_ATTEMPTS;
use coordinator_core::types::{TaskId, TaskRef, TaskStatus};
use coordinator_db::types::{AuditEvent, TaskPatch, TaskRecord, TeamRole};
use coordinator_db::{AuditRepo, OutboxRepo, TaskRepo, TeamRepo};
use tracing::instrument;

use crate::assignee::AssigneeResolver;
use crate::error::{Result, TasksError};
use crate::transitions::validate_transition;
use crate::types::{AssembledFields, AssigneeTier, ReviewInput, ReviewOutcome};
use crate::validate::{validate_acyclic, validate_assembled};

/// Maps an assignee's team role to the boss-facing routing channel a task
/// announcement is posted to.
fn routing_channel_for_role(role: TeamRole) -> &'static str {
    match role {
        TeamRole::Developer => "dev-tasks",
        TeamRole::Admin => "admin-tasks",
        TeamRole::Marketing => "marketing-tasks",
        TeamRole::Design => "design-tasks",
        TeamRole::Other => "general-tasks",
    }
}

/// Assembles, validates, persists, and enqueues side effects for a single
/// candidate task. Holds no conversational state of its own; callers own
/// the dialog and hand this a fully assembled set of fields.
pub struct TaskProcessor<'a> {
    pub task_repo: &'a TaskRepo,
    pub team_repo: &'a TeamRepo,
    pub audit_repo: &'a AuditRepo,
    pub outbox_repo: &'a OutboxRepo,
    pub assignee_resolver: AssigneeResolver<'a>,
}

impl<'a> TaskProcessor<'a> {
    #[instrument(skip(self, fields))]
    pub async fn assemble_and_persist(
        &self,
        fields: AssembledFields,
        created_by: &str,
    ) -> Result<TaskRecord> {
        let outcome = validate_assembled(self.task_repo, &fields)?;
        for warning in &outcome.warnings {
            tracing::warn!(warning, "task validation warning");
        }

        let resolution = match &fields.assignee_candidate {
            Some(candidate) => self.assignee_resolver.resolve(candidate).await,
            None => None,
        };

        let assignee_role = match &resolution {
            Some(r) if r.tier == AssigneeTier::RelationalStore => self
                .team_repo
                .get_by_name(&r.name)?
                .map(|m| m.role)
                .unwrap_or_default(),
            _ => TeamRole::default(),
        };

        let now = Utc::now();
        let task_id = TaskId::new().to_string();
        let seq = self.task_repo.next_sequence_for_date(now.date_naive())?;
        let task_ref = TaskRef::new(now.date_naive(), seq).to_string();

        let record = TaskRecord {
            id: task_id,
            task_ref,
            title: fields.title.clone(),
            description: fields.description.clone(),
            assignee_name: resolution.as_ref().map(|r| r.name.clone()),
            assignee_transport_id: resolution.as_ref().and_then(|r| r.transport_id.clone()),
            priority: fields.priority.unwrap_or_default(),
            status: TaskStatus::Pending,
            task_type: fields.task_type.clone(),
            deadline: fields.deadline,
            created_at: now,
            updated_at: now,
            created_by: created_by.to_string(),
            estimated_minutes: fields.estimated_minutes,
            actual_minutes: None,
            progress: 0,
            tags: fields.tags.clone(),
            acceptance_criteria: fields.acceptance_criteria.clone(),
            external_thread_id: fields.external_thread_id.clone(),
            soft_deleted: false,
            subtasks: Vec::new(),
            blocked_by: fields.blocked_by.clone(),
        };

        let persisted = self.task_repo.create(&record)?;
        for dep in &persisted.blocked_by {
            self.task_repo.add_dependency(&persisted.id, dep)?;
        }

        self.audit_repo.record(&AuditEvent {
            entity_type: "task".to_string(),
            entity_id: persisted.id.clone(),
            actor: created_by.to_string(),
            action: "created".to_string(),
            before: None,
            after: Some(serde_json::to_value(&persisted).map_err(|e| {
                TasksError::Validation(format!("failed to serialize task for audit: {e}"))
            })?),
            timestamp: now,
        })?;

        self.enqueue_creation_side_effects(&persisted, assignee_role)?;

        Ok(persisted)
    }

    fn enqueue_creation_side_effects(&self, task: &TaskRecord, role: TeamRole) -> Result<()> {
        let tabular_upsert = AdapterOp::AppendRow {
            sheet: "tasks".to_string(),
            row: serde_json::to_value(task).map_err(|e| {
                TasksError::Validation(format!("failed to serialize task row: {e}"))
            })?,
        };
        self.enqueue_op("tabular_store", &tabular_upsert, &format!("task-tabular-upsert:{}", task.id))?;

        let routing_post = AdapterOp::SendMessage {
            conversation_id: routing_channel_for_role(role).to_string(),
            text: format!(
                "New task {} assigned to {}: {}",
                task.task_ref,
                task.assignee_name.as_deref().unwrap_or("unassigned"),
                task.title
            ),
        };
        self.enqueue_op("transport", &routing_post, &format!("task-routing-post:{}", task.id))?;

        if let Some(deadline) = task.deadline {
            if let Some(email) = task
                .assignee_name
                .as_deref()
                .and_then(|name| self.team_repo.get_by_name(name).ok().flatten())
                .and_then(|member| member.email)
            {
                let calendar_entry = AdapterOp::CreateCalendarEvent {
                    attendee_email: email,
                    title: task.title.clone(),
                    starts_at: deadline,
                    duration_minutes: task.estimated_minutes.unwrap_or(60),
                };
                self.enqueue_op(
                    "calendar_mail",
                    &calendar_entry,
                    &format!("task-calendar-entry:{}", task.id),
                )?;
            }
        }

        if let Some(thread_id) = &task.external_thread_id {
            let ack = AdapterOp::SendMessage {
                conversation_id: thread_id.clone(),
                text: format!("Got it. Created {}.", task.task_ref),
            };
            self.enqueue_op("transport", &ack, &format!("task-ack:{}", task.id))?;
        }

        Ok(())
    }

    fn enqueue_op(&self, target_adapter: &str, op: &AdapterOp, idempotency_key: &str) -> Result<()> {
        let payload = serde_json::to_value(op)
            .map_err(|e| TasksError::Validation(format!("failed to serialize outbox payload: {e}")))?;
        self.outbox_repo
            .enqueue(target_adapter, &payload, idempotency_key, OUTBOX_DEFAULT_MAX_ATTEMPTS)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn transition_status(
        &self,
        task_id: &str,
        to: TaskStatus,
        actor: &str,
    ) -> Result<TaskRecord> {
        let current = self
            .task_repo
            .get_by_id(task_id)?
            .ok_or_else(|| TasksError::NotFound(task_id.to_string()))?;

        validate_transition(current.status, to)?;

        let mut patch = TaskPatch::default();
        patch.status = Some(to);
        let updated = self.task_repo.update(task_id, &patch)?;

        self.audit_repo.record(&AuditEvent {
            entity_type: "task".to_string(),
            entity_id: task_id.to_string(),
            actor: actor.to_string(),
            action: format!("status_changed:{}->{}", current.status, to),
            before: Some(serde_json::json!({"status": current.status.to_string()})),
            after: Some(serde_json::json!({"status": to.to_string()})),
            timestamp: Utc::now(),
        })?;

        Ok(updated)
    }

    /// Adds a dependency edge to an existing task, rejecting it if it would
    /// close a cycle.
    #[instrument(skip(self))]
    pub fn add_dependency(&self, task_id: &str, blocked_by_id: &str) -> Result<()> {
        if self.task_repo.get_by_id(blocked_by_id)?.is_none() {
            return Err(TasksError::Validation(format!(
                "referenced task_id '{blocked_by_id}' does not exist"
            )));
        }
        validate_acyclic(self.task_repo, task_id, &[blocked_by_id.to_string()])?;
        self.task_repo.add_dependency(task_id, blocked_by_id)?;
        Ok(())
    }

    /// Scores a submitted proof against the acceptance criteria and either
    /// routes the task to `completed` or bounces it back to
    /// `needs_revision` with suggestions attached.
    #[instrument(skip(self, input))]
    pub fn review_submission(
        &self,
        task_id: &str,
        input: &ReviewInput,
        actor: &str,
    ) -> Result<(TaskRecord, ReviewOutcome)> {
        let outcome = crate::types::score_submission(input, crate::types::REVIEW_PASS_THRESHOLD);
        let next_status = if outcome.passed {
            TaskStatus::Completed
        } else {
            TaskStatus::NeedsRevision
        };
        let updated = self.transition_status(task_id, next_status, actor)?;
        Ok((updated, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordinator_db::pool::build_pool;
    use coordinator_db::types::TeamMember;

    fn harness() -> (TaskRepo, TeamRepo, AuditRepo, OutboxRepo) {
        let pool = build_pool(":memory:").unwrap();
        (
            TaskRepo::new(pool.clone()),
            TeamRepo::new(pool.clone()),
            AuditRepo::new(pool.clone()),
            OutboxRepo::new(pool),
        )
    }

    #[tokio::test]
    async fn assemble_and_persist_creates_task_with_routing_and_ack_outbox_items() {
        let (task_repo, team_repo, audit_repo, outbox_repo) = harness();
        team_repo
            .upsert(&TeamMember {
                name: "John".to_string(),
                role: TeamRole::Developer,
                transport_id: Some("tg:123".to_string()),
                secondary_channel_id: None,
                email: None,
                timezone: "UTC".to_string(),
                work_start: None,
                active: true,
                skills: vec![],
            })
            .unwrap();

        let static_directory = crate::types::StaticAssigneeDirectory::default();
        let processor = TaskProcessor {
            task_repo: &task_repo,
            team_repo: &team_repo,
            audit_repo: &audit_repo,
            outbox_repo: &outbox_repo,
            assignee_resolver: AssigneeResolver {
                team_repo: &team_repo,
                tabular_store: None,
                static_directory: &static_directory,
            },
        };

        let fields = AssembledFields {
            title: "fix the login bug".to_string(),
            assignee_candidate: Some("John".to_string()),
            external_thread_id: Some("conv-1".to_string()),
            ..Default::default()
        };

        let task = processor.assemble_and_persist(fields, "boss").await.unwrap();
        assert_eq!(task.assignee_name.as_deref(), Some("John"));
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.task_ref.starts_with("TASK-"));

        let history = audit_repo.history_for("task", &task.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, "created");
    }

    #[tokio::test]
    async fn review_submission_below_threshold_routes_to_needs_revision() {
        let (task_repo, team_repo, audit_repo, outbox_repo) = harness();
        let static_directory = crate::types::StaticAssigneeDirectory::default();
        let processor = TaskProcessor {
            task_repo: &task_repo,
            team_repo: &team_repo,
            audit_repo: &audit_repo,
            outbox_repo: &outbox_repo,
            assignee_resolver: AssigneeResolver {
                team_repo: &team_repo,
                tabular_store: None,
                static_directory: &static_directory,
            },
        };

        let task = processor
            .assemble_and_persist(
                AssembledFields {
                    title: "ship the thing".to_string(),
                    ..Default::default()
                },
                "boss",
            )
            .await
            .unwrap();

        processor
            .transition_status(&task.id, TaskStatus::InProgress, "John")
            .unwrap();
        processor
            .transition_status(&task.id, TaskStatus::InReview, "John")
            .unwrap();
        processor
            .transition_status(&task.id, TaskStatus::AwaitingValidation, "John")
            .unwrap();

        let input = ReviewInput {
            has_proof: false,
            proof_quality: 10.0,
            notes_completeness: 20.0,
            criteria_coverage: 10.0,
            communication: 30.0,
        };
        let (updated, outcome) = processor.review_submission(&task.id, &input, "boss").unwrap();
        assert!(!outcome.passed);
        assert_eq!(updated.status, TaskStatus::NeedsRevision);
    }
}
