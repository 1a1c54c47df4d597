use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use coordinator_core::types::{TaskId, TaskRef, TaskStatus};
use coordinator_db::types::{AuditEvent, TaskPatch, TaskRecord};
use coordinator_db::{AuditRepo, OutboxRepo, ReminderLedgerRepo, RecurringTaskRepo, TaskRepo};
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::engine::SchedulerHandle;
use crate::schedule::compute_next_run;
use crate::types::{Job, Schedule};

/// Completed tasks older than this are swept off the active board by
/// `archive_old_completed`.
const ARCHIVE_AFTER_DAYS: i64 = 30;

/// The nine named jobs from the scheduler's job table. The `action` string
/// stored on each persisted [`Job`] is one of these, serialized via
/// `JobKind::as_action`/`JobKind::from_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    DailyStandup,
    EodReminder,
    WeeklyReport,
    MonthlyReport,
    DeadlineReminder,
    OverdueAlert,
    RecurringTaskExpansion,
    ArchiveOldCompleted,
    MessageQueueDrain,
}

impl JobKind {
    pub fn as_action(&self) -> &'static str {
        match self {
            JobKind::DailyStandup => "daily_standup",
            JobKind::EodReminder => "eod_reminder",
            JobKind::WeeklyReport => "weekly_report",
            JobKind::MonthlyReport => "monthly_report",
            JobKind::DeadlineReminder => "deadline_reminder",
            JobKind::OverdueAlert => "overdue_alert",
            JobKind::RecurringTaskExpansion => "recurring_task_expansion",
            JobKind::ArchiveOldCompleted => "archive_old_completed",
            JobKind::MessageQueueDrain => "message_queue_drain",
        }
    }

    pub fn from_action(action: &str) -> Option<Self> {
        Some(match action {
            "daily_standup" => JobKind::DailyStandup,
            "eod_reminder" => JobKind::EodReminder,
            "weekly_report" => JobKind::WeeklyReport,
            "monthly_report" => JobKind::MonthlyReport,
            "deadline_reminder" => JobKind::DeadlineReminder,
            "overdue_alert" => JobKind::OverdueAlert,
            "recurring_task_expansion" => JobKind::RecurringTaskExpansion,
            "archive_old_completed" => JobKind::ArchiveOldCompleted,
            "message_queue_drain" => JobKind::MessageQueueDrain,
            _ => return None,
        })
    }

    /// Whether a failure in this job should alert the boss.
    pub fn alerts_on_failure(&self) -> bool {
        !matches!(self, JobKind::MessageQueueDrain)
    }
}

/// Register the nine standing jobs if they are not already present.
///
/// `local_morning`/`local_evening` are converted from the team's configured
/// timezone into the UTC hour/minute the generic `Schedule::Daily`/`Weekly`
/// variants require; this is a one-time approximation computed at startup
/// and does not track DST transitions intra-day.
pub fn seed_jobs(handle: &SchedulerHandle, tz: Tz) -> crate::error::Result<()> {
    let existing: std::collections::HashSet<String> =
        handle.list_jobs()?.into_iter().map(|j| j.action).collect();

    let mut ensure = |kind: JobKind, schedule: Schedule| -> crate::error::Result<()> {
        if existing.contains(kind.as_action()) {
            return Ok(());
        }
        handle.add_job(kind.as_action(), schedule, kind.as_action())?;
        Ok(())
    };

    ensure(JobKind::DailyStandup, daily_in_tz(tz, 9, 0))?;
    ensure(JobKind::EodReminder, daily_in_tz(tz, 18, 0))?;
    ensure(JobKind::WeeklyReport, weekly_in_tz(tz, 0, 9, 0))?;
    ensure(JobKind::MonthlyReport, Schedule::Daily { hour: 6, minute: 0 })?;
    ensure(JobKind::DeadlineReminder, Schedule::Interval { every_secs: 15 * 60 })?;
    ensure(JobKind::OverdueAlert, Schedule::Interval { every_secs: 12 * 60 * 60 })?;
    ensure(JobKind::RecurringTaskExpansion, Schedule::Interval { every_secs: 5 * 60 })?;
    ensure(JobKind::ArchiveOldCompleted, weekly_in_tz(tz, 0, 3, 0))?;
    ensure(JobKind::MessageQueueDrain, Schedule::Interval { every_secs: 15 })?;

    Ok(())
}

fn daily_in_tz(tz: Tz, local_hour: u32, local_minute: u32) -> Schedule {
    let today_local = Utc::now().with_timezone(&tz).date_naive();
    let local_dt = tz
        .from_local_datetime(&today_local.and_hms_opt(local_hour, local_minute, 0).unwrap())
        .single();
    let utc_dt = local_dt.map(|d| d.with_timezone(&Utc));
    match utc_dt {
        Some(d) => Schedule::Daily {
            hour: d.format("%H").to_string().parse().unwrap_or(local_hour as u8),
            minute: d.format("%M").to_string().parse().unwrap_or(local_minute as u8),
        },
        None => Schedule::Daily {
            hour: local_hour as u8,
            minute: local_minute as u8,
        },
    }
}

fn weekly_in_tz(tz: Tz, day: u8, local_hour: u32, local_minute: u32) -> Schedule {
    match daily_in_tz(tz, local_hour, local_minute) {
        Schedule::Daily { hour, minute } => Schedule::Weekly { day, hour, minute },
        other => other,
    }
}

/// Drives fired [`Job`]s to their handler: every job body returns a
/// `Result`, failures are logged with the job name, and (for every job but
/// message-queue-drain) a boss alert is enqueued before the error is
/// allowed to surface as a `failed` job status.
pub struct JobRunner {
    pub task_repo: TaskRepo,
    pub reminder_ledger: ReminderLedgerRepo,
    pub recurring_repo: RecurringTaskRepo,
    pub audit_repo: AuditRepo,
    pub outbox: OutboxRepo,
    pub boss_conversation_id: String,
}

impl JobRunner {
    pub async fn run(self, mut fired: mpsc::Receiver<Job>) {
        while let Some(job) = fired.recv().await {
            let Some(kind) = JobKind::from_action(&job.action) else {
                error!(action = %job.action, "unknown job action fired");
                continue;
            };
            if let Err(e) = self.dispatch(kind).await {
                error!(job = %kind.as_action(), error = %e, "scheduled job failed");
                if kind.alerts_on_failure() {
                    self.alert_boss(&format!("job '{}' failed: {}", kind.as_action(), e));
                }
            }
        }
    }

    async fn dispatch(&self, kind: JobKind) -> anyhow::Result<()> {
        match kind {
            JobKind::DeadlineReminder => self.run_deadline_reminder(),
            JobKind::OverdueAlert => self.run_overdue_alert(),
            JobKind::RecurringTaskExpansion => self.run_recurring_expansion(),
            JobKind::ArchiveOldCompleted => self.run_archive_old_completed(),
            JobKind::MessageQueueDrain => self.run_message_queue_drain(),
            JobKind::DailyStandup => self.run_digest("daily standup"),
            JobKind::EodReminder => self.run_digest("end-of-day reminder"),
            JobKind::WeeklyReport => self.run_digest("weekly report"),
            JobKind::MonthlyReport => self.run_digest("monthly report"),
        }
    }

    /// Walks tasks due within 2h/1h/30m, skips buckets already present in
    /// the ledger, sends + records atomically per match.
    fn run_deadline_reminder(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        let buckets = [("2h", 120i64), ("1h", 60), ("30m", 30)];
        for (bucket, minutes) in buckets {
            let due = self.task_repo.list_due_soon(chrono::Duration::minutes(minutes), now)?;
            for task in due {
                if self.reminder_ledger.already_sent(&task.id, bucket)? {
                    continue;
                }
                let text = format!(
                    "reminder: {} is due in {} (deadline {})",
                    task.task_ref,
                    bucket,
                    task.deadline.map(|d| d.to_rfc3339()).unwrap_or_default()
                );
                let conversation_id = task
                    .assignee_transport_id
                    .clone()
                    .unwrap_or_else(|| self.boss_conversation_id.clone());
                self.enqueue_message(&conversation_id, &text)?;
                self.reminder_ledger.record_sent(&task.id, bucket)?;
            }
        }
        Ok(())
    }

    fn run_overdue_alert(&self) -> anyhow::Result<()> {
        let overdue = self.task_repo.list_overdue(Utc::now())?;
        if overdue.is_empty() {
            return Ok(());
        }
        let summary = overdue
            .iter()
            .map(|t| t.task_ref.clone())
            .collect::<Vec<_>>()
            .join(", ");
        self.enqueue_message(&self.boss_conversation_id, &format!("overdue tasks: {summary}"))
    }

    /// For every active recurring template whose `schedule_json` (a
    /// serialized [`Schedule`]) says it's due, creates one concrete task
    /// from `title_template` and stamps `last_created_at`. A template with
    /// no prior run is measured from the Unix epoch, so it expands on the
    /// very first tick it's seen on.
    fn run_recurring_expansion(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        let active = self.recurring_repo.list_active()?;
        for template in active {
            let schedule: Schedule = match serde_json::from_str(&template.schedule_json) {
                Ok(s) => s,
                Err(e) => {
                    warn!(recurring_task_id = %template.id, error = %e, "unparseable schedule_json, skipping");
                    continue;
                }
            };
            let from = template
                .last_created_at
                .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap());
            let due = compute_next_run(&schedule, from).is_some_and(|next| next <= now);
            if !due {
                continue;
            }

            let seq = self.task_repo.next_sequence_for_date(now.date_naive())?;
            let task_ref = TaskRef::new(now.date_naive(), seq).to_string();
            let record = TaskRecord {
                id: TaskId::new().to_string(),
                task_ref,
                title: template.title_template.clone(),
                description: None,
                assignee_name: template.assignee_name.clone(),
                assignee_transport_id: None,
                priority: template.priority,
                status: TaskStatus::Pending,
                task_type: None,
                deadline: None,
                created_at: now,
                updated_at: now,
                created_by: "recurring-task-scheduler".to_string(),
                estimated_minutes: None,
                actual_minutes: None,
                progress: 0,
                tags: Vec::new(),
                acceptance_criteria: Vec::new(),
                external_thread_id: None,
                soft_deleted: false,
                subtasks: Vec::new(),
                blocked_by: Vec::new(),
            };
            let persisted = self.task_repo.create(&record)?;
            self.audit_repo.record(&AuditEvent {
                entity_type: "task".to_string(),
                entity_id: persisted.id.clone(),
                actor: "recurring-task-scheduler".to_string(),
                action: "created_from_recurring".to_string(),
                before: None,
                after: Some(serde_json::json!({"recurring_task_id": template.id})),
                timestamp: now,
            })?;
            self.recurring_repo.mark_created(&template.id)?;
        }
        Ok(())
    }

    /// Soft-deletes completed tasks past the retention window so they drop
    /// off the active board, recording one audit event per task archived.
    fn run_archive_old_completed(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::days(ARCHIVE_AFTER_DAYS);
        let completed = self.task_repo.list_by_status(TaskStatus::Completed, 500, None)?;
        let mut archived = 0u32;
        for task in completed {
            if task.updated_at > cutoff {
                continue;
            }
            self.task_repo.update(
                &task.id,
                &TaskPatch {
                    soft_deleted: Some(true),
                    ..Default::default()
                },
            )?;
            self.audit_repo.record(&AuditEvent {
                entity_type: "task".to_string(),
                entity_id: task.id.clone(),
                actor: "archive-old-completed-job".to_string(),
                action: "archived".to_string(),
                before: Some(serde_json::json!({"soft_deleted": false})),
                after: Some(serde_json::json!({"soft_deleted": true})),
                timestamp: now,
            })?;
            archived += 1;
        }
        if archived > 0 {
            self.enqueue_message(
                &self.boss_conversation_id,
                &format!("archived {archived} completed task(s) older than {ARCHIVE_AFTER_DAYS} days"),
            )?;
        }
        Ok(())
    }

    fn run_message_queue_drain(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn run_digest(&self, label: &str) -> anyhow::Result<()> {
        self.enqueue_message(&self.boss_conversation_id, &format!("{label} is due — generation pending downstream report builder"))
    }

    fn enqueue_message(&self, conversation_id: &str, text: &str) -> anyhow::Result<()> {
        let payload = serde_json::json!({
            "op": "send_message",
            "conversation_id": conversation_id,
            "text": text,
        });
        let idempotency_key = format!("job:{}:{}", conversation_id, text);
        self.outbox
            .enqueue("transport", &payload, &idempotency_key, coordinator_core::config::OUTBOX_DEFAULT_MAX_ATTEMPTS)?;
        Ok(())
    }

    fn alert_boss(&self, text: &str) {
        let _ = self.enqueue_message(&self.boss_conversation_id, text);
    }
}
