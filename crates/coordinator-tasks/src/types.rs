use std::collections::HashMap;

use chrono::{DateTime, Utc};
use coordinator_core::types::Priority;

/// Fields merged from extracted LLM fields, session scratch, role defaults,
/// and recognized preferences, prior to assembly.
#[derive(Debug, Clone, Default)]
pub struct AssembledFields {
    pub title: String,
    pub description: Option<String>,
    pub assignee_candidate: Option<String>,
    pub priority: Option<Priority>,
    pub deadline: Option<DateTime<Utc>>,
    pub task_type: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub tags: Vec<String>,
    pub acceptance_criteria: Vec<String>,
    pub blocked_by: Vec<String>,
    pub external_thread_id: Option<String>,
}

/// Which tier resolved the assignee lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssigneeTier {
    RelationalStore,
    TabularStore,
    StaticConfig,
}

#[derive(Debug, Clone)]
pub struct AssigneeResolution {
    pub name: String,
    pub transport_id: Option<String>,
    pub tier: AssigneeTier,
}

/// Weighted auto-review score over a proof submission.
#[derive(Debug, Clone)]
pub struct ReviewInput {
    pub has_proof: bool,
    pub proof_quality: f64,
    pub notes_completeness: f64,
    pub criteria_coverage: f64,
    pub communication: f64,
}

#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub score: f64,
    pub passed: bool,
    pub suggestions: Vec<String>,
}

pub const REVIEW_PASS_THRESHOLD: f64 = 70.0;

pub fn score_submission(input: &ReviewInput, threshold: f64) -> ReviewOutcome {
    let score = input.proof_quality * 0.40
        + input.notes_completeness * 0.30
        + input.criteria_coverage * 0.20
        + input.communication * 0.10;

    let mut suggestions = Vec::new();
    if !input.has_proof {
        suggestions.push("attach proof of completion (screenshot, link, or output)".to_string());
    }
    if input.notes_completeness < 60.0 {
        suggestions.push("add more detail to your completion notes".to_string());
    }
    if input.criteria_coverage < 60.0 {
        suggestions.push("address each acceptance criterion explicitly".to_string());
    }
    if input.communication < 60.0 {
        suggestions.push("clarify any blockers or deviations from the original ask".to_string());
    }

    ReviewOutcome {
        score,
        passed: score >= threshold,
        suggestions,
    }
}

/// Assignee-role-default estimated durations.
pub fn role_default_minutes(role: &str) -> i64 {
    match role {
        "developer" => 240,
        "admin" => 120,
        "marketing" => 180,
        "design" => 360,
        _ => 120,
    }
}

pub type StaticAssigneeDirectory = HashMap<String, String>;
