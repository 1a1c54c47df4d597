use std::collections::HashSet;

use chrono::Utc;
use coordinator_db::TaskRepo;

use crate::error::{Result, TasksError};
use crate::types::AssembledFields;

/// Non-fatal issues surfaced alongside a passing validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub warnings: Vec<String>,
}

pub fn validate_assembled(repo: &TaskRepo, fields: &AssembledFields) -> Result<ValidationOutcome> {
    if fields.title.trim().is_empty() {
        return Err(TasksError::Validation("title must not be empty".to_string()));
    }

    let mut warnings = Vec::new();
    if let Some(deadline) = fields.deadline {
        if deadline < Utc::now() {
            warnings.push(format!("deadline {deadline} is in the past"));
        }
    }

    for dep_id in &fields.blocked_by {
        if repo.get_by_id(dep_id)?.is_none() {
            return Err(TasksError::Validation(format!(
                "referenced task_id '{dep_id}' does not exist"
            )));
        }
    }

    Ok(ValidationOutcome { warnings })
}

/// Walks the `blocked_by` chain starting from each of `new_blocked_by`,
/// rejecting the edge set if any chain loops back to `task_id`.
pub fn validate_acyclic(repo: &TaskRepo, task_id: &str, new_blocked_by: &[String]) -> Result<()> {
    let mut visited = HashSet::new();
    let mut stack: Vec<String> = new_blocked_by.to_vec();

    while let Some(current) = stack.pop() {
        if current == task_id {
            return Err(TasksError::Validation(format!(
                "dependency graph would contain a cycle through '{task_id}'"
            )));
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        if let Some(task) = repo.get_by_id(&current)? {
            stack.extend(task.blocked_by);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordinator_db::pool::build_pool;

    fn fields_with_title(title: &str) -> AssembledFields {
        AssembledFields {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_title_is_rejected() {
        let pool = build_pool(":memory:").unwrap();
        let repo = TaskRepo::new(pool);
        let err = validate_assembled(&repo, &fields_with_title("")).unwrap_err();
        assert!(matches!(err, TasksError::Validation(_)));
    }

    #[test]
    fn past_deadline_is_a_warning_not_an_error() {
        let pool = build_pool(":memory:").unwrap();
        let repo = TaskRepo::new(pool);
        let mut fields = fields_with_title("ship the thing");
        fields.deadline = Some(Utc::now() - chrono::Duration::days(1));

        let outcome = validate_assembled(&repo, &fields).unwrap();
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn missing_dependency_reference_is_rejected() {
        let pool = build_pool(":memory:").unwrap();
        let repo = TaskRepo::new(pool);
        let mut fields = fields_with_title("ship the thing");
        fields.blocked_by = vec!["TASK-20260101-999".to_string()];

        let err = validate_assembled(&repo, &fields).unwrap_err();
        assert!(matches!(err, TasksError::Validation(_)));
    }
}
