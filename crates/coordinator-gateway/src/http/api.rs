//! Task CRUD — `GET /api/tasks`, `GET|PUT|POST|DELETE /api/tasks/:task_id`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use coordinator_core::types::{Priority, TaskStatus};
use coordinator_db::types::TaskPatch;
use coordinator_tasks::AssembledFields;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::GatewayError;

#[derive(Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<String>,
    pub assignee: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Value>, GatewayError> {
    let tasks = if let Some(assignee) = &query.assignee {
        state.task_repo.list_by_assignee(assignee, query.limit, None)?
    } else if let Some(status) = &query.status {
        let status: TaskStatus = status
            .parse()
            .map_err(|_| GatewayError::BadRequest(format!("unknown status '{status}'")))?;
        state.task_repo.list_by_status(status, query.limit, None)?
    } else {
        state
            .task_repo
            .list_by_status(TaskStatus::Pending, query.limit, None)?
    };

    Ok(Json(json!({ "tasks": tasks })))
}

#[derive(Deserialize)]
pub struct CreateTaskBody {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_candidate: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub deadline: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default = "default_created_by")]
    pub created_by: String,
}

fn default_created_by() -> String {
    "api".to_string()
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTaskBody>,
) -> Result<Json<Value>, GatewayError> {
    if body.title.trim().is_empty() {
        return Err(GatewayError::BadRequest("title must not be empty".into()));
    }

    let priority = match &body.priority {
        Some(p) => Some(
            p.parse::<Priority>()
                .map_err(|_| GatewayError::BadRequest(format!("unknown priority '{p}'")))?,
        ),
        None => None,
    };

    let fields = AssembledFields {
        title: body.title,
        description: body.description,
        assignee_candidate: body.assignee_candidate,
        priority,
        deadline: body.deadline,
        task_type: None,
        estimated_minutes: body.estimated_minutes,
        tags: body.tags,
        acceptance_criteria: body.acceptance_criteria,
        blocked_by: Vec::new(),
        external_thread_id: None,
    };

    let processor = state.task_processor();
    let task = processor.assemble_and_persist(fields, &body.created_by).await?;
    Ok(Json(json!({ "task": task })))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    let task = state
        .task_repo
        .get_by_id(&task_id)?
        .ok_or_else(|| GatewayError::NotFound(format!("task {task_id}")))?;
    Ok(Json(json!({ "task": task })))
}

#[derive(Deserialize, Default)]
pub struct UpdateTaskBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_name: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub deadline: Option<Option<chrono::DateTime<chrono::Utc>>>,
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub acceptance_criteria: Option<Vec<String>>,
    #[serde(default = "default_actor")]
    pub actor: String,
}

fn default_actor() -> String {
    "api".to_string()
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    Json(body): Json<UpdateTaskBody>,
) -> Result<Json<Value>, GatewayError> {
    if let Some(status) = &body.status {
        let status: TaskStatus = status
            .parse()
            .map_err(|_| GatewayError::BadRequest(format!("unknown status '{status}'")))?;
        state
            .task_processor()
            .transition_status(&task_id, status, &body.actor)?;
    }

    let priority = match &body.priority {
        Some(p) => Some(
            p.parse::<Priority>()
                .map_err(|_| GatewayError::BadRequest(format!("unknown priority '{p}'")))?,
        ),
        None => None,
    };

    let patch = TaskPatch {
        title: body.title,
        description: body.description,
        assignee_name: body.assignee_name,
        priority,
        deadline: body.deadline,
        estimated_minutes: body.estimated_minutes,
        tags: body.tags,
        acceptance_criteria: body.acceptance_criteria,
        ..Default::default()
    };

    let task = state.task_repo.update(&task_id, &patch)?;
    Ok(Json(json!({ "task": task })))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    let patch = TaskPatch {
        soft_deleted: Some(true),
        ..Default::default()
    };
    let task = state.task_repo.update(&task_id, &patch)?;
    Ok(Json(json!({ "task": task })))
}
