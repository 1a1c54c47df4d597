use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Gateway-boundary error. Every subsystem error lands here once, then is
/// translated into the `{error, details, help}` response envelope.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Db(#[from] coordinator_db::DbError),

    #[error(transparent)]
    Session(#[from] coordinator_sessions::SessionError),

    #[error(transparent)]
    Dialog(#[from] coordinator_dialog::DialogError),

    #[error(transparent)]
    Tasks(#[from] coordinator_tasks::TasksError),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited")]
    RateLimited,
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Tasks(coordinator_tasks::TasksError::Validation(_)) => StatusCode::BAD_REQUEST,
            GatewayError::Tasks(coordinator_tasks::TasksError::NotFound(_)) => StatusCode::NOT_FOUND,
            GatewayError::Tasks(coordinator_tasks::TasksError::IllegalTransition { .. }) => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn help(&self) -> &'static str {
        match self {
            GatewayError::Unauthorized(_) => "check your admin secret or webhook signature",
            GatewayError::BadRequest(_) => "check the request body against the API schema",
            GatewayError::NotFound(_) => "verify the task_id or transport identifier",
            GatewayError::RateLimited => "retry after a short backoff",
            _ => "retry, and check server logs if this persists",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "details": format!("{self:?}"),
            "help": self.help(),
        }));
        (status, body).into_response()
    }
}
