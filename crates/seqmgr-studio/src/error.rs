use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use seqmgr_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Too many sessions (max: {0})")]
    TooManySessions(usize),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Workflow terminated: {0}")]
    WorkflowTerminated(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Seed error: {0}")]
    Seed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for StudioError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            StudioError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            StudioError::TooManySessions(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "TOO_MANY_SESSIONS")
            }
            StudioError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            StudioError::WorkflowTerminated(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "WORKFLOW_TERMINATED")
            }
            StudioError::Core(e) => match e {
                CoreError::FieldValidation(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
                }
                CoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                CoreError::CallerInvariant(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "WORKFLOW_TERMINATED")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            StudioError::Seed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SEED_ERROR"),
            StudioError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
