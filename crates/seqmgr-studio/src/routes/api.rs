use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use seqmgr_core::{Event, EventOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{Result, StudioError};
use crate::session::{Session, SessionInfo};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Session management
        .route("/api/session", post(create_session))
        .route("/api/session/:id", get(get_session).delete(delete_session))
        .route("/api/sessions", get(list_sessions))
        // Workflow
        .route("/api/session/:id/view", get(get_view))
        .route("/api/session/:id/events", post(post_event))
        .route("/api/session/:id/sequences", get(list_sequences))
        .route("/api/session/:id/databases", get(list_databases))
}

// ============================================================================
// Session Management
// ============================================================================

#[derive(Deserialize)]
struct CreateSessionRequest {
    account_id: Uuid,
}

#[derive(Serialize)]
struct SessionResponse {
    success: bool,
    session: SessionInfo,
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<Value>> {
    let session = state.sessions.create_session(request.account_id).await?;
    let view = session.workflow.lock().await.view();

    Ok(Json(json!({
        "success": true,
        "session": SessionInfo::now(&session),
        "view": view,
    })))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>> {
    let session = state.sessions.require_session(&id)?;

    Ok(Json(SessionResponse {
        success: true,
        session: SessionInfo::now(&session),
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let deleted = state.sessions.delete_session(&id);

    if deleted {
        Ok(Json(json!({
            "success": true,
            "message": "Session deleted"
        })))
    } else {
        Err(StudioError::SessionNotFound(id))
    }
}

async fn list_sessions(State(state): State<AppState>) -> Json<Value> {
    let sessions = state.sessions.list_sessions();

    Json(json!({
        "success": true,
        "sessions": sessions,
        "count": sessions.len(),
        "max": state.config.max_sessions,
    }))
}

// ============================================================================
// Workflow
// ============================================================================

async fn get_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let session = state.sessions.require_session(&id)?;
    let view = session.workflow.lock().await.view();

    Ok(Json(json!({
        "success": true,
        "view": view,
    })))
}

async fn post_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(event): Json<Value>,
) -> Result<Json<Value>> {
    let event: Event = serde_json::from_value(event)
        .map_err(|e| StudioError::InvalidRequest(format!("invalid event: {}", e)))?;
    let session = state.sessions.require_session(&id)?;

    let mut workflow = session.workflow.lock().await;
    let result = workflow.handle(event).await;
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            drop(workflow);
            return Err(terminate(&state, &session, e));
        }
    };

    let refreshed = !matches!(outcome, EventOutcome::RefreshFailed(_));
    let notifications = workflow.take_notifications();

    Ok(Json(json!({
        "success": true,
        "outcome": outcome,
        "refreshed": refreshed,
        "notifications": notifications,
        "view": workflow.view(),
    })))
}

async fn list_sequences(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let session = state.sessions.require_session(&id)?;
    let sequences = session.workflow.lock().await.view().sequences;

    Ok(Json(json!({
        "success": true,
        "sequences": sequences,
        "count": sequences.len(),
    })))
}

async fn list_databases(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let session = state.sessions.require_session(&id)?;
    let databases = session.workflow.lock().await.view().databases;

    Ok(Json(json!({
        "success": true,
        "databases": databases,
        "count": databases.len(),
    })))
}

/// Tear down a session whose workflow hit an unrecoverable error.
fn terminate(state: &AppState, session: &Session, error: seqmgr_core::Error) -> StudioError {
    tracing::error!(
        session_id = %session.id,
        account_id = %session.account_id,
        error = %error,
        "workflow terminated"
    );
    state.sessions.delete_session(&session.id);
    StudioError::WorkflowTerminated(error.to_string())
}
