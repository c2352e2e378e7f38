//! Route handler functions for all API endpoints.
//!
//! Each handler extracts parameters via axum extractors, calls into the
//! engine through AppState, and returns JSON responses. Wire field names
//! are camelCase to match the original client contract.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponseBody {
    pub response: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "resultCount")]
    pub result_count: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: String,
    #[serde(rename = "historyLength")]
    pub history_length: usize,
    #[serde(rename = "lastActivity")]
    pub last_activity: DateTime<Utc>,
    #[serde(rename = "hasCachedResults")]
    pub has_cached_results: bool,
    #[serde(rename = "lastAction")]
    pub last_action: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
    pub ticket_count: usize,
}

// =============================================================================
// Handler functions
// =============================================================================

/// POST /chat - one conversational turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponseBody>, ApiError> {
    let message = request
        .message
        .ok_or_else(|| ApiError::BadRequest("Field 'message' is required".to_string()))?;
    if message.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Field 'message' must not be empty".to_string(),
        ));
    }

    let session_id = request
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "default".to_string());

    let outcome = state.orchestrator.handle(&session_id, &message).await;

    Ok(Json(ChatResponseBody {
        response: outcome.response,
        session_id: outcome.session_id,
        result_count: outcome.result_count,
        success: outcome.success,
        error: outcome.error,
    }))
}

/// GET /sessions/{id} - read-only session projection for diagnostics.
pub async fn session_inspect(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let view = state
        .sessions
        .inspect(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No session '{}'", id)))?;

    Ok(Json(SessionResponse {
        id: view.id,
        history_length: view.history_len,
        last_activity: view.last_activity,
        has_cached_results: view.has_cached_results,
        last_action: view.last_action,
    }))
}

/// DELETE /sessions/{id} - clear a session immediately.
pub async fn session_clear(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !state.sessions.remove(&id) {
        return Err(ApiError::NotFound(format!("No session '{}'", id)));
    }
    Ok(Json(DeleteResponse { deleted: true, id }))
}

/// GET /health - liveness probe with basic stats.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ticket_count = state.store.count().await.unwrap_or(0);
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.sessions.len(),
        ticket_count,
    })
}
