pub mod config;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, Result};
use crate::pipeline::RenderMode;
use crate::session::SessionInfo;
use crate::state::AppState;
use crate::webrtc::{AnswerResponse, SdpOffer};

// ============================================================================
// Health
// ============================================================================

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub sessions: usize,
    pub detector: &'static str,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.registry.len(),
        detector: state.registry.detector_backend(),
    })
}

// ============================================================================
// Negotiation
// ============================================================================

/// Negotiate a session over plain HTTP.
///
/// The session is not tied to any control socket; it ends when the peer
/// connection closes or on `DELETE /api/sessions/:id`.
pub async fn offer(State(state): State<Arc<AppState>>, Json(req): Json<SdpOffer>) -> Result<Json<AnswerResponse>> {
    let (answer, _binder) = state.control.offer(req).await?;
    Ok(Json(answer))
}

// ============================================================================
// Sessions
// ============================================================================

pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionInfo>> {
    Json(state.registry.list())
}

fn session_info(state: &AppState, id: &str) -> Result<SessionInfo> {
    state
        .registry
        .lookup(id)
        .map(|session| session.info())
        .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
}

pub async fn get_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<SessionInfo>> {
    session_info(&state, &id).map(Json)
}

#[derive(Debug, Deserialize)]
pub struct ProcessingRequest {
    pub enabled: bool,
}

pub async fn set_processing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ProcessingRequest>,
) -> Result<Json<SessionInfo>> {
    if !state.registry.set_enabled(&id, req.enabled) {
        return Err(AppError::SessionNotFound(id));
    }
    session_info(&state, &id).map(Json)
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: RenderMode,
}

pub async fn set_mode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ModeRequest>,
) -> Result<Json<SessionInfo>> {
    if !state.registry.set_mode(&id, req.mode) {
        return Err(AppError::SessionNotFound(id));
    }
    session_info(&state, &id).map(Json)
}

/// Generic success response
#[derive(Serialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Idempotent teardown
pub async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Json<ActionResponse> {
    let removed = state.registry.teardown(&id, "http_delete");
    if removed {
        info!("Session {} deleted over HTTP", id);
    }
    Json(ActionResponse {
        success: true,
        message: Some(if removed { "Session closed" } else { "No such session" }.to_string()),
    })
}
