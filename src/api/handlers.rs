//! Outbox endpoints: messages, queue, flush, connectivity.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::connectivity::ConnectivityProvider;
use crate::coordinator::OptimisticMessage;
use crate::error::{AppError, Result};
use crate::queue::QueueItem;
use crate::resync::{FlushReport, FlushTrigger};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub count: usize,
    pub items: Vec<QueueItem>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ConnectivityRequest {
    pub online: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectivityResponse {
    pub online: bool,
    pub changed: bool,
}

/// POST /api/v1/messages - Send now or queue for later
#[tracing::instrument(name = "http.submit_message", skip(state, request))]
pub async fn submit_message(
    State(state): State<AppState>,
    Json(request): Json<SubmitMessageRequest>,
) -> Result<(StatusCode, Json<OptimisticMessage>)> {
    let message = state.coordinator.submit(&request.message).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/v1/messages
pub async fn list_messages(State(state): State<AppState>) -> Json<Vec<OptimisticMessage>> {
    Json(state.coordinator.list())
}

/// GET /api/v1/messages/{id}
pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OptimisticMessage>> {
    state
        .coordinator
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Message '{}' not found", id)))
}

/// GET /api/v1/queue - Peek at pending items
pub async fn peek_queue(State(state): State<AppState>) -> Result<Json<QueueResponse>> {
    let items = state.queue.peek().await?;
    Ok(Json(QueueResponse {
        count: items.len(),
        items,
    }))
}

/// POST /api/v1/queue/flush - Run a manual flush
#[tracing::instrument(name = "http.flush_queue", skip(state))]
pub async fn flush_queue(State(state): State<AppState>) -> Result<Json<FlushReport>> {
    let report = state.driver.flush(FlushTrigger::Manual).await?;
    Ok(Json(report))
}

/// GET /api/v1/connectivity
pub async fn get_connectivity(State(state): State<AppState>) -> Json<ConnectivityRequest> {
    Json(ConnectivityRequest {
        online: state.connectivity.is_online(),
    })
}

/// PUT /api/v1/connectivity - Host pushes its network signal
#[tracing::instrument(name = "http.set_connectivity", skip(state))]
pub async fn set_connectivity(
    State(state): State<AppState>,
    Json(request): Json<ConnectivityRequest>,
) -> Json<ConnectivityResponse> {
    let changed = state.connectivity.update(request.online);
    Json(ConnectivityResponse {
        online: state.connectivity.is_online(),
        changed,
    })
}
