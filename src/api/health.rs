//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::connectivity::ConnectivityProvider;
use crate::queue::QueueStats;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub online: bool,
    pub queue: QueueHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct QueueHealthResponse {
    pub backend: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<QueueStats> for QueueHealthResponse {
    fn from(stats: QueueStats) -> Self {
        Self {
            backend: stats.backend,
            key: stats.key,
            depth: Some(stats.depth),
            max_items: stats.max_items,
            error: None,
        }
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, queue) = match state.queue.stats().await {
        Ok(stats) => ("healthy", QueueHealthResponse::from(stats)),
        Err(e) => {
            let config = state.queue.config();
            (
                "degraded",
                QueueHealthResponse {
                    backend: state.queue.backend_name().to_string(),
                    key: config.key.clone(),
                    depth: None,
                    max_items: config.max_items,
                    error: Some(e.to_string()),
                },
            )
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        online: state.connectivity.is_online(),
        queue,
    })
}
