use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::handlers::{
    flush_queue, get_connectivity, get_message, list_messages, peek_queue, set_connectivity,
    submit_message,
};
use super::health::health;
use super::metrics::prometheus_metrics;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api/v1",
            Router::new()
                // Coordinator
                .route("/messages", post(submit_message).get(list_messages))
                .route("/messages/{id}", get(get_message))
                // Queue
                .route("/queue", get(peek_queue))
                .route("/queue/flush", post(flush_queue))
                // Host connectivity signal
                .route("/connectivity", get(get_connectivity).put(set_connectivity)),
        )
}
