//! API layer - local HTTP surface for the UI shell.

mod handlers;
mod health;
mod metrics;
mod routes;

pub use handlers::{
    flush_queue, get_connectivity, get_message, list_messages, peek_queue, set_connectivity,
    submit_message, ConnectivityRequest, ConnectivityResponse, QueueResponse,
    SubmitMessageRequest,
};
pub use health::{health, HealthResponse};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
