// Shared components
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Outbox core
pub mod connectivity;
pub mod queue;
pub mod resync;
pub mod sender;
pub mod storage;

// Consumer boundary
pub mod coordinator;

// Application layer
pub mod api;
pub mod server;
