//! Prometheus metrics for the outbox.
//!
//! - Queue metrics (enqueued, depth)
//! - Resync metrics (flushes by trigger and result, per-item outcomes)
//! - Storage and connectivity metrics

mod helpers;

pub use helpers::{encode_metrics, ConnectivityMetrics, QueueMetrics, ResyncMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "agent_outbox";

lazy_static! {
    // ============================================================================
    // Queue Metrics
    // ============================================================================

    /// Total messages appended to the durable queue
    pub static ref QUEUE_ENQUEUED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queue_enqueued_total", METRIC_PREFIX),
        "Total messages enqueued for later delivery"
    ).unwrap();

    /// Items currently persisted in the queue (last observed)
    pub static ref QUEUE_DEPTH: IntGauge = register_int_gauge!(
        format!("{}_queue_depth", METRIC_PREFIX),
        "Number of messages waiting in the durable queue"
    ).unwrap();

    /// Storage failures by operation
    pub static ref STORAGE_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_storage_errors_total", METRIC_PREFIX),
        "Total storage failures",
        &["operation"]
    ).unwrap();

    // ============================================================================
    // Resync Metrics
    // ============================================================================

    /// Flush attempts by trigger and result
    pub static ref FLUSHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_flushes_total", METRIC_PREFIX),
        "Total flush attempts",
        &["trigger", "result"]
    ).unwrap();

    /// Queued messages delivered on resync
    pub static ref RESYNC_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_resync_delivered_total", METRIC_PREFIX),
        "Total queued messages delivered during resync"
    ).unwrap();

    /// Queued messages whose resend failed
    pub static ref RESYNC_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_resync_failed_total", METRIC_PREFIX),
        "Total queued messages that failed during resync"
    ).unwrap();

    // ============================================================================
    // Connectivity Metrics
    // ============================================================================

    /// Connectivity edges observed
    pub static ref CONNECTIVITY_TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_connectivity_transitions_total", METRIC_PREFIX),
        "Total connectivity transitions",
        &["edge"]
    ).unwrap();

    /// 1 when online, 0 when offline
    pub static ref CONNECTIVITY_ONLINE: IntGauge = register_int_gauge!(
        format!("{}_connectivity_online", METRIC_PREFIX),
        "Current connectivity state"
    ).unwrap();
}
