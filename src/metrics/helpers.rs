//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    CONNECTIVITY_ONLINE, CONNECTIVITY_TRANSITIONS_TOTAL, FLUSHES_TOTAL, QUEUE_DEPTH,
    QUEUE_ENQUEUED_TOTAL, RESYNC_DELIVERED_TOTAL, RESYNC_FAILED_TOTAL, STORAGE_ERRORS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording queue metrics
pub struct QueueMetrics;

impl QueueMetrics {
    pub fn record_enqueued(depth: usize) {
        QUEUE_ENQUEUED_TOTAL.inc();
        QUEUE_DEPTH.set(depth as i64);
    }

    pub fn set_depth(depth: usize) {
        QUEUE_DEPTH.set(depth as i64);
    }

    /// Record a storage failure for `operation` ("enqueue", "peek", "drain")
    pub fn record_storage_error(operation: &str) {
        STORAGE_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }
}

/// Helper struct for recording resync metrics
pub struct ResyncMetrics;

impl ResyncMetrics {
    pub fn record_flush(trigger: &str, result: &str) {
        FLUSHES_TOTAL.with_label_values(&[trigger, result]).inc();
    }

    pub fn record_delivered() {
        RESYNC_DELIVERED_TOTAL.inc();
    }

    pub fn record_failed() {
        RESYNC_FAILED_TOTAL.inc();
    }
}

/// Helper struct for recording connectivity metrics
pub struct ConnectivityMetrics;

impl ConnectivityMetrics {
    pub fn record_transition(online: bool) {
        let edge = if online { "online" } else { "offline" };
        CONNECTIVITY_TRANSITIONS_TOTAL.with_label_values(&[edge]).inc();
        Self::set_online(online);
    }

    pub fn set_online(online: bool) {
        CONNECTIVITY_ONLINE.set(i64::from(online));
    }
}
