//! Resync data models

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::sender::ChatReply;

/// What started a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushTrigger {
    /// Consumer started (view mounted, daemon booted)
    Mount,
    /// Offline-to-online transition
    Reconnect,
    /// Explicit request through the API
    Manual,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mount => "mount",
            Self::Reconnect => "reconnect",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour when a trigger arrives while a flush is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Wait for the running flush, then run this one
    #[default]
    Wait,
    /// Return immediately; the running flush covers it
    Coalesce,
}

impl FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wait" | "queue" => Ok(Self::Wait),
            "coalesce" | "skip" => Ok(Self::Coalesce),
            other => Err(format!("unknown overlap policy: {}", other)),
        }
    }
}

/// Why a flush did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Offline,
    Empty,
    InProgress,
}

/// Result of one flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlushReport {
    Skipped { reason: SkipReason },
    Completed { delivered: usize, failed: usize },
}

impl FlushReport {
    pub fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    /// Metric label for this report
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped { reason: SkipReason::Offline } => "offline",
            Self::Skipped { reason: SkipReason::Empty } => "empty",
            Self::Skipped { reason: SkipReason::InProgress } => "in_progress",
            Self::Completed { .. } => "completed",
        }
    }
}

/// Per-item delivery result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DeliveryOutcome {
    #[serde(rename = "response")]
    Delivered(ChatReply),
    #[serde(rename = "error")]
    Failed(String),
}

/// Outcome of resending one queued message.
///
/// Serializes as `{"messageId", "response"}` or `{"messageId", "error"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResyncOutcome {
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(flatten)]
    pub result: DeliveryOutcome,
}

impl ResyncOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self.result, DeliveryOutcome::Delivered(_))
    }
}
