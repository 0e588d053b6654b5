//! Queue data models and error types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::StorageError;

/// Default logical key the queue is persisted under
pub const DEFAULT_QUEUE_KEY: &str = "agent-message-queue";

/// Configuration for the durable queue
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Storage key holding the serialized sequence
    pub key: String,
    /// Maximum number of queued items; `None` means unbounded
    pub max_items: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_QUEUE_KEY.to_string(),
            max_items: None,
        }
    }
}

/// One outbound chat message awaiting delivery.
///
/// Serialized with camelCase names so values written by the web client
/// (`{"id", "message", "createdAt"}`) round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Client-generated id, shared with the optimistic UI entry
    pub id: String,
    /// Text to send
    pub message: String,
    /// When the item was enqueued
    pub created_at: DateTime<Utc>,
}

impl QueueItem {
    /// Create an item with a fresh id stamped now
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// Create an item for an id the caller already handed to the UI
    pub fn with_id(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Errors from durable queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    /// Underlying storage failed; nothing was written
    #[error("Queue storage error: {0}")]
    Storage(#[from] StorageError),

    /// Stored value is not a sequence of queue items
    #[error("Stored queue is unreadable: {0}")]
    Corrupt(String),

    /// An item with this id is already queued
    #[error("Message {0} is already queued")]
    DuplicateId(String),

    /// Empty messages are never queued
    #[error("Cannot queue an empty message")]
    EmptyMessage,

    /// Configured capacity reached
    #[error("Queue full (size: {size})")]
    QueueFull { size: usize },
}

/// Statistics about the queue
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub key: String,
    pub backend: String,
    pub depth: usize,
    pub max_items: Option<usize>,
}
