//! Durable FIFO queue of outbound chat messages.
//!
//! The whole sequence is persisted as one JSON array under a single storage
//! key. Every operation reads (and, for writes, replaces) the full sequence,
//! so a failed write never leaves a partially updated queue behind.
//!
//! # Example
//!
//! ```rust,ignore
//! let queue = DurableQueue::new(store, QueueConfig::default());
//!
//! // Defer a message while offline
//! queue.enqueue(QueueItem::new("Ăn phở 45k")).await?;
//!
//! // Take everything when a flush starts
//! let items = queue.drain().await?;
//! ```

mod models;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::metrics::QueueMetrics;
use crate::storage::KeyValueStore;

pub use models::{QueueConfig, QueueError, QueueItem, QueueStats, DEFAULT_QUEUE_KEY};

/// Persisted FIFO queue over a `KeyValueStore`.
///
/// # Design
///
/// - One storage key holds the full serialized sequence
/// - An async mutex serializes `enqueue`/`drain`/`peek`, making each
///   read-modify-write atomic for every caller sharing this queue
/// - `drain` writes the empty sequence before returning the items
pub struct DurableQueue {
    store: Arc<dyn KeyValueStore>,
    config: QueueConfig,
    lock: Mutex<()>,
}

impl DurableQueue {
    pub fn new(store: Arc<dyn KeyValueStore>, config: QueueConfig) -> Self {
        Self {
            store,
            config,
            lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Name of the storage backend behind this queue
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Append `item` to the end of the queue.
    ///
    /// Rejects empty messages, duplicate ids and, when `max_items` is set,
    /// enqueues past capacity. Nothing is written on rejection.
    pub async fn enqueue(&self, item: QueueItem) -> Result<(), QueueError> {
        if item.message.trim().is_empty() {
            return Err(QueueError::EmptyMessage);
        }

        let _guard = self.lock.lock().await;

        let mut items = self.load("enqueue").await?;

        if items.iter().any(|existing| existing.id == item.id) {
            return Err(QueueError::DuplicateId(item.id));
        }

        if let Some(max) = self.config.max_items {
            if items.len() >= max {
                tracing::warn!(
                    message_id = %item.id,
                    queue_size = items.len(),
                    "Queue full, rejecting message"
                );
                return Err(QueueError::QueueFull { size: items.len() });
            }
        }

        let message_id = item.id.clone();
        items.push(item);
        self.persist(&items, "enqueue").await?;

        QueueMetrics::record_enqueued(items.len());
        tracing::debug!(
            message_id = %message_id,
            queue_size = items.len(),
            "Message enqueued for later delivery"
        );

        Ok(())
    }

    /// Take every queued item in FIFO order and leave the queue empty.
    ///
    /// If persisting the empty sequence fails, no items are returned and the
    /// stored queue is unchanged.
    pub async fn drain(&self) -> Result<Vec<QueueItem>, QueueError> {
        let _guard = self.lock.lock().await;

        let items = self.load("drain").await?;
        if items.is_empty() {
            return Ok(items);
        }

        self.persist(&[], "drain").await?;
        QueueMetrics::set_depth(0);

        tracing::info!(message_count = items.len(), "Drained message queue");

        Ok(items)
    }

    /// Current queue contents, without mutating anything.
    pub async fn peek(&self) -> Result<Vec<QueueItem>, QueueError> {
        let _guard = self.lock.lock().await;
        let items = self.load("peek").await?;
        QueueMetrics::set_depth(items.len());
        Ok(items)
    }

    /// Number of queued items
    pub async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.peek().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.peek().await?.is_empty())
    }

    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        Ok(QueueStats {
            key: self.config.key.clone(),
            backend: self.backend_name().to_string(),
            depth: self.len().await?,
            max_items: self.config.max_items,
        })
    }

    async fn load(&self, operation: &str) -> Result<Vec<QueueItem>, QueueError> {
        let raw = match self.store.get(&self.config.key).await {
            Ok(raw) => raw,
            Err(e) => {
                QueueMetrics::record_storage_error(operation);
                tracing::error!(error = %e, operation, "Failed to read message queue");
                return Err(e.into());
            }
        };

        match raw {
            None => Ok(Vec::new()),
            Some(s) if s.trim().is_empty() => Ok(Vec::new()),
            Some(s) => serde_json::from_str(&s).map_err(|e| {
                tracing::error!(error = %e, key = %self.config.key, "Stored queue is unreadable");
                QueueError::Corrupt(e.to_string())
            }),
        }
    }

    async fn persist(&self, items: &[QueueItem], operation: &str) -> Result<(), QueueError> {
        let serialized = serde_json::to_string(items)
            .map_err(|e| QueueError::Storage(e.into()))?;

        if let Err(e) = self.store.set(&self.config.key, &serialized).await {
            QueueMetrics::record_storage_error(operation);
            tracing::error!(error = %e, operation, "Failed to persist message queue");
            return Err(e.into());
        }

        Ok(())
    }
}
