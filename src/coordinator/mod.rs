//! Chat session coordinator.
//!
//! Decides per outgoing message whether to send now or defer to the queue,
//! and keeps the optimistic entry for each message in step with what the
//! server and the resync driver report.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;

use crate::connectivity::ConnectivityProvider;
use crate::queue::{DurableQueue, QueueError, QueueItem};
use crate::resync::{DeliveryOutcome, ResyncDriver, ResyncOutcome};
use crate::sender::{ChatReply, ChatSender};

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Lifecycle of a locally rendered message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Direct send in flight
    Sending,
    /// Waiting in the durable queue
    Queued,
    /// Confirmed by the server
    Sent,
    /// Delivery failed; not retried
    Error,
}

impl MessageStatus {
    /// No further transition will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Error)
    }
}

/// A chat entry shown before the server has confirmed it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimisticMessage {
    pub id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub status: MessageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ChatReply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OptimisticMessage {
    fn from_item(item: &QueueItem) -> Self {
        Self {
            id: item.id.clone(),
            message: item.message.clone(),
            created_at: item.created_at,
            status: MessageStatus::Sending,
            response: None,
            error: None,
        }
    }
}

pub struct ChatCoordinator {
    queue: Arc<DurableQueue>,
    connectivity: Arc<dyn ConnectivityProvider>,
    sender: Arc<dyn ChatSender>,
    messages: Arc<DashMap<String, OptimisticMessage>>,
    max_tracked: usize,
}

impl ChatCoordinator {
    /// Create a coordinator and subscribe it to `driver`'s outcomes.
    ///
    /// Once more than `max_tracked` entries exist, the oldest `Sent`/`Error`
    /// entries are evicted. Pending entries are never evicted.
    pub fn new(
        queue: Arc<DurableQueue>,
        connectivity: Arc<dyn ConnectivityProvider>,
        sender: Arc<dyn ChatSender>,
        driver: &ResyncDriver,
        max_tracked: usize,
    ) -> Self {
        let messages: Arc<DashMap<String, OptimisticMessage>> = Arc::new(DashMap::new());

        let tracked = messages.clone();
        driver.on_outcome(Arc::new(move |outcome: &ResyncOutcome| {
            if Self::reconcile(&tracked, outcome) {
                Self::prune(&tracked, max_tracked);
            }
        }));

        Self {
            queue,
            connectivity,
            sender,
            messages,
            max_tracked,
        }
    }

    /// Send `message` now if online, otherwise defer it.
    ///
    /// A network failure on the direct send also defers it. Any other send
    /// failure is final and shows up as `MessageStatus::Error`.
    pub async fn submit(&self, message: &str) -> Result<OptimisticMessage, CoordinatorError> {
        if message.trim().is_empty() {
            return Err(CoordinatorError::EmptyMessage);
        }

        let item = QueueItem::new(message);
        self.messages
            .insert(item.id.clone(), OptimisticMessage::from_item(&item));

        if self.connectivity.is_online() {
            match self.sender.send(&item.message).await {
                Ok(reply) => {
                    tracing::debug!(message_id = %item.id, "Message sent directly");
                    return Ok(self.update(&item, |m| {
                        m.status = MessageStatus::Sent;
                        m.response = Some(reply);
                    }));
                }
                Err(e) if e.is_network() => {
                    tracing::info!(
                        message_id = %item.id,
                        error = %e,
                        "Direct send failed on network, queueing"
                    );
                }
                Err(e) => {
                    tracing::warn!(message_id = %item.id, error = %e, "Message rejected");
                    return Ok(self.update(&item, |m| {
                        m.status = MessageStatus::Error;
                        m.error = Some(e.to_string());
                    }));
                }
            }
        }

        self.defer(item).await
    }

    /// Look up one optimistic entry
    pub fn get(&self, id: &str) -> Option<OptimisticMessage> {
        self.messages.get(id).map(|m| m.value().clone())
    }

    /// All entries, oldest first
    pub fn list(&self) -> Vec<OptimisticMessage> {
        let mut all: Vec<_> = self.messages.iter().map(|m| m.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    async fn defer(&self, item: QueueItem) -> Result<OptimisticMessage, CoordinatorError> {
        // Mark first: a flush may deliver the item before enqueue returns
        let queued = self.update(&item, |m| m.status = MessageStatus::Queued);
        let id = item.id.clone();

        match self.queue.enqueue(item).await {
            Ok(()) => Ok(self.get(&id).unwrap_or(queued)),
            Err(e) => {
                let mut failed = queued;
                failed.status = MessageStatus::Error;
                failed.error = Some(e.to_string());
                self.messages.insert(id, failed);
                Self::prune(&self.messages, self.max_tracked);
                Err(e.into())
            }
        }
    }

    /// Apply `f` to the tracked entry for `item` and return the result
    fn update(&self, item: &QueueItem, f: impl FnOnce(&mut OptimisticMessage)) -> OptimisticMessage {
        let updated = {
            let mut entry = self
                .messages
                .entry(item.id.clone())
                .or_insert_with(|| OptimisticMessage::from_item(item));
            f(entry.value_mut());
            entry.value().clone()
        };

        if updated.status.is_terminal() {
            Self::prune(&self.messages, self.max_tracked);
        }
        updated
    }

    /// Returns false when the outcome is for an untracked message
    fn reconcile(messages: &DashMap<String, OptimisticMessage>, outcome: &ResyncOutcome) -> bool {
        let Some(mut entry) = messages.get_mut(&outcome.message_id) else {
            // Queued by an earlier process; nothing rendered for it here
            tracing::debug!(message_id = %outcome.message_id, "Outcome for untracked message");
            return false;
        };

        match &outcome.result {
            DeliveryOutcome::Delivered(reply) => {
                entry.status = MessageStatus::Sent;
                entry.response = Some(reply.clone());
                entry.error = None;
            }
            DeliveryOutcome::Failed(error) => {
                entry.status = MessageStatus::Error;
                entry.error = Some(error.clone());
            }
        }
        true
    }

    /// Evict the oldest terminal entries until at most `max_tracked` remain
    fn prune(messages: &DashMap<String, OptimisticMessage>, max_tracked: usize) {
        let excess = messages.len().saturating_sub(max_tracked);
        if excess == 0 {
            return;
        }

        let mut terminal: Vec<(DateTime<Utc>, String)> = messages
            .iter()
            .filter(|m| m.status.is_terminal())
            .map(|m| (m.created_at, m.id.clone()))
            .collect();
        terminal.sort();
        terminal.truncate(excess);

        for (_, id) in &terminal {
            messages.remove(id);
        }
        tracing::debug!(evicted = terminal.len(), "Pruned finished messages");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ConnectivityObserver;
    use crate::resync::{FlushTrigger, OverlapPolicy};
    use crate::sender::DeliveryError;
    use crate::storage::MemoryKeyValueStore;
    use async_trait::async_trait;
    use serde_json::json;

    /// Always returns the configured result
    struct FixedSender(Result<ChatReply, DeliveryError>);

    #[async_trait]
    impl ChatSender for FixedSender {
        async fn send(&self, _message: &str) -> Result<ChatReply, DeliveryError> {
            self.0.clone()
        }
    }

    struct Fixture {
        queue: Arc<DurableQueue>,
        connectivity: Arc<ConnectivityObserver>,
        driver: ResyncDriver,
        coordinator: ChatCoordinator,
    }

    fn fixture(online: bool, result: Result<ChatReply, DeliveryError>) -> Fixture {
        fixture_with_cap(online, result, 1000)
    }

    fn fixture_with_cap(
        online: bool,
        result: Result<ChatReply, DeliveryError>,
        max_tracked: usize,
    ) -> Fixture {
        let queue = Arc::new(DurableQueue::new(
            Arc::new(MemoryKeyValueStore::new()),
            Default::default(),
        ));
        let connectivity = Arc::new(ConnectivityObserver::new(online));
        let sender: Arc<dyn ChatSender> = Arc::new(FixedSender(result));
        let driver = ResyncDriver::new(
            queue.clone(),
            connectivity.clone(),
            sender.clone(),
            OverlapPolicy::Wait,
        );
        let coordinator = ChatCoordinator::new(
            queue.clone(),
            connectivity.clone(),
            sender,
            &driver,
            max_tracked,
        );
        Fixture {
            queue,
            connectivity,
            driver,
            coordinator,
        }
    }

    #[tokio::test]
    async fn test_online_success_is_sent() {
        let f = fixture(true, Ok(ChatReply(json!({"reply": "ok"}))));

        let msg = f.coordinator.submit("Ăn phở 45k").await.unwrap();

        assert_eq!(msg.status, MessageStatus::Sent);
        assert_eq!(msg.response, Some(ChatReply(json!({"reply": "ok"}))));
        assert!(f.queue.peek().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_is_queued() {
        let f = fixture(false, Ok(ChatReply(json!({}))));

        let msg = f.coordinator.submit("Ăn phở 45k").await.unwrap();

        assert_eq!(msg.status, MessageStatus::Queued);
        let queued = f.queue.peek().await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].id, msg.id);
    }

    #[tokio::test]
    async fn test_network_failure_falls_back_to_queue() {
        let f = fixture(true, Err(DeliveryError::Network("timed out".to_string())));

        let msg = f.coordinator.submit("hello").await.unwrap();

        assert_eq!(msg.status, MessageStatus::Queued);
        assert_eq!(f.queue.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejection_is_error_and_not_queued() {
        let f = fixture(
            true,
            Err(DeliveryError::Rejected {
                status: 400,
                message: "Bad input".to_string(),
            }),
        );

        let msg = f.coordinator.submit("hello").await.unwrap();

        assert_eq!(msg.status, MessageStatus::Error);
        assert_eq!(msg.error.as_deref(), Some("Bad input"));
        assert!(f.queue.peek().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let f = fixture(true, Ok(ChatReply(json!({}))));
        assert!(matches!(
            f.coordinator.submit("  ").await,
            Err(CoordinatorError::EmptyMessage)
        ));
        assert!(f.coordinator.list().is_empty());
    }

    #[tokio::test]
    async fn test_resync_outcome_reconciles_queued_entry() {
        let f = fixture(false, Ok(ChatReply(json!({"reply": "saved"}))));
        let msg = f.coordinator.submit("Ăn phở 45k").await.unwrap();

        f.connectivity.update(true);
        f.driver.flush(FlushTrigger::Reconnect).await.unwrap();

        let updated = f.coordinator.get(&msg.id).unwrap();
        assert_eq!(updated.status, MessageStatus::Sent);
        assert_eq!(updated.response, Some(ChatReply(json!({"reply": "saved"}))));
    }

    #[tokio::test]
    async fn test_resync_failure_marks_error() {
        let f = fixture(false, Err(DeliveryError::Network("reset".to_string())));
        let msg = f.coordinator.submit("hello").await.unwrap();

        f.connectivity.update(true);
        f.driver.flush(FlushTrigger::Reconnect).await.unwrap();

        let updated = f.coordinator.get(&msg.id).unwrap();
        assert_eq!(updated.status, MessageStatus::Error);
        assert_eq!(updated.error.as_deref(), Some("Network error: reset"));
        // Terminal: not queued again
        assert!(f.queue.peek().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_oldest_first() {
        let f = fixture(false, Ok(ChatReply(json!({}))));
        let first = f.coordinator.submit("one").await.unwrap();
        let second = f.coordinator.submit("two").await.unwrap();

        let ids: Vec<_> = f.coordinator.list().into_iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 2);
        if first.created_at != second.created_at {
            assert_eq!(ids, vec![first.id, second.id]);
        }
    }

    async fn submit_spaced(coordinator: &ChatCoordinator, text: &str) -> OptimisticMessage {
        // Distinct created_at values keep eviction order deterministic
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        coordinator.submit(text).await.unwrap()
    }

    #[tokio::test]
    async fn test_finished_messages_are_pruned_oldest_first() {
        let f = fixture_with_cap(true, Ok(ChatReply(json!({}))), 2);

        let first = submit_spaced(&f.coordinator, "one").await;
        let second = submit_spaced(&f.coordinator, "two").await;
        let third = submit_spaced(&f.coordinator, "three").await;

        let ids: Vec<_> = f.coordinator.list().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![second.id, third.id]);
        assert!(f.coordinator.get(&first.id).is_none());
    }

    #[tokio::test]
    async fn test_pending_messages_are_never_pruned() {
        let f = fixture_with_cap(false, Ok(ChatReply(json!({"reply": "ok"}))), 1);

        submit_spaced(&f.coordinator, "one").await;
        submit_spaced(&f.coordinator, "two").await;
        let last = submit_spaced(&f.coordinator, "three").await;

        let statuses: Vec<_> = f.coordinator.list().into_iter().map(|m| m.status).collect();
        assert_eq!(statuses, vec![MessageStatus::Queued; 3]);

        // Once delivered they become evictable
        f.connectivity.update(true);
        f.driver.flush(FlushTrigger::Reconnect).await.unwrap();

        let remaining = f.coordinator.list();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, last.id);
        assert_eq!(remaining[0].status, MessageStatus::Sent);
    }
}
