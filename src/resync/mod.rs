//! Resync driver: replays queued messages once connectivity allows.
//!
//! A flush is one pass of peek, drain, then deliver each item in order.
//! Flushes run on startup (`FlushTrigger::Mount`), on every offline-to-online
//! edge (`FlushTrigger::Reconnect`) and on demand (`FlushTrigger::Manual`).
//!
//! # Guarantees
//!
//! - Nothing is drained while offline or when the queue is empty
//! - Items are drained before any network attempt and delivered strictly
//!   one after another in FIFO order
//! - A failed resend is reported and dropped, never re-queued
//! - Flushes never overlap, so no item is delivered twice

mod models;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{broadcast, mpsc, Mutex};

use crate::connectivity::ConnectivityProvider;
use crate::metrics::ResyncMetrics;
use crate::queue::{DurableQueue, QueueError};
use crate::sender::ChatSender;

pub use models::{
    DeliveryOutcome, FlushReport, FlushTrigger, OverlapPolicy, ResyncOutcome, SkipReason,
};

/// Capacity of the outcome broadcast channel
const OUTCOME_CHANNEL_CAPACITY: usize = 256;

/// Callback receiving each per-item resync outcome
pub type OutcomeHandler = Arc<dyn Fn(&ResyncOutcome) + Send + Sync>;

/// Registration token for an outcome handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutcomeHandlerId(u64);

pub struct ResyncDriver {
    queue: Arc<DurableQueue>,
    connectivity: Arc<dyn ConnectivityProvider>,
    sender: Arc<dyn ChatSender>,
    policy: OverlapPolicy,
    /// Held for the whole duration of a flush
    flush_lock: Mutex<()>,
    handlers: RwLock<Vec<(OutcomeHandlerId, OutcomeHandler)>>,
    next_handler_id: AtomicU64,
    outcomes: broadcast::Sender<ResyncOutcome>,
}

impl ResyncDriver {
    pub fn new(
        queue: Arc<DurableQueue>,
        connectivity: Arc<dyn ConnectivityProvider>,
        sender: Arc<dyn ChatSender>,
        policy: OverlapPolicy,
    ) -> Self {
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);

        Self {
            queue,
            connectivity,
            sender,
            policy,
            flush_lock: Mutex::new(()),
            handlers: RwLock::new(Vec::new()),
            next_handler_id: AtomicU64::new(1),
            outcomes,
        }
    }

    /// Register a callback for per-item outcomes
    pub fn on_outcome(&self, handler: OutcomeHandler) -> OutcomeHandlerId {
        let id = OutcomeHandlerId(self.next_handler_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, handler));
        id
    }

    pub fn remove_outcome_handler(&self, id: OutcomeHandlerId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        before != handlers.len()
    }

    /// Async stream of outcomes
    pub fn subscribe(&self) -> broadcast::Receiver<ResyncOutcome> {
        self.outcomes.subscribe()
    }

    /// Run one flush.
    ///
    /// Returns `Err` only for storage failures in peek or drain; delivery
    /// failures are reported per item through the outcome callbacks.
    #[tracing::instrument(name = "resync_flush", skip(self, trigger), fields(trigger = %trigger))]
    pub async fn flush(&self, trigger: FlushTrigger) -> Result<FlushReport, QueueError> {
        let _guard = match self.policy {
            OverlapPolicy::Wait => self.flush_lock.lock().await,
            OverlapPolicy::Coalesce => match self.flush_lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    tracing::debug!("Flush already running, coalescing trigger");
                    return Ok(self.finish(trigger, FlushReport::skipped(SkipReason::InProgress)));
                }
            },
        };

        if !self.connectivity.is_online() {
            tracing::debug!("Offline, leaving queue untouched");
            return Ok(self.finish(trigger, FlushReport::skipped(SkipReason::Offline)));
        }

        let pending = self.queue.peek().await.inspect_err(|_| {
            ResyncMetrics::record_flush(trigger.as_str(), "storage_error");
        })?;
        if pending.is_empty() {
            return Ok(self.finish(trigger, FlushReport::skipped(SkipReason::Empty)));
        }

        let items = self.queue.drain().await.inspect_err(|_| {
            ResyncMetrics::record_flush(trigger.as_str(), "storage_error");
        })?;

        tracing::info!(message_count = items.len(), "Starting resync of queued messages");

        let mut delivered = 0;
        let mut failed = 0;

        for item in items {
            let result = match self.sender.send(&item.message).await {
                Ok(reply) => {
                    delivered += 1;
                    ResyncMetrics::record_delivered();
                    tracing::debug!(message_id = %item.id, "Queued message delivered");
                    DeliveryOutcome::Delivered(reply)
                }
                Err(e) => {
                    failed += 1;
                    ResyncMetrics::record_failed();
                    tracing::warn!(message_id = %item.id, error = %e, "Queued message failed");
                    DeliveryOutcome::Failed(e.to_string())
                }
            };

            self.emit(ResyncOutcome {
                message_id: item.id,
                result,
            });
        }

        tracing::info!(delivered, failed, "Resync completed");

        Ok(self.finish(trigger, FlushReport::Completed { delivered, failed }))
    }

    /// Flush on startup, then on every transition to online, until shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        // Capacity 1: edges arriving while a wakeup is pending fold into it
        let (wake_tx, mut wake_rx) = mpsc::channel::<()>(1);
        let handler_id = self.connectivity.on_transition_to_online(Arc::new(move || {
            let _ = wake_tx.try_send(());
        }));

        tracing::info!(policy = ?self.policy, "Resync driver started");

        self.flush_logged(FlushTrigger::Mount).await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Resync driver received shutdown signal");
                    break;
                }
                Some(()) = wake_rx.recv() => {
                    self.flush_logged(FlushTrigger::Reconnect).await;
                }
            }
        }

        self.connectivity.remove_handler(handler_id);
        tracing::info!("Resync driver stopped");
    }

    async fn flush_logged(&self, trigger: FlushTrigger) {
        if let Err(e) = self.flush(trigger).await {
            tracing::error!(error = %e, trigger = %trigger, "Resync aborted by storage error");
        }
    }

    fn finish(&self, trigger: FlushTrigger, report: FlushReport) -> FlushReport {
        ResyncMetrics::record_flush(trigger.as_str(), report.label());
        report
    }

    fn emit(&self, outcome: ResyncOutcome) {
        let handlers: Vec<OutcomeHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, h)| h.clone())
            .collect();

        for handler in handlers {
            handler(&outcome);
        }

        // No receivers is fine
        let _ = self.outcomes.send(outcome);
    }
}
