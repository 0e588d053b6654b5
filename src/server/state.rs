use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::connectivity::ConnectivityObserver;
use crate::coordinator::ChatCoordinator;
use crate::error::{AppError, Result};
use crate::queue::{DurableQueue, QueueConfig};
use crate::resync::{OverlapPolicy, ResyncDriver};
use crate::sender::{ChatSender, HttpChatSender};
use crate::storage::{create_store, KeyValueStore};

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<DurableQueue>,
    pub connectivity: Arc<ConnectivityObserver>,
    pub driver: Arc<ResyncDriver>,
    pub coordinator: Arc<ChatCoordinator>,
    pub started_at: Instant,
}

impl AppState {
    /// Build the full component graph from settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let store = create_store(&settings.storage)?;
        let sender: Arc<dyn ChatSender> = Arc::new(HttpChatSender::new(&settings.chat_api)?);
        Self::with_components(settings, store, sender)
    }

    /// Build the component graph around an existing store and sender
    pub fn with_components(
        settings: &Settings,
        store: Arc<dyn KeyValueStore>,
        sender: Arc<dyn ChatSender>,
    ) -> Result<Self> {
        let policy: OverlapPolicy = settings
            .resync
            .overlap_policy
            .parse()
            .map_err(AppError::Validation)?;

        let queue = Arc::new(DurableQueue::new(
            store,
            QueueConfig {
                key: settings.storage.queue_key.clone(),
                max_items: settings.storage.max_items,
            },
        ));
        let connectivity = Arc::new(ConnectivityObserver::new(
            settings.connectivity.initial_online,
        ));
        let driver = Arc::new(ResyncDriver::new(
            queue.clone(),
            connectivity.clone(),
            sender.clone(),
            policy,
        ));
        let coordinator = Arc::new(ChatCoordinator::new(
            queue.clone(),
            connectivity.clone(),
            sender,
            &driver,
            settings.coordinator.max_tracked_messages,
        ));

        Ok(Self {
            queue,
            connectivity,
            driver,
            coordinator,
            started_at: Instant::now(),
        })
    }
}
