use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::metrics::ConnectivityMetrics;

use super::{ConnectivityProvider, HandlerId, TransitionHandler};

/// Capacity of the transition broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A connectivity edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

#[derive(Default)]
struct Handlers {
    online: Vec<(HandlerId, TransitionHandler)>,
    offline: Vec<(HandlerId, TransitionHandler)>,
}

/// Owner of the connectivity flag.
///
/// `update` is the only way to change the state. The new value is stored
/// before any handler runs, and handlers run only when the value actually
/// flips, in registration order.
pub struct ConnectivityObserver {
    online: AtomicBool,
    next_id: AtomicU64,
    handlers: RwLock<Handlers>,
    events: broadcast::Sender<ConnectivityEvent>,
}

impl ConnectivityObserver {
    pub fn new(initial_online: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        ConnectivityMetrics::set_online(initial_online);

        Self {
            online: AtomicBool::new(initial_online),
            next_id: AtomicU64::new(1),
            handlers: RwLock::new(Handlers::default()),
            events,
        }
    }

    /// Feed the host connectivity signal.
    ///
    /// Returns true when this call caused a transition.
    pub fn update(&self, online: bool) -> bool {
        // swap makes exactly one caller observe each edge
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return false;
        }

        ConnectivityMetrics::record_transition(online);
        tracing::info!(online, "Connectivity changed");

        let event = if online {
            ConnectivityEvent::Online
        } else {
            ConnectivityEvent::Offline
        };
        // No receivers is fine
        let _ = self.events.send(event);

        // Snapshot so handlers may register or remove handlers themselves
        let to_run: Vec<TransitionHandler> = {
            let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            let list = if online { &handlers.online } else { &handlers.offline };
            list.iter().map(|(_, h)| h.clone()).collect()
        };

        for handler in to_run {
            handler();
        }

        true
    }

    /// Subscribe to transitions as an async stream of events
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }

    /// Number of registered handlers across both edges
    pub fn handler_count(&self) -> usize {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers.online.len() + handlers.offline.len()
    }

    fn register(&self, online: bool, handler: TransitionHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if online {
            handlers.online.push((id, handler));
        } else {
            handlers.offline.push((id, handler));
        }
        id
    }
}

impl ConnectivityProvider for ConnectivityObserver {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn on_transition_to_online(&self, handler: TransitionHandler) -> HandlerId {
        self.register(true, handler)
    }

    fn on_transition_to_offline(&self, handler: TransitionHandler) -> HandlerId {
        self.register(false, handler)
    }

    fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.online.len() + handlers.offline.len();
        handlers.online.retain(|(hid, _)| *hid != id);
        handlers.offline.retain(|(hid, _)| *hid != id);
        before != handlers.online.len() + handlers.offline.len()
    }
}
