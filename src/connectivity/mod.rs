//! Connectivity observation.
//!
//! `ConnectivityObserver` owns the online/offline flag and fans out
//! edge-triggered transitions to registered handlers. The host signal comes
//! either from the local API (a UI shell pushing browser/OS events) or from
//! `ConnectivityProbe`, which polls a health URL in the background.

mod observer;
mod probe;

use std::sync::Arc;

pub use observer::{ConnectivityEvent, ConnectivityObserver};
pub use probe::ConnectivityProbe;

/// Callback invoked on a connectivity edge
pub type TransitionHandler = Arc<dyn Fn() + Send + Sync>;

/// Registration token returned when a handler is added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub(crate) u64);

/// Read access to connectivity plus transition subscriptions.
///
/// Consumers only read the state or subscribe; they never set it.
pub trait ConnectivityProvider: Send + Sync {
    /// Instantaneous connectivity state
    fn is_online(&self) -> bool;

    /// Register a handler run once per offline-to-online edge
    fn on_transition_to_online(&self, handler: TransitionHandler) -> HandlerId;

    /// Register a handler run once per online-to-offline edge
    fn on_transition_to_offline(&self, handler: TransitionHandler) -> HandlerId;

    /// Unregister a handler. Returns false if it was not registered.
    fn remove_handler(&self, id: HandlerId) -> bool;
}
