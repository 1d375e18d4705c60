use super::event::StorageEvent;
use crate::listeners::{ListenerId, Listeners};
use std::sync::Arc;

/// Listener for storage events.
pub type StorageListener = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

/// Per-document event target for [`StorageEvent`]s (the `window` of a tab).
///
/// Dispatch is synchronous: every listener has run when `dispatch` returns.
#[derive(Debug, Default)]
pub struct StorageBus {
    listeners: Listeners<StorageEvent>,
}

impl StorageBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: StorageListener) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }

    pub fn dispatch(&self, ev: &StorageEvent) {
        self.listeners.emit(ev);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
