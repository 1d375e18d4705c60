//! Synchronous listener registries.
//!
//! Used for the cookie jar's change listeners, the storage bus and each store's
//! own subscribers. Dispatch runs on the caller's thread, in registration
//! order, and never holds the registry lock while a listener runs, so a
//! listener may subscribe, unsubscribe or write back into the same store.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Identifier handed out for each registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Zero-argument store subscriber.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Ordered set of listeners for events of type `E`.
pub struct Listeners<E: ?Sized> {
    next_id: AtomicU64,
    entries: Mutex<BTreeMap<ListenerId, Arc<dyn Fn(&E) + Send + Sync>>>,
}

impl<E: ?Sized> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<E: ?Sized> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}

impl<E: ?Sized> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn Fn(&E) + Send + Sync>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener);
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every listener with `event`.
    ///
    /// A listener removed by an earlier listener of the same dispatch is skipped.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<(ListenerId, Arc<dyn Fn(&E) + Send + Sync>)> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, l)| (*id, l.clone()))
            .collect();

        for (id, listener) in snapshot {
            if self.contains(id) {
                listener(event);
            }
        }
    }
}

/// Deregisters a subscription. Calling [`Unsubscriber::unsubscribe`] more than
/// once is a no-op after the first call.
///
/// Dropping an `Unsubscriber` does **not** unsubscribe.
#[must_use = "dropping the unsubscriber leaves the listener registered"]
pub struct Unsubscriber {
    release: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Unsubscriber {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// An unsubscriber with nothing to release.
    pub fn noop() -> Self {
        Self {
            release: Mutex::new(None),
        }
    }

    pub fn unsubscribe(&self) {
        let release = self
            .release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(release) = release {
            release();
        }
    }

    pub fn is_active(&self) -> bool {
        self.release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl fmt::Debug for Unsubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscriber")
            .field("active", &self.is_active())
            .finish()
    }
}
