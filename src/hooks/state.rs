use crate::listeners::Unsubscriber;
use crate::store::{Item, Store};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Callback run after every visible change of a hook's value.
pub type RenderCallback = Arc<dyn Fn() + Send + Sync>;

/// The part of a hook its store subscription can reach.
struct Mirror<T> {
    value: Mutex<T>,
    renders: AtomicUsize,
    on_render: Mutex<Option<RenderCallback>>,
}

impl<T: Clone + PartialEq> Mirror<T> {
    fn value(&self) -> MutexGuard<'_, T> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shows `next`, unless it equals the value already shown.
    fn show(&self, next: T) {
        {
            let mut value = self.value();
            if *value == next {
                return;
            }
            *value = next;
        }

        self.renders.fetch_add(1, Ordering::SeqCst);
        let callback = self
            .on_render
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// A store mirrored into a locally displayed value.
///
/// Subscribes on construction and unsubscribes on drop. The subscription
/// holds no strong reference back to the store or the mirror.
pub(crate) struct Mirrored<T: Item + PartialEq, S: Store<T> + 'static> {
    store: Arc<S>,
    mirror: Arc<Mirror<T>>,
    unsubscriber: Unsubscriber,
}

impl<T: Item + PartialEq, S: Store<T> + 'static> Mirrored<T, S> {
    pub(crate) fn new(store: Arc<S>) -> Self {
        let mirror = Arc::new(Mirror {
            value: Mutex::new(store.get_initial_item()),
            renders: AtomicUsize::new(0),
            on_render: Mutex::new(None),
        });

        let weak_store: Weak<S> = Arc::downgrade(&store);
        let weak_mirror = Arc::downgrade(&mirror);
        let unsubscriber = store.subscribe(Arc::new(move || {
            if let (Some(store), Some(mirror)) = (weak_store.upgrade(), weak_mirror.upgrade()) {
                mirror.show(store.get_item());
            }
        }));

        Self {
            store,
            mirror,
            unsubscriber,
        }
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub(crate) fn value(&self) -> T {
        self.mirror.value().clone()
    }

    pub(crate) fn show(&self, next: T) {
        self.mirror.show(next);
    }

    /// Shows whatever the store currently holds.
    pub(crate) fn resync(&self) {
        self.mirror.show(self.store.get_item());
    }

    pub(crate) fn renders(&self) -> usize {
        self.mirror.renders.load(Ordering::SeqCst)
    }

    pub(crate) fn set_on_render(&self, callback: RenderCallback) {
        *self
            .mirror
            .on_render
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }
}

impl<T: Item + PartialEq, S: Store<T> + 'static> Drop for Mirrored<T, S> {
    fn drop(&mut self) {
        self.unsubscriber.unsubscribe();
    }
}

impl<T: Item + PartialEq + fmt::Debug, S: Store<T> + 'static> fmt::Debug for Mirrored<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mirrored")
            .field("key", &self.store.key())
            .field("strategy", &self.store.strategy())
            .field("value", &*self.mirror.value())
            .field("renders", &self.renders())
            .finish()
    }
}
