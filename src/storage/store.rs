use crate::codec;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::listeners::{Listener, ListenerId, Listeners, Unsubscriber};
use crate::scheduler::Scheduler;
use crate::storage::area::StorageArea;
use crate::storage::bus::StorageBus;
use crate::storage::event::{StorageEvent, StorageScope};
use crate::storage::option::StorageOption;
use crate::storage::service::DocumentStorage;
use crate::storage::types::DocumentId;
use crate::store::{Item, Store, Strategy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use time::OffsetDateTime;

/// Web Storage backed store for one key.
///
/// A storage area only reports writes made by *other* documents, so every
/// `set_item` and `remove_item` also dispatches an equivalent [`StorageEvent`]
/// on this document's bus. Every store of the key on this document (this
/// one, or one owned by another client) then handles it like an external
/// write.
///
/// With an expiry, the store arms one timer at construction. When it fires,
/// the store writes its default item and rejects all later writes.
pub struct StorageStore<T: Item> {
    inner: Arc<Inner<T>>,
    bus_listener: ListenerId,
}

struct Inner<T: Item> {
    key: String,
    default_item: T,
    scope: StorageScope,
    expires: Option<OffsetDateTime>,
    expired: AtomicBool,
    /// Serializes area writes with the expiry flip.
    writes: Mutex<()>,
    area: Arc<dyn StorageArea>,
    bus: Arc<StorageBus>,
    document: DocumentId,
    cache: RwLock<Option<T>>,
    subscribers: Listeners<()>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl<T: Item> StorageStore<T> {
    pub fn new(
        key: impl Into<String>,
        default_item: T,
        option: StorageOption,
        document: &DocumentStorage,
        scheduler: &dyn Scheduler,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let scope = option.scope();
        let inner = Arc::new(Inner {
            key: key.into(),
            default_item,
            scope,
            expires: option.expires_at(),
            expired: AtomicBool::new(false),
            writes: Mutex::new(()),
            area: document.area(scope).clone(),
            bus: document.bus().clone(),
            document: document.id(),
            cache: RwLock::new(None),
            subscribers: Listeners::new(),
            diagnostics,
        });

        let weak: Weak<Inner<T>> = Arc::downgrade(&inner);
        let bus_listener = inner.bus.add_listener(Arc::new(move |ev: &StorageEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.on_event(ev);
            }
        }));

        if let Some(at) = inner.expires {
            if at <= scheduler.now() {
                inner.expire();
            } else {
                let weak = Arc::downgrade(&inner);
                scheduler.schedule_at(
                    at,
                    Box::new(move || {
                        if let Some(inner) = weak.upgrade() {
                            inner.expire();
                        }
                    }),
                );
            }
        }

        Self {
            inner,
            bus_listener,
        }
    }

    pub fn scope(&self) -> StorageScope {
        self.inner.scope
    }

    pub fn expires(&self) -> Option<OffsetDateTime> {
        self.inner.expires
    }

    pub fn is_expired(&self) -> bool {
        self.inner.is_expired()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

impl<T: Item> Inner<T> {
    fn strategy(&self) -> Strategy {
        self.scope.strategy()
    }

    fn is_expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }

    fn on_event(&self, ev: &StorageEvent) {
        if ev.scope != self.scope {
            return;
        }

        match ev.key.as_deref() {
            Some(key) if key == self.key => {
                let item = ev.new_value.as_deref().and_then(|raw| self.decode(raw));
                self.replace_cache(item);
            }
            // cleared
            None => {
                self.replace_cache(None);
            }
            Some(_) => return,
        }

        self.subscribers.emit(&());
    }

    fn decode(&self, raw: &str) -> Option<T> {
        match codec::decode(raw) {
            Ok(item) => Some(item),
            Err(e) => {
                self.diagnostics.report(Diagnostic::DeserializeFailed {
                    strategy: self.strategy(),
                    key: self.key.clone(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    fn replace_cache(&self, item: Option<T>) -> Option<T> {
        std::mem::replace(
            &mut *self.cache.write().unwrap_or_else(PoisonError::into_inner),
            item,
        )
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes `item` to the area and cache. Call with the write lock held.
    fn persist(&self, item: T) -> Result<StorageEvent, Diagnostic> {
        let serialized = codec::encode(&item).map_err(|e| Diagnostic::SerializeFailed {
            strategy: self.strategy(),
            key: self.key.clone(),
            error: e.to_string(),
        })?;

        let old_value = self.area.get_item(&self.key);
        self.area
            .set_item(&self.key, &serialized)
            .map_err(|e| self.persist_failed(e))?;

        self.replace_cache(Some(item));
        Ok(StorageEvent::changed(
            self.scope,
            self.document,
            self.key.clone(),
            old_value,
            Some(serialized),
        ))
    }

    /// Removes the key from the area and cache. Call with the write lock held.
    fn erase(&self) -> Result<StorageEvent, Diagnostic> {
        let old_value = self.area.get_item(&self.key);
        self.area
            .remove_item(&self.key)
            .map_err(|e| self.persist_failed(e))?;

        self.replace_cache(None);
        Ok(StorageEvent::changed(
            self.scope,
            self.document,
            self.key.clone(),
            old_value,
            None,
        ))
    }

    /// Dispatches or reports the outcome of a write. Never called under the
    /// write lock, so listeners and sinks may write back into the store.
    fn publish(&self, outcome: Result<StorageEvent, Diagnostic>) {
        match outcome {
            Ok(event) => self.bus.dispatch(&event),
            Err(diagnostic) => self.diagnostics.report(diagnostic),
        }
    }

    fn write(&self, item: T) {
        let writes = self.lock_writes();
        if self.is_expired() {
            drop(writes);
            self.diagnostics.report(Diagnostic::WriteAfterExpiry {
                strategy: self.strategy(),
                key: self.key.clone(),
            });
            return;
        }
        let outcome = self.persist(item);
        drop(writes);
        self.publish(outcome);
    }

    fn remove(&self) {
        let writes = self.lock_writes();
        let outcome = self.erase();
        drop(writes);
        self.publish(outcome);
    }

    /// The default write and the flag flip share one critical section, so no
    /// write can land between them.
    fn expire(&self) {
        let writes = self.lock_writes();
        let outcome = self.persist(self.default_item.clone());
        self.expired.store(true, Ordering::Release);
        drop(writes);

        self.publish(outcome);
        self.diagnostics.report(Diagnostic::Expired {
            strategy: self.strategy(),
            key: self.key.clone(),
        });
    }

    fn persist_failed(&self, e: anyhow::Error) -> Diagnostic {
        Diagnostic::PersistFailed {
            strategy: self.strategy(),
            key: self.key.clone(),
            error: e.to_string(),
        }
    }
}

impl<T: Item> Store<T> for StorageStore<T> {
    fn get_item(&self) -> T {
        let inner = &self.inner;
        if inner.is_expired() {
            return inner.default_item.clone();
        }

        if let Some(item) = inner.cache.read().unwrap_or_else(PoisonError::into_inner).clone() {
            return item;
        }

        match inner.area.get_item(&inner.key).and_then(|raw| inner.decode(&raw)) {
            Some(item) => {
                inner.replace_cache(Some(item.clone()));
                item
            }
            None => inner.default_item.clone(),
        }
    }

    /// Web Storage is not visible at server-render time, so this is always
    /// the default item.
    fn get_initial_item(&self) -> T {
        self.inner.default_item.clone()
    }

    fn set_item(&self, item: T) {
        self.inner.write(item);
    }

    fn remove_item(&self) {
        self.inner.remove();
    }

    fn subscribe(&self, listener: Listener) -> Unsubscriber {
        let id = self.inner.subscribers.add(Arc::new(move |_: &()| listener()));
        let weak = Arc::downgrade(&self.inner);
        Unsubscriber::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.subscribers.remove(id);
            }
        })
    }

    fn key(&self) -> &str {
        &self.inner.key
    }

    fn strategy(&self) -> Strategy {
        self.inner.strategy()
    }
}

impl<T: Item> Drop for StorageStore<T> {
    fn drop(&mut self) {
        self.inner.bus.remove_listener(self.bus_listener);
    }
}
