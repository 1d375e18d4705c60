use crate::codec;
use crate::cookies::cookie::{CookieChange, CookieOptions};
use crate::cookies::cookie_jar::CookieJarHandle;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::listeners::{Listener, ListenerId, Listeners, Unsubscriber};
use crate::store::{Item, Store, Strategy};
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Cookie-backed store for one cookie name.
///
/// Notifications come from the jar's own change listeners, which fire for
/// writes made through the jar by anyone (this store, another store for the
/// same name, or another client sharing the jar).
pub struct CookieStore<T: Item> {
    inner: Arc<Inner<T>>,
    jar_listener: ListenerId,
}

struct Inner<T: Item> {
    name: String,
    default_item: T,
    initial_item: Option<T>,
    options: CookieOptions,
    jar: CookieJarHandle,
    cache: RwLock<Option<T>>,
    subscribers: Listeners<()>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl<T: Item> CookieStore<T> {
    pub fn new(
        name: impl Into<String>,
        default_item: T,
        initial_item: Option<T>,
        options: CookieOptions,
        jar: CookieJarHandle,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let inner = Arc::new(Inner {
            name: name.into(),
            default_item,
            initial_item,
            options,
            jar: jar.clone(),
            cache: RwLock::new(None),
            subscribers: Listeners::new(),
            diagnostics,
        });

        let weak: Weak<Inner<T>> = Arc::downgrade(&inner);
        let jar_listener = jar.add_change_listener(Arc::new(move |change: &CookieChange| {
            if let Some(inner) = weak.upgrade() {
                inner.on_change(change);
            }
        }));

        Self {
            inner,
            jar_listener,
        }
    }

    /// Cookie attributes this store writes with.
    pub fn options(&self) -> &CookieOptions {
        &self.inner.options
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

impl<T: Item> Inner<T> {
    fn on_change(&self, change: &CookieChange) {
        if change.name != self.name {
            return;
        }

        let item = change.value.as_deref().and_then(|raw| self.decode(raw));
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = item;
        self.subscribers.emit(&());
    }

    fn decode(&self, raw: &str) -> Option<T> {
        match codec::decode(raw) {
            Ok(item) => Some(item),
            Err(e) => {
                self.diagnostics.report(Diagnostic::DeserializeFailed {
                    strategy: Strategy::Cookie,
                    key: self.name.clone(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    fn cached(&self) -> Option<T> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn replace_cache(&self, item: Option<T>) -> Option<T> {
        std::mem::replace(
            &mut *self.cache.write().unwrap_or_else(PoisonError::into_inner),
            item,
        )
    }
}

impl<T: Item> Store<T> for CookieStore<T> {
    fn get_item(&self) -> T {
        let inner = &self.inner;
        if let Some(item) = inner.cached() {
            return item;
        }

        match inner.jar.get(&inner.name).and_then(|raw| inner.decode(&raw)) {
            Some(item) => {
                inner.replace_cache(Some(item.clone()));
                item
            }
            None => inner.default_item.clone(),
        }
    }

    fn get_initial_item(&self) -> T {
        self.inner
            .initial_item
            .clone()
            .unwrap_or_else(|| self.inner.default_item.clone())
    }

    fn set_item(&self, item: T) {
        let inner = &self.inner;
        let serialized = match codec::encode(&item) {
            Ok(s) => s,
            Err(e) => {
                inner.diagnostics.report(Diagnostic::SerializeFailed {
                    strategy: Strategy::Cookie,
                    key: inner.name.clone(),
                    error: e.to_string(),
                });
                return;
            }
        };

        // The jar notifies synchronously; listeners must already see the new item.
        let previous = inner.replace_cache(Some(item));
        if let Err(e) = inner.jar.set(&inner.name, &serialized, &inner.options) {
            inner.replace_cache(previous);
            inner.diagnostics.report(Diagnostic::PersistFailed {
                strategy: Strategy::Cookie,
                key: inner.name.clone(),
                error: e.to_string(),
            });
        }
    }

    fn remove_item(&self) {
        let inner = &self.inner;
        if let Err(e) = inner.jar.remove(&inner.name, &inner.options) {
            inner.diagnostics.report(Diagnostic::PersistFailed {
                strategy: Strategy::Cookie,
                key: inner.name.clone(),
                error: e.to_string(),
            });
            return;
        }
        inner.replace_cache(None);
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
        &self.inner.name
    }

    fn strategy(&self) -> Strategy {
        Strategy::Cookie
    }
}

impl<T: Item> Drop for CookieStore<T> {
    fn drop(&mut self) {
        self.inner.jar.remove_change_listener(self.jar_listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::cookie_jar::{CookieJar, InMemoryCookieJar};
    use crate::diagnostics::RecordingSink;
    use serde::{Deserialize, Serialize, Serializer};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Count {
        count: u32,
    }

    /// Serializes fine until it is asked to carry a cycle.
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    enum Node {
        Leaf(String),
        Cyclic,
    }

    impl Serialize for Node {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            match self {
                Node::Leaf(v) => s.serialize_newtype_variant("Node", 0, "Leaf", v),
                Node::Cyclic => Err(serde::ser::Error::custom("cyclic structure")),
            }
        }
    }

    fn store<T: Item>(
        jar: &CookieJarHandle,
        name: &str,
        default_item: T,
        initial_item: Option<T>,
    ) -> (CookieStore<T>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let store = CookieStore::new(
            name,
            default_item,
            initial_item,
            CookieOptions::new().path("/"),
            jar.clone(),
            sink.clone(),
        );
        (store, sink)
    }

    fn jar() -> CookieJarHandle {
        InMemoryCookieJar::new().into_handle()
    }

    fn counter() -> (Listener, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        (
            Arc::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }),
            hits,
        )
    }

    #[test]
    fn get_item_returns_default_when_cookie_missing() {
        let (store, _) = store(&jar(), "k", "default".to_string(), None);
        assert_eq!(store.get_item(), "default");
        assert_eq!(store.get_initial_item(), "default");
    }

    #[test]
    fn get_item_reads_persisted_cookie() {
        let jar = jar();
        jar.set("k", r#"{"count":5}"#, &CookieOptions::default()).unwrap();
        let (store, _) = store(&jar, "k", Count { count: 0 }, None);
        assert_eq!(store.get_item(), Count { count: 5 });
    }

    #[test]
    fn unparseable_cookie_falls_back_to_default() {
        let jar = jar();
        jar.set("k", "not-valid-json", &CookieOptions::default()).unwrap();
        let (store, sink) = store(&jar, "k", "fallback".to_string(), None);

        assert_eq!(store.get_item(), "fallback");
        assert!(matches!(sink.diagnostics()[0], Diagnostic::DeserializeFailed { .. }));
    }

    #[test]
    fn initial_item_wins_over_default() {
        let (store, _) = store(&jar(), "k", "default".to_string(), Some("ssr-value".to_string()));
        assert_eq!(store.get_initial_item(), "ssr-value");
    }

    #[test]
    fn set_item_persists_json_and_updates_cache() {
        let jar = jar();
        let (store, _) = store(&jar, "k", Count { count: 0 }, None);

        store.set_item(Count { count: 1 });
        assert_eq!(store.get_item(), Count { count: 1 });
        assert_eq!(jar.get("k").as_deref(), Some(r#"{"count":1}"#));
    }

    #[test]
    fn unserializable_item_is_dropped_silently() {
        let jar = jar();
        let (store, sink) = store(&jar, "k", Node::Leaf("default".into()), None);
        store.set_item(Node::Leaf("kept".into()));

        let (listener, hits) = counter();
        let unsub = store.subscribe(listener);
        store.set_item(Node::Cyclic);

        assert_eq!(store.get_item(), Node::Leaf("kept".into()));
        assert_eq!(jar.get("k").as_deref(), Some(r#"{"Leaf":"kept"}"#));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(matches!(sink.diagnostics()[0], Diagnostic::SerializeFailed { .. }));
        unsub.unsubscribe();
    }

    #[test]
    fn remove_item_resets_to_default_and_notifies() {
        let jar = jar();
        let (store, _) = store(&jar, "k", "default".to_string(), None);
        store.set_item("value".to_string());

        let (listener, hits) = counter();
        let _unsub = store.subscribe(listener);
        store.remove_item();

        assert_eq!(store.get_item(), "default");
        assert!(jar.get("k").is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscriber_called_once_per_set() {
        let (store, _) = store(&jar(), "k", 0u32, None);
        let (listener, hits) = counter();
        let unsub = store.subscribe(listener);

        store.set_item(1);
        store.set_item(2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        unsub.unsubscribe();
    }

    #[test]
    fn other_cookie_names_do_not_notify() {
        let jar = jar();
        let (store1, _) = store(&jar, "one", 0u32, None);
        let (store2, _) = store(&jar, "two", 0u32, None);
        let (listener, hits) = counter();
        let unsub = store1.subscribe(listener);

        store2.set_item(7);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        unsub.unsubscribe();
    }

    #[test]
    fn unsubscribe_stops_notifications_and_is_idempotent() {
        let (store, _) = store(&jar(), "k", 0u32, None);
        let (listener, hits) = counter();
        let unsub = store.subscribe(listener);

        unsub.unsubscribe();
        unsub.unsubscribe();
        store.set_item(3);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn external_write_through_jar_updates_cache() {
        let jar = jar();
        let (store, _) = store(&jar, "k", 0u32, None);
        assert_eq!(store.get_item(), 0);

        let (listener, hits) = counter();
        let _unsub = store.subscribe(listener);
        jar.set("k", "42", &CookieOptions::default()).unwrap();

        assert_eq!(store.get_item(), 42);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_store_releases_jar_listener() {
        let jar = Arc::new(InMemoryCookieJar::new());
        let handle: CookieJarHandle = jar.clone();
        let (store, _) = store(&handle, "k", 0u32, None);
        assert_eq!(jar.listener_count(), 1);
        drop(store);
        assert_eq!(jar.listener_count(), 0);

        // Writing after the store is gone must not reach a dangling listener.
        handle.set("k", "1", &CookieOptions::default()).unwrap();
        assert_eq!(handle.get("k").as_deref(), Some("1"));
    }
}
