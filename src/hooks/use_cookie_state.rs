use crate::codec::SetStateAction;
use crate::cookies::{CookieClient, CookieOptions, CookieStore};
use crate::errors::SyncedStorageError;
use crate::hooks::state::{Mirrored, RenderCallback};
use crate::provider::cookie_client_context;
use crate::store::{Item, Store};
use std::fmt;
use std::sync::Arc;

/// Cookie-backed state of one consumer.
///
/// Starts from the server-seeded value of the cookie and follows every later
/// change of it, whoever makes it.
pub struct CookieState<T: Item + PartialEq> {
    inner: Mirrored<T, CookieStore<T>>,
}

impl<T: Item + PartialEq> CookieState<T> {
    /// Binds to the store for `key` on `client`.
    pub fn new(
        client: &CookieClient,
        key: &str,
        default_value: T,
        options: Option<CookieOptions>,
    ) -> Result<Self, SyncedStorageError> {
        let store = client.get_or_create_store(key, default_value, options)?;
        Ok(Self {
            inner: Mirrored::new(store),
        })
    }

    /// The value currently shown.
    pub fn value(&self) -> T {
        self.inner.value()
    }

    /// Persists the value `action` yields. An updater receives the value
    /// currently shown.
    pub fn set(&self, action: impl Into<SetStateAction<T>>) {
        let next = action.into().resolve(&self.inner.value());
        self.inner.store().set_item(next.clone());
        self.inner.show(next);
    }

    pub fn set_value(&self, value: T) {
        self.set(SetStateAction::Value(value));
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        self.set(SetStateAction::update(f));
    }

    /// Removes the cookie; the value falls back to the default.
    pub fn remove(&self) {
        self.inner.store().remove_item();
    }

    /// Number of visible changes since construction.
    pub fn renders(&self) -> usize {
        self.inner.renders()
    }

    /// Runs `callback` after every visible change.
    pub fn on_render(&self, callback: RenderCallback) {
        self.inner.set_on_render(callback);
    }

    pub fn store(&self) -> &Arc<CookieStore<T>> {
        self.inner.store()
    }
}

impl<T: Item + PartialEq + fmt::Debug> fmt::Debug for CookieState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CookieState").field(&self.inner).finish()
    }
}

/// Cookie state for `key` from the enclosing [`CookieClientProvider`](crate::provider::CookieClientProvider).
///
/// # Panics
/// Panics when called outside a `CookieClientProvider`, or when `key` is
/// already bound to a different item type.
pub fn use_cookie_state<T: Item + PartialEq>(
    key: &str,
    default_value: T,
    options: Option<CookieOptions>,
) -> CookieState<T> {
    try_use_cookie_state(key, default_value, options).unwrap_or_else(|e| panic!("{e}"))
}

/// Like [`use_cookie_state`], returning the misuse as an error.
pub fn try_use_cookie_state<T: Item + PartialEq>(
    key: &str,
    default_value: T,
    options: Option<CookieOptions>,
) -> Result<CookieState<T>, SyncedStorageError> {
    let context = cookie_client_context().ok_or(SyncedStorageError::MissingProvider {
        hook: "use_cookie_state",
        provider: "CookieClientProvider",
    })?;
    CookieState::new(&context.client, key, default_value, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::{CookieJar, SsrCookie, SsrCookies};
    use crate::provider::CookieClientProvider;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        dark: bool,
    }

    fn ssr(pairs: &[(&str, &str)]) -> Option<SsrCookies> {
        Some(pairs.iter().map(|(n, v)| SsrCookie::new(*n, *v)).collect::<Vec<_>>().into())
    }

    #[test]
    #[should_panic(expected = "use_cookie_state must be used within a CookieClientProvider")]
    fn panics_outside_provider() {
        let _ = use_cookie_state("k", 0u32, None);
    }

    #[test]
    fn try_variant_reports_missing_provider() {
        let err = try_use_cookie_state("k", 0u32, None).err();
        assert!(matches!(
            err,
            Some(SyncedStorageError::MissingProvider { provider: "CookieClientProvider", .. })
        ));
    }

    #[test]
    fn starts_from_default_without_ssr_cookie() {
        let provider = CookieClientProvider::new(None);
        let state = provider.provide(|| use_cookie_state("k", "default".to_string(), None));
        assert_eq!(state.value(), "default");
        assert_eq!(state.renders(), 0);
    }

    #[test]
    fn starts_from_ssr_cookie() {
        let provider = CookieClientProvider::new(ssr(&[("prefs", r#"{"dark":true}"#)]));
        let state = provider.provide(|| use_cookie_state("prefs", Prefs { dark: false }, None));
        assert_eq!(state.value(), Prefs { dark: true });
    }

    #[test]
    fn set_value_updates_and_persists() {
        let provider = CookieClientProvider::new(None);
        let state = provider.provide(|| use_cookie_state("k", "default".to_string(), None));

        state.set_value("new".to_string());
        assert_eq!(state.value(), "new");
        assert_eq!(provider.client().jar().get("k").as_deref(), Some(r#""new""#));
        assert_eq!(state.renders(), 1);
    }

    #[test]
    fn updater_uses_shown_value() {
        let provider = CookieClientProvider::new(ssr(&[("n", "10")]));
        let state = provider.provide(|| use_cookie_state("n", 0i32, None));

        state.update(|n| n + 1);
        state.update(|n| n + 1);
        assert_eq!(state.value(), 12);
    }

    #[test]
    fn siblings_share_writes() {
        let provider = CookieClientProvider::new(None);
        let (a, b) = provider.provide(|| {
            (
                use_cookie_state("shared", 0u32, None),
                use_cookie_state("shared", 0u32, None),
            )
        });
        assert!(Arc::ptr_eq(a.store(), b.store()));

        a.set_value(7);
        assert_eq!(b.value(), 7);

        b.set(SetStateAction::update(|n: &u32| n * 2));
        assert_eq!(a.value(), 14);
    }

    #[test]
    fn external_jar_write_is_observed() {
        let provider = CookieClientProvider::new(None);
        let state = provider.provide(|| use_cookie_state("k", 0u32, None));

        provider
            .client()
            .jar()
            .set("k", "5", &CookieOptions::default())
            .unwrap();
        assert_eq!(state.value(), 5);
    }

    #[test]
    fn equal_value_does_not_rerender() {
        let provider = CookieClientProvider::new(None);
        let state = provider.provide(|| use_cookie_state("k", Prefs { dark: false }, None));
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        state.on_render(Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        state.set_value(Prefs { dark: true });
        state.set_value(Prefs { dark: true });
        assert_eq!(state.renders(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_falls_back_to_default() {
        let provider = CookieClientProvider::new(None);
        let state = provider.provide(|| use_cookie_state("k", "default".to_string(), None));
        state.set_value("v".to_string());

        state.remove();
        assert_eq!(state.value(), "default");
        assert!(provider.client().jar().get("k").is_none());
    }

    #[test]
    fn drop_unsubscribes() {
        let provider = CookieClientProvider::new(None);
        let state = provider.provide(|| use_cookie_state("k", 0u32, None));
        let store = state.store().clone();
        assert_eq!(store.subscriber_count(), 1);

        drop(state);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn explicit_client_without_provider() {
        let provider = CookieClientProvider::new(None);
        let state = CookieState::new(provider.client(), "k", 1u8, None).unwrap();
        state.set_value(2);
        assert_eq!(state.value(), 2);
    }

    #[test]
    #[should_panic(expected = "already exists with a different item type")]
    fn type_mismatch_panics() {
        let provider = CookieClientProvider::new(None);
        provider.provide(|| {
            let _a = use_cookie_state("k", 0u32, None);
            let _b = use_cookie_state("k", "text".to_string(), None);
        });
    }
}
