use crate::codec;
use crate::config::ClientConfig;
use crate::cookies::cookie::{CookieOptions, SsrCookie, SsrCookies};
use crate::cookies::cookie_jar::CookieJarHandle;
use crate::cookies::store::CookieStore;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::errors::SyncedStorageError;
use crate::services::ClientServices;
use crate::store::{Item, Strategy};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Registry of cookie-backed stores, one per cookie name.
///
/// Stores are created lazily and memoized, so every caller asking for the
/// same name shares one [`CookieStore`] and observes the others' writes.
pub struct CookieClient {
    ssr_cookies: SsrCookies,
    jar: CookieJarHandle,
    config: Arc<ClientConfig>,
    diagnostics: Arc<dyn DiagnosticSink>,
    stores: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl CookieClient {
    /// Creates a client seeded with the cookies seen at server-render time.
    pub fn new(
        ssr_cookies: Option<SsrCookies>,
        config: Arc<ClientConfig>,
        services: &ClientServices,
    ) -> Self {
        Self {
            ssr_cookies: ssr_cookies.unwrap_or_else(|| Arc::from(Vec::new())),
            jar: services.cookie_jar.clone(),
            config,
            diagnostics: services.diagnostics.clone(),
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the store for cookie `key`, creating it on first request.
    ///
    /// A new store's initial item is the decoded server cookie of the same
    /// name, when there is one and it parses. `options` default to the
    /// client's configured cookie options; they are only used when the store
    /// is created.
    pub fn get_or_create_store<T: Item>(
        &self,
        key: &str,
        default_item: T,
        options: Option<CookieOptions>,
    ) -> Result<Arc<CookieStore<T>>, SyncedStorageError> {
        let composite = Strategy::Cookie.composite_key(key);
        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = stores.get(&composite) {
            return existing
                .clone()
                .downcast::<CookieStore<T>>()
                .map_err(|_| SyncedStorageError::TypeMismatch { key: composite });
        }

        let initial_item = self.initial_item::<T>(key);
        let options = options
            .unwrap_or_default()
            .or(&self.config.default_cookie_options);

        let store = Arc::new(CookieStore::new(
            key,
            default_item,
            initial_item,
            options,
            self.jar.clone(),
            self.diagnostics.clone(),
        ));
        stores.insert(composite, store.clone());

        Ok(store)
    }

    /// The server cookie snapshot this client was seeded with.
    pub fn ssr_cookies(&self) -> &[SsrCookie] {
        &self.ssr_cookies
    }

    pub fn jar(&self) -> &CookieJarHandle {
        &self.jar
    }

    /// Number of stores created so far.
    pub fn len(&self) -> usize {
        self.stores.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn initial_item<T: Item>(&self, key: &str) -> Option<T> {
        let cookie = self.ssr_cookies.iter().find(|c| c.name == key)?;
        match codec::decode(&cookie.value) {
            Ok(item) => Some(item),
            Err(e) => {
                self.diagnostics.report(Diagnostic::DeserializeFailed {
                    strategy: Strategy::Cookie,
                    key: key.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }
}

impl fmt::Debug for CookieClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieClient")
            .field("ssr_cookies", &self.ssr_cookies.len())
            .field("stores", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;
    use crate::store::Store;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
    }

    fn client(ssr: Option<Vec<SsrCookie>>) -> (CookieClient, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let services = ClientServices::in_memory().with_diagnostics(sink.clone());
        let client = CookieClient::new(
            ssr.map(Arc::from),
            Arc::new(ClientConfig::default()),
            &services,
        );
        (client, sink)
    }

    #[test]
    fn same_key_returns_same_instance() {
        let (client, _) = client(None);
        let a = client.get_or_create_store("key", "default".to_string(), None).unwrap();
        let b = client.get_or_create_store("key", "default".to_string(), None).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(client.len(), 1);
    }

    #[test]
    fn different_keys_yield_different_stores() {
        let (client, _) = client(None);
        let a = client.get_or_create_store("a", "default".to_string(), None).unwrap();
        let b = client.get_or_create_store("b", "default".to_string(), None).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn initial_item_is_parsed_from_ssr_cookies() {
        let (client, _) = client(Some(vec![SsrCookie::new("k", r#"{"x":1}"#)]));
        let store = client.get_or_create_store("k", Point { x: 0 }, None).unwrap();
        assert_eq!(store.get_initial_item(), Point { x: 1 });
    }

    #[test]
    fn invalid_ssr_json_falls_back_to_default() {
        let (client, sink) = client(Some(vec![SsrCookie::new("k", "not-json")]));
        let store = client.get_or_create_store("k", "fallback".to_string(), None).unwrap();
        assert_eq!(store.get_initial_item(), "fallback");
        assert_eq!(sink.diagnostics().len(), 1);
    }

    #[test]
    fn missing_ssr_cookie_falls_back_to_default() {
        let (client, _) = client(Some(vec![SsrCookie::new("other", r#""val""#)]));
        let store = client.get_or_create_store("missing", "fallback".to_string(), None).unwrap();
        assert_eq!(store.get_initial_item(), "fallback");
    }

    #[test]
    fn works_without_ssr_cookies() {
        let (client, _) = client(None);
        let store = client.get_or_create_store("k", "default".to_string(), None).unwrap();
        assert_eq!(store.get_initial_item(), "default");
        assert!(client.ssr_cookies().is_empty());
    }

    #[test]
    fn options_default_to_config_and_first_request_wins() {
        let (client, _) = client(None);
        let first = client
            .get_or_create_store("k", 0u8, Some(CookieOptions::new().max_age(60)))
            .unwrap();
        assert_eq!(first.options().path.as_deref(), Some("/"));
        assert_eq!(first.options().max_age, Some(60));

        let second = client
            .get_or_create_store("k", 0u8, Some(CookieOptions::new().max_age(1)))
            .unwrap();
        assert_eq!(second.options().max_age, Some(60));
    }

    #[test]
    fn different_item_type_for_same_key_is_rejected() {
        let (client, _) = client(None);
        let _ = client.get_or_create_store("k", 0u32, None).unwrap();
        let err = client
            .get_or_create_store("k", "text".to_string(), None)
            .err()
            .expect("type mismatch");
        assert!(matches!(err, SyncedStorageError::TypeMismatch { ref key } if key == "cookie:k"));
    }

    #[test]
    fn scenario_count() {
        let (client, _) = client(None);
        let store = client.get_or_create_store("count", 0i64, None).unwrap();
        assert_eq!(store.get_initial_item(), 0);
        store.set_item(5);
        assert_eq!(store.get_item(), 5);
        store.remove_item();
        assert_eq!(store.get_item(), 0);
    }
}
