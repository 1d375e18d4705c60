//! Providers publish clients to the hooks created inside them.
//!
//! A provider owns its clients and exposes them through a scoped, per-thread
//! context: everything run inside [`CookieClientProvider::provide`] (or
//! [`SyncedStorageProvider::provide`]) sees the provider's clients, and the
//! innermost provider wins when they nest.
//!
//! Clients are created once and kept across [`rerender`](CookieClientProvider::rerender)
//! calls that pass the same server cookie snapshot (`Arc` identity). A new
//! snapshot builds new clients.
//!
//! ```
//! use std::sync::Arc;
//! use synced_storage::cookies::SsrCookie;
//! use synced_storage::hooks::use_cookie_state;
//! use synced_storage::provider::CookieClientProvider;
//!
//! let ssr: Arc<[SsrCookie]> = SsrCookie::parse_cookie_header("theme=%22dark%22").into();
//! let provider = CookieClientProvider::new(Some(ssr));
//! let theme = provider.provide(|| use_cookie_state("theme", "light".to_string(), None));
//! assert_eq!(theme.value(), "dark");
//! ```

use crate::config::ClientConfig;
use crate::cookies::{CookieClient, SsrCookies};
use crate::services::ClientServices;
use crate::storage::StorageClient;
use std::cell::RefCell;
use std::sync::Arc;

/// What a [`CookieClientProvider`] publishes.
#[derive(Debug, Clone)]
pub struct CookieClientContext {
    pub client: Arc<CookieClient>,
}

/// What a [`SyncedStorageProvider`] publishes.
#[derive(Debug, Clone)]
pub struct SyncedStorageContext {
    pub cookie_client: Arc<CookieClient>,
    pub storage_client: Arc<StorageClient>,
}

thread_local! {
    static COOKIE_CONTEXT: RefCell<Vec<CookieClientContext>> = const { RefCell::new(Vec::new()) };
    static SYNCED_CONTEXT: RefCell<Vec<SyncedStorageContext>> = const { RefCell::new(Vec::new()) };
}

/// Innermost [`CookieClientProvider`] context on this thread.
pub fn cookie_client_context() -> Option<CookieClientContext> {
    COOKIE_CONTEXT.with(|stack| stack.borrow().last().cloned())
}

/// Innermost [`SyncedStorageProvider`] context on this thread.
pub fn synced_storage_context() -> Option<SyncedStorageContext> {
    SYNCED_CONTEXT.with(|stack| stack.borrow().last().cloned())
}

/// Runs `f` with `value` pushed on `stack`, popping it even if `f` panics.
fn scoped<C, F, R>(stack: &'static std::thread::LocalKey<RefCell<Vec<C>>>, value: C, f: F) -> R
where
    F: FnOnce() -> R,
{
    stack.with(|s| s.borrow_mut().push(value));

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    stack.with(|s| {
        s.borrow_mut().pop();
    });

    match result {
        Ok(r) => r,
        Err(e) => std::panic::resume_unwind(e),
    }
}

fn same_snapshot(a: &Option<SsrCookies>, b: &Option<SsrCookies>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// Provides a [`CookieClient`] to [`use_cookie_state`](crate::hooks::use_cookie_state).
#[derive(Debug)]
pub struct CookieClientProvider {
    ssr_cookies: Option<SsrCookies>,
    config: Arc<ClientConfig>,
    services: ClientServices,
    client: Arc<CookieClient>,
}

impl CookieClientProvider {
    /// Provider with the default configuration and in-memory services.
    pub fn new(ssr_cookies: Option<SsrCookies>) -> Self {
        Self::with_services(ssr_cookies, Arc::new(ClientConfig::default()), ClientServices::default())
    }

    pub fn with_services(
        ssr_cookies: Option<SsrCookies>,
        config: Arc<ClientConfig>,
        services: ClientServices,
    ) -> Self {
        let client = Arc::new(CookieClient::new(ssr_cookies.clone(), config.clone(), &services));
        Self {
            ssr_cookies,
            config,
            services,
            client,
        }
    }

    /// Re-renders with `ssr_cookies`. Returns `true` when the snapshot
    /// changed and the client was rebuilt.
    pub fn rerender(&mut self, ssr_cookies: Option<SsrCookies>) -> bool {
        if same_snapshot(&self.ssr_cookies, &ssr_cookies) {
            return false;
        }

        log::debug!("CookieClientProvider: server cookies changed, rebuilding client");
        self.client = Arc::new(CookieClient::new(ssr_cookies.clone(), self.config.clone(), &self.services));
        self.ssr_cookies = ssr_cookies;
        true
    }

    pub fn client(&self) -> &Arc<CookieClient> {
        &self.client
    }

    pub fn context(&self) -> CookieClientContext {
        CookieClientContext {
            client: self.client.clone(),
        }
    }

    /// Runs `children` with this provider's client in context.
    pub fn provide<R>(&self, children: impl FnOnce() -> R) -> R {
        scoped(&COOKIE_CONTEXT, self.context(), children)
    }
}

/// Provides a [`CookieClient`] and a [`StorageClient`] to
/// [`use_storage_state`](crate::hooks::use_storage_state).
#[derive(Debug)]
pub struct SyncedStorageProvider {
    ssr_cookies: Option<SsrCookies>,
    config: Arc<ClientConfig>,
    services: ClientServices,
    cookie_client: Arc<CookieClient>,
    storage_client: Arc<StorageClient>,
}

impl SyncedStorageProvider {
    /// Provider with the default configuration and in-memory services.
    pub fn new(ssr_cookies: Option<SsrCookies>) -> Self {
        Self::with_services(ssr_cookies, Arc::new(ClientConfig::default()), ClientServices::default())
    }

    pub fn with_services(
        ssr_cookies: Option<SsrCookies>,
        config: Arc<ClientConfig>,
        services: ClientServices,
    ) -> Self {
        let (cookie_client, storage_client) = Self::build(&ssr_cookies, &config, &services);
        Self {
            ssr_cookies,
            config,
            services,
            cookie_client,
            storage_client,
        }
    }

    fn build(
        ssr_cookies: &Option<SsrCookies>,
        config: &Arc<ClientConfig>,
        services: &ClientServices,
    ) -> (Arc<CookieClient>, Arc<StorageClient>) {
        (
            Arc::new(CookieClient::new(ssr_cookies.clone(), config.clone(), services)),
            Arc::new(StorageClient::new(config.clone(), services)),
        )
    }

    /// Re-renders with `ssr_cookies`. Returns `true` when the snapshot
    /// changed and both clients were rebuilt.
    pub fn rerender(&mut self, ssr_cookies: Option<SsrCookies>) -> bool {
        if same_snapshot(&self.ssr_cookies, &ssr_cookies) {
            return false;
        }

        log::debug!("SyncedStorageProvider: server cookies changed, rebuilding clients");
        let (cookie_client, storage_client) = Self::build(&ssr_cookies, &self.config, &self.services);
        self.cookie_client = cookie_client;
        self.storage_client = storage_client;
        self.ssr_cookies = ssr_cookies;
        true
    }

    pub fn cookie_client(&self) -> &Arc<CookieClient> {
        &self.cookie_client
    }

    pub fn storage_client(&self) -> &Arc<StorageClient> {
        &self.storage_client
    }

    pub fn context(&self) -> SyncedStorageContext {
        SyncedStorageContext {
            cookie_client: self.cookie_client.clone(),
            storage_client: self.storage_client.clone(),
        }
    }

    /// Runs `children` with this provider's clients in context.
    pub fn provide<R>(&self, children: impl FnOnce() -> R) -> R {
        scoped(&SYNCED_CONTEXT, self.context(), children)
    }
}
