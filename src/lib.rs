//! Synchronized key/value state backed by cookies or Web Storage.
//!
//! The core is a small store abstraction. A [`Store`] keeps one key's item
//! cached and persists writes to its backing primitive. Every change is
//! pushed to the store's subscribers, so all consumers of a key agree on its
//! value.
//!
//! - [`cookies`]: cookie-backed stores, seeded from the cookies seen at
//!   server-render time.
//! - [`storage`]: localStorage / sessionStorage backed stores, with optional
//!   expiry and cross-document notification.
//! - [`provider`] and [`hooks`]: the consumer-facing layer. A provider owns
//!   the clients; a hook mirrors one store into a displayed value.
//!
//! The browser primitives (cookie jar, storage areas, the `storage` event bus
//! and timers) are injected through [`ClientServices`], with in-memory
//! implementations bundled.

pub mod codec;
pub mod config;
pub mod cookies;
pub mod diagnostics;
pub mod errors;
pub mod hooks;
pub mod listeners;
pub mod provider;
pub mod scheduler;
pub mod services;
pub mod storage;
pub mod store;

pub use codec::SetStateAction;
pub use config::{ClientConfig, ClientConfigBuilder, ConfigError};
pub use cookies::{CookieClient, CookieOptions, CookieStore, SsrCookie};
pub use diagnostics::{Diagnostic, DiagnosticSink, LogSink, RecordingSink};
pub use errors::SyncedStorageError;
pub use hooks::{use_cookie_state, use_storage_state, CookieState, StorageState};
pub use listeners::{Listener, Unsubscriber};
pub use provider::{CookieClientProvider, SyncedStorageProvider};
pub use scheduler::{ManualScheduler, Scheduler, TokioScheduler};
pub use services::ClientServices;
pub use storage::{StorageClient, StorageOption, StorageScope, StorageStore};
pub use store::{Item, Store, Strategy};
