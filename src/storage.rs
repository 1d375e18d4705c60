//! Web Storage for synced stores.
//!
//! This module models the browser's **localStorage** and **sessionStorage**
//! as injected capabilities, and builds the Web Storage backed stores on top
//! of them.
//!
//! # Concepts
//!
//! - **Local storage** is shared by every document attached to one
//!   [`StorageService`].
//! - **Session storage** is private to one document, and discarded when the
//!   document's [`DocumentStorage`] is dropped. Backed by a [`SessionStore`].
//!
//! All areas implement the [`StorageArea`] trait (`get_item`, `set_item`,
//! `remove_item`, `clear`).
//!
//! Each document has a [`StorageBus`], its `window` as far as `storage` events
//! are concerned. Writes to the shared local area are published as
//! [`StorageEvent`]s on the buses of the other documents. A store synthesizes
//! the same event on its own document's bus for its own writes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use synced_storage::storage::{InMemoryLocalArea, InMemorySessionStore, StorageArea, StorageService};
//!
//! let service = StorageService::new(
//!     Arc::new(InMemoryLocalArea::new()),
//!     Arc::new(InMemorySessionStore::new()),
//! );
//! let a = service.open_document();
//! let b = service.open_document();
//! a.local().set_item("theme", "\"dark\"").unwrap();
//! assert_eq!(b.local().get_item("theme").as_deref(), Some("\"dark\""));
//! ```

/// Storage area traits.
pub mod area;
/// Per-document storage event dispatch.
pub mod bus;
/// Registry of Web Storage backed stores.
pub mod client;
/// Storage change events.
pub mod event;
/// Store options (scope and expiry).
pub mod option;
/// Local/session storage shared between documents.
pub mod service;
/// The Web Storage backed store.
pub mod store;
/// Storage types.
pub mod types;

/// Local storage implementations.
pub mod local {
    /// In-memory local storage implementation.
    pub mod in_memory;
}

/// Session storage implementations.
pub mod session {
    /// In-memory session storage implementation.
    pub mod in_memory;
}

pub use area::{SessionStore, StorageArea};
pub use bus::{StorageBus, StorageListener};
pub use client::StorageClient;
pub use event::{StorageEvent, StorageScope};
pub use local::in_memory::InMemoryLocalArea;
pub use option::StorageOption;
pub use service::{DocumentStorage, StorageService};
pub use session::in_memory::InMemorySessionStore;
pub use store::StorageStore;
pub use types::DocumentId;
