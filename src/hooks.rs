//! Per-consumer adapters between a store and a piece of displayed state.
//!
//! Each hook binds one consumer to the shared store of its key, mirrors the
//! store's item into a local value and counts the visible changes. Equal
//! values (`PartialEq`) are not shown twice.
//!
//! `use_*` resolve their client from the enclosing provider and panic without
//! one; `try_use_*` return [`SyncedStorageError::MissingProvider`](crate::errors::SyncedStorageError)
//! instead; `CookieState::new` and `StorageState::new` take the client
//! explicitly.

pub mod state;
pub mod use_cookie_state;
pub mod use_storage_state;

pub use state::RenderCallback;
pub use use_cookie_state::{try_use_cookie_state, use_cookie_state, CookieState};
pub use use_storage_state::{try_use_storage_state, use_storage_state, StorageState};
