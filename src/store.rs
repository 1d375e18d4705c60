//! The store contract shared by the cookie and Web Storage backends.

use crate::listeners::{Listener, Unsubscriber};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Bounds every stored item satisfies.
pub trait Item: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Item for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Backing persistence mechanism of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Cookie,
    LocalStorage,
    SessionStorage,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Cookie => "cookie",
            Strategy::LocalStorage => "localStorage",
            Strategy::SessionStorage => "sessionStorage",
        }
    }

    /// Registry key of `key` under this strategy, e.g. `localStorage:theme`.
    pub fn composite_key(&self, key: &str) -> String {
        format!("{}:{}", self.as_str(), key)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synchronized state for one key.
///
/// Implementations cache the last known item, persist writes to their backing
/// primitive and notify subscribers synchronously. None of the operations
/// panic or return errors; failures go to the store's diagnostic sink.
pub trait Store<T: Item>: Send + Sync {
    /// Current item: the cache, else the decoded persisted value, else the default.
    fn get_item(&self) -> T;

    /// Item known at construction time (server seed), else the default.
    fn get_initial_item(&self) -> T;

    /// Persists `item` and notifies subscribers. Items that cannot be encoded
    /// are dropped without touching the persisted value.
    fn set_item(&self, item: T);

    /// Clears the persisted value and notifies subscribers.
    fn remove_item(&self);

    /// Registers `listener` for every change of this key, local or external.
    fn subscribe(&self, listener: Listener) -> Unsubscriber;

    fn key(&self) -> &str;

    fn strategy(&self) -> Strategy;
}
