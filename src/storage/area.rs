use super::types::DocumentId;
use anyhow::Result;
use std::sync::Arc;

/// Object-safe key/value storage area (DOM's Storage).
pub trait StorageArea: Send + Sync {
    /// Retrieves the value associated with the given key, or `None` if not found.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Sets the value for the given key, overwriting any existing value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the item with the given key.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Clears all items in the storage area.
    fn clear(&self) -> Result<()>;

    /// Returns the number of items in the storage area.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns all keys in the storage area.
    fn keys(&self) -> Vec<String>;
}

/// Store for sessionStorage-like areas, isolated per document.
pub trait SessionStore: Send + Sync {
    /// Retrieves the session area of `document`, creating it when missing.
    fn area(&self, document: DocumentId) -> Arc<dyn StorageArea>;

    /// Drops all session storage of `document`.
    fn drop_document(&self, document: DocumentId);
}
