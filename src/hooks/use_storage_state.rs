use crate::codec::SetStateAction;
use crate::errors::SyncedStorageError;
use crate::hooks::state::{Mirrored, RenderCallback};
use crate::provider::synced_storage_context;
use crate::storage::{StorageClient, StorageOption, StorageStore};
use crate::store::{Item, Store};
use std::fmt;
use std::sync::Arc;

/// Web Storage backed state of one consumer.
///
/// Starts from the default value (storage is not visible at server-render
/// time), then reads the persisted value right after subscribing.
pub struct StorageState<T: Item + PartialEq> {
    inner: Mirrored<T, StorageStore<T>>,
}

impl<T: Item + PartialEq> StorageState<T> {
    /// Binds to the store for `key` on `client`.
    pub fn new(
        client: &StorageClient,
        key: &str,
        default_value: T,
        option: Option<StorageOption>,
    ) -> Result<Self, SyncedStorageError> {
        let store = client.get_or_create_store(key, default_value, option)?;
        let inner = Mirrored::new(store);
        inner.resync();
        Ok(Self { inner })
    }

    /// The value currently shown.
    pub fn value(&self) -> T {
        self.inner.value()
    }

    /// Persists the value `action` yields. An updater receives the store's
    /// current item; the shown value follows through the subscription.
    pub fn set(&self, action: impl Into<SetStateAction<T>>) {
        let store = self.inner.store();
        let next = action.into().resolve(&store.get_item());
        store.set_item(next);
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

    /// Removes the persisted value; the value falls back to the default.
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

    pub fn store(&self) -> &Arc<StorageStore<T>> {
        self.inner.store()
    }
}

impl<T: Item + PartialEq + fmt::Debug> fmt::Debug for StorageState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StorageState").field(&self.inner).finish()
    }
}

/// Storage state for `key` from the enclosing [`SyncedStorageProvider`](crate::provider::SyncedStorageProvider).
///
/// # Panics
/// Panics when called outside a `SyncedStorageProvider`, or when `key` is
/// already bound to a different item type.
pub fn use_storage_state<T: Item + PartialEq>(
    key: &str,
    default_value: T,
    option: Option<StorageOption>,
) -> StorageState<T> {
    try_use_storage_state(key, default_value, option).unwrap_or_else(|e| panic!("{e}"))
}

/// Like [`use_storage_state`], returning the misuse as an error.
pub fn try_use_storage_state<T: Item + PartialEq>(
    key: &str,
    default_value: T,
    option: Option<StorageOption>,
) -> Result<StorageState<T>, SyncedStorageError> {
    let context = synced_storage_context().ok_or(SyncedStorageError::MissingProvider {
        hook: "use_storage_state",
        provider: "SyncedStorageProvider",
    })?;
    StorageState::new(&context.storage_client, key, default_value, option)
}
