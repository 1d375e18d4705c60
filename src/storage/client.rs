use crate::config::ClientConfig;
use crate::diagnostics::DiagnosticSink;
use crate::errors::SyncedStorageError;
use crate::scheduler::Scheduler;
use crate::services::ClientServices;
use crate::storage::option::StorageOption;
use crate::storage::service::DocumentStorage;
use crate::storage::store::StorageStore;
use crate::store::Item;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Registry of Web Storage backed stores, one per `(scope, key)`.
pub struct StorageClient {
    document: Arc<DocumentStorage>,
    scheduler: Arc<dyn Scheduler>,
    diagnostics: Arc<dyn DiagnosticSink>,
    config: Arc<ClientConfig>,
    stores: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl StorageClient {
    pub fn new(config: Arc<ClientConfig>, services: &ClientServices) -> Self {
        Self {
            document: services.storage.clone(),
            scheduler: services.scheduler.clone(),
            diagnostics: services.diagnostics.clone(),
            config,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the store for `key`, creating it on first request.
    ///
    /// Without `option`, the store lives in the configured default scope and
    /// never expires. The same key in local and session storage gives two
    /// independent stores. An expiry only applies to the request creating
    /// the store.
    pub fn get_or_create_store<T: Item>(
        &self,
        key: &str,
        default_item: T,
        option: Option<StorageOption>,
    ) -> Result<Arc<StorageStore<T>>, SyncedStorageError> {
        let option = option.unwrap_or_else(|| StorageOption::from(self.config.default_storage));
        let composite = option.scope().strategy().composite_key(key);
        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = stores.get(&composite) {
            return existing
                .clone()
                .downcast::<StorageStore<T>>()
                .map_err(|_| SyncedStorageError::TypeMismatch { key: composite });
        }

        let store = Arc::new(StorageStore::new(
            key,
            default_item,
            option,
            &self.document,
            self.scheduler.as_ref(),
            self.diagnostics.clone(),
        ));
        stores.insert(composite, store.clone());

        Ok(store)
    }

    /// The document this client reads and writes through.
    pub fn document(&self) -> &Arc<DocumentStorage> {
        &self.document
    }

    /// Number of stores created so far.
    pub fn len(&self) -> usize {
        self.stores.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageClient")
            .field("document", &self.document.id())
            .field("stores", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use crate::storage::{StorageArea, StorageScope};
    use crate::store::{Store, Strategy};
    use time::Duration;

    fn client_with(config: ClientConfig) -> (StorageClient, Arc<ManualScheduler>) {
        let scheduler = Arc::new(ManualScheduler::default());
        let services = ClientServices::in_memory().with_scheduler(scheduler.clone());
        (StorageClient::new(Arc::new(config), &services), scheduler)
    }

    fn client() -> StorageClient {
        client_with(ClientConfig::default()).0
    }

    #[test]
    fn same_key_and_strategy_returns_same_instance() {
        let client = client();
        let a = client.get_or_create_store("key", "default".to_string(), None).unwrap();
        let b = client
            .get_or_create_store("key", "default".to_string(), Some(StorageOption::local()))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn defaults_to_local_storage() {
        let client = client();
        let store = client.get_or_create_store("key", 0u8, None).unwrap();
        assert_eq!(store.strategy(), Strategy::LocalStorage);
    }

    #[test]
    fn local_and_session_stores_are_independent() {
        let client = client();
        let local = client.get_or_create_store("key", 0u8, Some(StorageOption::local())).unwrap();
        let session = client.get_or_create_store("key", 0u8, Some(StorageOption::session())).unwrap();
        assert!(!Arc::ptr_eq(&local, &session));
        assert_eq!(client.len(), 2);

        local.set_item(1);
        assert_eq!(session.get_item(), 0);
    }

    #[test]
    fn different_keys_yield_different_stores() {
        let client = client();
        let a = client.get_or_create_store("a", 0u8, None).unwrap();
        let b = client.get_or_create_store("b", 0u8, None).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn configured_default_scope_is_used() {
        let (client, _) = client_with(
            ClientConfig::builder()
                .default_storage(StorageScope::Session)
                .build()
                .unwrap(),
        );
        let store = client.get_or_create_store("key", 0u8, None).unwrap();
        assert_eq!(store.scope(), StorageScope::Session);
    }

    #[test]
    fn first_request_wins_on_expiry() {
        let (client, scheduler) = client_with(ClientConfig::default());
        let at = scheduler.now() + Duration::seconds(3);
        let first = client
            .get_or_create_store("key", 0u8, Some(StorageOption::local().expires(at)))
            .unwrap();
        let second = client.get_or_create_store("key", 0u8, Some(StorageOption::local())).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.expires(), Some(at));
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn type_mismatch_is_reported() {
        let client = client();
        let _ = client.get_or_create_store("key", 0u8, None).unwrap();
        let err = client.get_or_create_store("key", "x".to_string(), None).err();
        assert!(matches!(
            err,
            Some(SyncedStorageError::TypeMismatch { ref key }) if key == "localStorage:key"
        ));
    }

    #[test]
    fn scenario_theme_persists_across_clients_of_one_document() {
        let services = ClientServices::in_memory().with_scheduler(Arc::new(ManualScheduler::default()));
        let config = Arc::new(ClientConfig::default());
        let first = StorageClient::new(config.clone(), &services);
        let second = StorageClient::new(config, &services);

        first
            .get_or_create_store("theme", "light".to_string(), None)
            .unwrap()
            .set_item("dark".to_string());

        let store = second.get_or_create_store("theme", "light".to_string(), None).unwrap();
        assert_eq!(store.get_item(), "dark");
        assert_eq!(services.storage.local().get_item("theme").as_deref(), Some(r#""dark""#));
    }
}
