use super::area::{SessionStore, StorageArea};
use super::bus::StorageBus;
use super::event::{StorageEvent, StorageScope};
use super::local::in_memory::InMemoryLocalArea;
use super::session::in_memory::InMemorySessionStore;
use super::types::DocumentId;
use anyhow::Result;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Buses = Arc<Mutex<HashMap<DocumentId, Weak<StorageBus>>>>;

/// Storage shared by every document of one origin.
///
/// The local area is shared; each document gets its own session area and its
/// own [`StorageBus`]. A write made through one document's local area is
/// published to the buses of all *other* documents, like the browser's
/// cross-tab `storage` event.
#[derive(Clone)]
pub struct StorageService {
    local: Arc<dyn StorageArea>,
    session: Arc<dyn SessionStore>,
    buses: Buses,
}

impl Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("documents", &self.document_count())
            .finish_non_exhaustive()
    }
}

impl StorageService {
    pub fn new(local: Arc<dyn StorageArea>, session: Arc<dyn SessionStore>) -> Self {
        Self {
            local,
            session,
            buses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Service with in-memory local and session storage.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryLocalArea::new()),
            Arc::new(InMemorySessionStore::new()),
        )
    }

    /// Attaches a new document.
    pub fn open_document(&self) -> DocumentStorage {
        let id = DocumentId::new();
        let bus = Arc::new(StorageBus::new());

        self.buses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::downgrade(&bus));

        let local = self.wrap_notifying(self.local.clone(), id, StorageScope::Local);
        let session = self.wrap_notifying(self.session.area(id), id, StorageScope::Session);

        log::debug!("StorageService: opened document {id}");

        DocumentStorage {
            id,
            local,
            session,
            bus,
            service: self.clone(),
        }
    }

    /// Number of documents currently attached.
    pub fn document_count(&self) -> usize {
        self.buses.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn close_document(&self, id: DocumentId) {
        self.buses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        self.session.drop_document(id);
        log::debug!("StorageService: closed document {id}");
    }

    fn wrap_notifying(
        &self,
        inner: Arc<dyn StorageArea>,
        source: DocumentId,
        scope: StorageScope,
    ) -> Arc<dyn StorageArea> {
        Arc::new(NotifyingArea {
            inner,
            source,
            scope,
            buses: self.buses.clone(),
        })
    }
}

/// The storage view of one document: its local and session areas and its bus.
///
/// Dropping it detaches the document and discards its session storage.
pub struct DocumentStorage {
    id: DocumentId,
    local: Arc<dyn StorageArea>,
    session: Arc<dyn StorageArea>,
    bus: Arc<StorageBus>,
    service: StorageService,
}

impl DocumentStorage {
    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn local(&self) -> &Arc<dyn StorageArea> {
        &self.local
    }

    pub fn session(&self) -> &Arc<dyn StorageArea> {
        &self.session
    }

    pub fn area(&self, scope: StorageScope) -> &Arc<dyn StorageArea> {
        match scope {
            StorageScope::Local => &self.local,
            StorageScope::Session => &self.session,
        }
    }

    pub fn bus(&self) -> &Arc<StorageBus> {
        &self.bus
    }
}

impl Debug for DocumentStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStorage")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Drop for DocumentStorage {
    fn drop(&mut self) {
        self.service.close_document(self.id);
    }
}

/// Area wrapper publishing every successful mutation to the other documents.
struct NotifyingArea {
    inner: Arc<dyn StorageArea>,
    source: DocumentId,
    scope: StorageScope,
    buses: Buses,
}

impl NotifyingArea {
    fn publish(&self, ev: StorageEvent) {
        // Session areas are private to their document.
        if self.scope == StorageScope::Session {
            return;
        }

        let targets: Vec<Arc<StorageBus>> = self
            .buses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(id, _)| **id != self.source)
            .filter_map(|(_, bus)| bus.upgrade())
            .collect();

        for bus in targets {
            bus.dispatch(&ev);
        }
    }
}

impl StorageArea for NotifyingArea {
    fn get_item(&self, key: &str) -> Option<String> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let old = self.inner.get_item(key);
        self.inner.set_item(key, value)?;
        self.publish(StorageEvent::changed(
            self.scope,
            self.source,
            key,
            old,
            Some(value.to_string()),
        ));
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let old = self.inner.get_item(key);
        self.inner.remove_item(key)?;
        self.publish(StorageEvent::changed(self.scope, self.source, key, old, None));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.inner.clear()?;
        self.publish(StorageEvent::cleared(self.scope, self.source));
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}
