use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use anyhow::Result;

use crate::storage::area::{SessionStore, StorageArea};
use crate::storage::types::DocumentId;

type Areas = Arc<RwLock<HashMap<DocumentId, HashMap<String, String>>>>;

/// In-memory session storage, one map per document.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    data: Areas,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents holding a session area.
    pub fn document_count(&self) -> usize {
        self.data.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl SessionStore for InMemorySessionStore {
    fn area(&self, document: DocumentId) -> Arc<dyn StorageArea> {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(document)
            .or_default();

        Arc::new(SessionArea {
            data: Arc::clone(&self.data),
            document,
        })
    }

    fn drop_document(&self, document: DocumentId) {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&document);
    }
}

struct SessionArea {
    data: Areas,
    document: DocumentId,
}

impl SessionArea {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<DocumentId, HashMap<String, String>>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<DocumentId, HashMap<String, String>>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageArea for SessionArea {
    fn get_item(&self, k: &str) -> Option<String> {
        self.read().get(&self.document).and_then(|m| m.get(k).cloned())
    }

    fn set_item(&self, k: &str, v: &str) -> Result<()> {
        self.write()
            .entry(self.document)
            .or_default()
            .insert(k.to_string(), v.to_string());
        Ok(())
    }

    fn remove_item(&self, k: &str) -> Result<()> {
        if let Some(m) = self.write().get_mut(&self.document) {
            m.remove(k);
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.write().insert(self.document, HashMap::new());
        Ok(())
    }

    fn len(&self) -> usize {
        self.read().get(&self.document).map(|m| m.len()).unwrap_or(0)
    }

    fn keys(&self) -> Vec<String> {
        self.read()
            .get(&self.document)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_are_isolated() {
        let store = InMemorySessionStore::new();
        let a = store.area(DocumentId::new());
        let b = store.area(DocumentId::new());

        a.set_item("k", "v").unwrap();
        assert_eq!(a.get_item("k").as_deref(), Some("v"));
        assert!(b.get_item("k").is_none());
    }

    #[test]
    fn same_document_shares_area() {
        let store = InMemorySessionStore::new();
        let doc = DocumentId::new();
        store.area(doc).set_item("k", "v").unwrap();
        assert_eq!(store.area(doc).get_item("k").as_deref(), Some("v"));
    }

    #[test]
    fn drop_document_forgets_its_area() {
        let store = InMemorySessionStore::new();
        let doc = DocumentId::new();
        let area = store.area(doc);
        area.set_item("k", "v").unwrap();
        assert_eq!(store.document_count(), 1);

        store.drop_document(doc);
        assert_eq!(store.document_count(), 0);
        assert!(area.get_item("k").is_none());
        assert_eq!(area.len(), 0);
    }
}
