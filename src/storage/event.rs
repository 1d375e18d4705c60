use super::types::DocumentId;
use crate::store::Strategy;

/// Which Web Storage area a key lives in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum StorageScope {
    #[default]
    Local,
    Session,
}

impl StorageScope {
    pub fn strategy(&self) -> Strategy {
        match self {
            StorageScope::Local => Strategy::LocalStorage,
            StorageScope::Session => Strategy::SessionStorage,
        }
    }
}

/// A change of one storage area, as seen on a document's [`StorageBus`](super::StorageBus).
///
/// `key` is `None` when the whole area was cleared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub scope: StorageScope,
    /// Document whose write caused the event.
    pub source: DocumentId,
}

impl StorageEvent {
    /// Event for a write of `key` made by `source`.
    pub fn changed<K: Into<String>>(
        scope: StorageScope,
        source: DocumentId,
        key: K,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            key: Some(key.into()),
            old_value,
            new_value,
            scope,
            source,
        }
    }

    /// Event for a cleared area.
    pub fn cleared(scope: StorageScope, source: DocumentId) -> Self {
        Self {
            key: None,
            old_value: None,
            new_value: None,
            scope,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_local_event() {
        let source = DocumentId::new();
        let ev = StorageEvent::changed(StorageScope::Local, source, "greeting", None, Some("hello".into()));

        assert_eq!(ev.key.as_deref(), Some("greeting"));
        assert_eq!(ev.old_value, None);
        assert_eq!(ev.new_value.as_deref(), Some("hello"));
        assert_eq!(ev.source, source);
        assert_eq!(ev.scope.strategy(), Strategy::LocalStorage);
    }

    #[test]
    fn cleared_event_has_no_key() {
        let ev = StorageEvent::cleared(StorageScope::Session, DocumentId::new());
        assert!(ev.key.is_none());
        assert!(ev.new_value.is_none());
        assert_eq!(ev.scope.strategy(), Strategy::SessionStorage);
    }

    #[test]
    fn default_scope_is_local() {
        assert_eq!(StorageScope::default(), StorageScope::Local);
    }
}
