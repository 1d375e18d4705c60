//! Runtime collaborators shared by the clients of one provider.

use crate::cookies::{CookieJarHandle, InMemoryCookieJar};
use crate::diagnostics::{DiagnosticSink, LogSink};
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::storage::{DocumentStorage, StorageService};
use std::fmt;
use std::sync::Arc;

/// The injected primitives the clients persist through.
///
/// Cloning shares every handle.
#[derive(Clone)]
pub struct ClientServices {
    /// Cookies of the document.
    pub cookie_jar: CookieJarHandle,
    /// Local and session storage of the document.
    pub storage: Arc<DocumentStorage>,
    /// Clock and timers for store expiry.
    pub scheduler: Arc<dyn Scheduler>,
    /// Receiver of dropped writes and unreadable values.
    pub diagnostics: Arc<dyn DiagnosticSink>,
}

impl ClientServices {
    pub fn new(
        cookie_jar: CookieJarHandle,
        storage: Arc<DocumentStorage>,
        scheduler: Arc<dyn Scheduler>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            cookie_jar,
            storage,
            scheduler,
            diagnostics,
        }
    }

    /// In-memory cookies and storage on a fresh document, tokio timers, and
    /// diagnostics sent to the log.
    pub fn in_memory() -> Self {
        Self::new(
            InMemoryCookieJar::new().into_handle(),
            Arc::new(StorageService::in_memory().open_document()),
            Arc::new(TokioScheduler::new()),
            Arc::new(LogSink),
        )
    }

    pub fn with_cookie_jar(mut self, jar: CookieJarHandle) -> Self {
        self.cookie_jar = jar;
        self
    }

    pub fn with_storage(mut self, storage: Arc<DocumentStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl Default for ClientServices {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for ClientServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientServices")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::{CookieJar, CookieOptions};
    use crate::storage::StorageArea;
    use crate::scheduler::ManualScheduler;

    #[test]
    fn clones_share_primitives() {
        let services = ClientServices::in_memory();
        let clone = services.clone();

        services.cookie_jar.set("k", "v", &CookieOptions::default()).unwrap();
        assert_eq!(clone.cookie_jar.get("k").as_deref(), Some("v"));
        assert_eq!(services.storage.id(), clone.storage.id());
    }

    #[test]
    fn documents_of_one_service_share_local_storage() {
        let service = StorageService::in_memory();
        let tab_a = ClientServices::in_memory().with_storage(Arc::new(service.open_document()));
        let tab_b = ClientServices::in_memory().with_storage(Arc::new(service.open_document()));

        tab_a.storage.local().set_item("k", "1").unwrap();
        assert_eq!(tab_b.storage.local().get_item("k").as_deref(), Some("1"));
        assert_ne!(tab_a.storage.id(), tab_b.storage.id());
    }

    #[test]
    fn with_scheduler_replaces_clock() {
        let manual = Arc::new(ManualScheduler::default());
        let services = ClientServices::in_memory().with_scheduler(manual.clone());
        assert_eq!(services.scheduler.now(), manual.now());
    }
}
