//! Collaborators shared by step handlers and tasks.

use std::sync::Arc;

use crate::http::{HttpClient, ReqwestHttpClient};
use crate::notify::{LogNotifier, Notifier};
use crate::store::{DocumentStore, InMemoryDocumentStore};

/// Handles to the external services a step may call.
///
/// Cloning is cheap; every handle is reference counted.
#[derive(Clone)]
pub struct Services {
    /// Document store for record steps, workflow and rule lookups.
    pub store: Arc<dyn DocumentStore>,

    /// HTTP transport for `apiCall` steps.
    pub http: Arc<dyn HttpClient>,

    /// Notification delivery.
    pub notifier: Arc<dyn Notifier>,
}

impl Services {
    /// Bundle the given collaborators.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        http: Arc<dyn HttpClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            http,
            notifier,
        }
    }

    /// Services backed by `store`, a default reqwest client and the log notifier.
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(
            store,
            Arc::new(ReqwestHttpClient::default()),
            Arc::new(LogNotifier),
        )
    }

    /// Replace the HTTP transport.
    pub fn with_http(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = http;
        self
    }

    /// Replace the notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::with_store(Arc::new(InMemoryDocumentStore::new()))
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
