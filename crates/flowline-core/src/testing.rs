//! Recording collaborators for unit tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::StepError;
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::notify::{Notification, Notifier};
use crate::services::Services;
use crate::store::InMemoryDocumentStore;

/// HTTP client that records requests and replies with a canned response.
pub(crate) struct RecordingHttpClient {
    pub requests: Mutex<Vec<HttpRequest>>,
    status: u16,
    body: String,
}

impl RecordingHttpClient {
    pub fn responding(status: u16, body: &str) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            status,
            body: body.to_string(),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for RecordingHttpClient {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, StepError> {
        self.requests.lock().unwrap().push(request);
        Ok(HttpResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

/// Notifier that records deliveries, optionally failing them.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), StepError> {
        if self.fail {
            return Err(StepError::Notification("smtp unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Services over an in-memory store plus recording HTTP and notifier.
pub(crate) fn services(
    http: Arc<RecordingHttpClient>,
) -> (Services, Arc<InMemoryDocumentStore>, Arc<RecordingNotifier>) {
    let store = Arc::new(InMemoryDocumentStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let services = Services::new(store.clone(), http, notifier.clone());
    (services, store, notifier)
}
