//! Process-wide capture collections

use devtools_proto::{
    Annotation, CapturedRequest, ExportSnapshot, RequestsSnapshot, ServerCapturedRequest,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::events::DevtoolsEvent;

/// Capacity of the live update channel; slow subscribers see `Lagged`
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
pub(crate) struct Collections {
    pub(crate) client: Vec<CapturedRequest>,
    pub(crate) server: Vec<ServerCapturedRequest>,
    pub(crate) annotations: Vec<Annotation>,
}

/// Collection sizes at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub client: usize,
    pub server: usize,
    pub annotations: usize,
}

/// Shared handle to the three capture collections
///
/// One lock guards all three collections, so `clear` and `snapshot` never
/// observe a half-cleared state. The lock is only ever held for a single
/// push/replace/clone and never across an `.await`.
#[derive(Clone)]
pub struct DevtoolsStore {
    pub(crate) inner: Arc<RwLock<Collections>>,
    update_tx: broadcast::Sender<DevtoolsEvent>,
}

impl DevtoolsStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (update_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(RwLock::new(Collections::default())),
            update_tx,
        }
    }

    /// Subscribe to live mutation events
    pub fn subscribe(&self) -> broadcast::Receiver<DevtoolsEvent> {
        self.update_tx.subscribe()
    }

    pub(crate) fn publish(&self, event: DevtoolsEvent) {
        // No subscribers is the normal case
        let _ = self.update_tx.send(event);
    }

    /// Append a freshly captured client request
    pub fn record_client(&self, request: CapturedRequest) {
        self.inner.write().client.push(request.clone());
        self.publish(DevtoolsEvent::ClientRequest { request });
    }

    /// Store a client request received over the ingest endpoint
    ///
    /// A repeated id (a retried forward) replaces the earlier entry in place.
    pub fn ingest_client(&self, request: CapturedRequest) {
        {
            let mut collections = self.inner.write();
            match collections.client.iter_mut().find(|r| r.id == request.id) {
                Some(existing) => {
                    debug!("Replacing client request {} on re-ingest", request.id);
                    *existing = request.clone();
                }
                None => collections.client.push(request.clone()),
            }
        }
        self.publish(DevtoolsEvent::ClientRequest { request });
    }

    /// Append a server request whose response has finished
    pub fn record_server(&self, request: ServerCapturedRequest) {
        self.inner.write().server.push(request.clone());
        self.publish(DevtoolsEvent::ServerRequest { request });
    }

    pub fn client_requests(&self) -> Vec<CapturedRequest> {
        self.inner.read().client.clone()
    }

    pub fn server_requests(&self) -> Vec<ServerCapturedRequest> {
        self.inner.read().server.clone()
    }

    /// Both request collections from one consistent read
    pub fn requests(&self) -> RequestsSnapshot {
        let collections = self.inner.read();
        RequestsSnapshot {
            client: collections.client.clone(),
            server: collections.server.clone(),
        }
    }

    /// Structured export of everything captured so far
    pub fn snapshot(&self) -> ExportSnapshot {
        let (requests, annotations) = {
            let collections = self.inner.read();
            (
                RequestsSnapshot {
                    client: collections.client.clone(),
                    server: collections.server.clone(),
                },
                collections.annotations.clone(),
            )
        };
        ExportSnapshot::new(requests, annotations)
    }

    pub fn counts(&self) -> StoreCounts {
        let collections = self.inner.read();
        StoreCounts {
            client: collections.client.len(),
            server: collections.server.len(),
            annotations: collections.annotations.len(),
        }
    }

    /// Empty all three collections in one step
    pub fn clear(&self) {
        {
            let mut collections = self.inner.write();
            collections.client.clear();
            collections.server.clear();
            collections.annotations.clear();
        }
        self.publish(DevtoolsEvent::Cleared);
    }
}

impl Default for DevtoolsStore {
    fn default() -> Self {
        Self::new()
    }
}
