//! Fire-and-forget forwarding of captured calls to the ingest endpoint
//!
//! Captures are handed to a background task over an unbounded channel, so
//! `forward` never waits on the network. The task posts with the raw
//! (untracked) transport and drops whatever fails.

use bytes::Bytes;
use devtools_proto::CapturedRequest;
use http::{header, Method, Request, Uri};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::transport::HttpTransport;

#[derive(Debug, thiserror::Error)]
enum ForwardError {
    #[error("Failed to serialize capture: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to build ingest request: {0}")]
    Build(#[from] http::Error),

    #[error("Ingest request failed: {0}")]
    Transport(String),

    #[error("Ingest endpoint answered {0}")]
    Rejected(http::StatusCode),
}

/// Handle for enqueueing captures to one background task
pub struct Forwarder {
    tx: mpsc::UnboundedSender<CapturedRequest>,
    task: JoinHandle<()>,
}

impl Forwarder {
    /// Spawn the forwarding task on the current tokio runtime
    pub fn spawn<T>(transport: Arc<T>, ingest_url: Uri) -> Self
    where
        T: HttpTransport + ?Sized + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<CapturedRequest>();

        let task = tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if let Err(e) = post_entry(transport.as_ref(), &ingest_url, &entry).await {
                    debug!("Dropping forwarded capture {}: {}", entry.id, e);
                }
            }
            debug!("Capture forwarder stopped");
        });

        Self { tx, task }
    }

    /// Enqueue a capture without waiting
    pub fn forward(&self, entry: CapturedRequest) {
        if self.tx.send(entry).is_err() {
            debug!("Capture forwarder is gone, capture not forwarded");
        }
    }

    /// Stop accepting captures and wait until the queued ones were posted
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            debug!("Capture forwarder task failed: {}", e);
        }
    }
}

async fn post_entry<T>(
    transport: &T,
    ingest_url: &Uri,
    entry: &CapturedRequest,
) -> Result<(), ForwardError>
where
    T: HttpTransport + ?Sized,
{
    let body = serde_json::to_vec(entry)?;
    let request = Request::builder()
        .method(Method::POST)
        .uri(ingest_url.clone())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Bytes::from(body))?;

    let response = transport
        .send(request)
        .await
        .map_err(|e| ForwardError::Transport(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ForwardError::Rejected(response.status()));
    }

    Ok(())
}
