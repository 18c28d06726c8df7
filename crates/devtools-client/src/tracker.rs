//! Tracking decorator for outbound calls
//!
//! Each tracked call keeps its capture state in a local [`PendingCall`] until
//! the wrapped transport settles, then records it with a single append. The
//! store is never touched across an `.await`, so concurrent calls land in
//! completion order.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use devtools_proto::{
    capture_timestamp, header_map, new_capture_id, CapturedRequest, HeaderMap,
    NETWORK_ERROR_TEXT, UNREADABLE_BODY, UNSERIALIZABLE_BODY,
};
use devtools_store::DevtoolsStore;
use http::{Request, Response};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

use crate::config::ClientConfig;
use crate::forwarder::Forwarder;
use crate::transport::HttpTransport;

/// Decorator that records every call made through the inner transport
pub struct TrackedTransport<T: HttpTransport> {
    inner: Arc<T>,
    config: ClientConfig,
    store: DevtoolsStore,
    forwarder: Option<Forwarder>,
}

impl<T: HttpTransport + 'static> TrackedTransport<T> {
    /// Wrap `inner`, recording into `store`
    ///
    /// When the config carries an ingest URL, a [`Forwarder`] is spawned that
    /// posts every capture there through the unwrapped transport. This must
    /// then be called from within a tokio runtime.
    pub fn new(inner: T, config: ClientConfig, store: DevtoolsStore) -> Self {
        let inner = Arc::new(inner);
        let forwarder = config
            .ingest_url
            .clone()
            .map(|url| Forwarder::spawn(inner.clone(), url));

        Self {
            inner,
            config,
            store,
            forwarder,
        }
    }
}

impl<T: HttpTransport> TrackedTransport<T> {
    /// The local client collection
    pub fn store(&self) -> &DevtoolsStore {
        &self.store
    }

    /// The unwrapped transport
    pub fn inner(&self) -> &Arc<T> {
        &self.inner
    }

    /// Flush pending forwards; captures already in the store stay there
    pub async fn close(self) {
        if let Some(forwarder) = self.forwarder {
            forwarder.close().await;
        }
    }

    fn record(&self, entry: CapturedRequest) {
        debug!(
            "Captured {} {} -> {} ({}ms)",
            entry.method, entry.url, entry.status, entry.duration
        );
        if let Some(forwarder) = &self.forwarder {
            forwarder.forward(entry.clone());
        }
        self.store.record_client(entry);
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for TrackedTransport<T> {
    type Error = T::Error;

    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, T::Error> {
        if self.config.bypasses(request.uri()) {
            return self.inner.send(request).await;
        }

        let pending = PendingCall::begin(&request);

        match self.inner.send(request).await {
            Ok(response) => {
                self.record(pending.complete(&response));
                Ok(response)
            }
            Err(err) => {
                self.record(pending.fail());
                Err(err)
            }
        }
    }
}

/// Capture state gathered before the call is made
struct PendingCall {
    id: String,
    method: String,
    url: String,
    timestamp: DateTime<Utc>,
    started: Instant,
    request_headers: HeaderMap,
    request_body: Option<String>,
}

impl PendingCall {
    fn begin(request: &Request<Bytes>) -> Self {
        Self {
            id: new_capture_id(),
            method: request.method().as_str().to_ascii_uppercase(),
            url: request.uri().to_string(),
            timestamp: capture_timestamp(),
            started: Instant::now(),
            request_headers: header_map(request.headers()),
            request_body: request_body_text(request.body()),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        (self.started.elapsed().as_secs_f64() * 1000.0).round() as u64
    }

    /// The response is only read; the caller gets the same value back
    fn complete(self, response: &Response<Bytes>) -> CapturedRequest {
        let duration = self.elapsed_ms();
        let status = response.status();

        CapturedRequest {
            id: self.id,
            method: self.method,
            url: self.url,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            duration,
            timestamp: self.timestamp,
            request_headers: self.request_headers,
            response_headers: header_map(response.headers()),
            request_body: self.request_body,
            response_body: Some(response_body_text(response.body())),
            error: status.as_u16() >= 400,
        }
    }

    /// The call failed before any response existed
    fn fail(self) -> CapturedRequest {
        let duration = self.elapsed_ms();

        CapturedRequest {
            id: self.id,
            method: self.method,
            url: self.url,
            status: 0,
            status_text: NETWORK_ERROR_TEXT.to_string(),
            duration,
            timestamp: self.timestamp,
            request_headers: self.request_headers,
            response_headers: HeaderMap::new(),
            request_body: self.request_body,
            response_body: None,
            error: true,
        }
    }
}

fn request_body_text(body: &Bytes) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    Some(
        std::str::from_utf8(body)
            .map(str::to_string)
            .unwrap_or_else(|_| UNSERIALIZABLE_BODY.to_string()),
    )
}

fn response_body_text(body: &Bytes) -> String {
    std::str::from_utf8(body)
        .map(str::to_string)
        .unwrap_or_else(|_| UNREADABLE_BODY.to_string())
}
