//! Inbound request tracking
//!
//! [`RequestTrackingLayer`] observes API requests before they are routed.
//! A tracked request starts a [`PendingCapture`]; the capture travels with
//! the response body and is recorded exactly once, when the body has been
//! fully produced. Responses whose body is dropped early, fails midway, or
//! never arrives because the inner service failed are not recorded.

use axum::body::Body;
use axum::BoxError;
use bytes::Bytes;
use devtools_proto::{capture_timestamp, header_map, new_capture_id, ServerCapturedRequest};
use devtools_store::DevtoolsStore;
use http::{header, Request, Response, StatusCode};
use hyper::body::{Body as HttpBody, Frame, SizeHint};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::time::Instant;
use tower::{Layer, Service};
use tracing::debug;

use crate::config::TrackingConfig;

/// Tower layer that records inbound API requests into a [`DevtoolsStore`]
#[derive(Clone)]
pub struct RequestTrackingLayer {
    store: DevtoolsStore,
    config: Arc<TrackingConfig>,
}

impl RequestTrackingLayer {
    pub fn new(store: DevtoolsStore, config: TrackingConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for RequestTrackingLayer {
    type Service = RequestTracking<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTracking {
            inner,
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

/// Service produced by [`RequestTrackingLayer`]
#[derive(Clone)]
pub struct RequestTracking<S> {
    inner: S,
    store: DevtoolsStore,
    config: Arc<TrackingConfig>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestTracking<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let capture = if self.config.should_track(request.uri().path()) {
            Some(PendingCapture::begin(&request, self.store.clone()))
        } else {
            None
        };

        ResponseFuture {
            inner: self.inner.call(request),
            capture,
        }
    }
}

pin_project! {
    /// Response future for [`RequestTracking`]
    pub struct ResponseFuture<F> {
        #[pin]
        inner: F,
        capture: Option<PendingCapture>,
    }
}

impl<F, ResBody, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Output = Result<Response<Body>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let result = ready!(this.inner.poll(cx));

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                if let Some(capture) = this.capture.take() {
                    debug!("Inner service failed, dropping capture {}", capture.entry.id);
                }
                return Poll::Ready(Err(err));
            }
        };

        let response = match this.capture.take() {
            Some(capture) => {
                let (parts, body) = response.into_parts();
                let capture = capture.responded(parts.status);
                Response::from_parts(parts, Body::new(CompletionBody::new(body, capture)))
            }
            None => response.map(Body::new),
        };

        Poll::Ready(Ok(response))
    }
}

/// Server entry waiting for its response to finish
pub struct PendingCapture {
    store: DevtoolsStore,
    entry: ServerCapturedRequest,
    started: Instant,
    status: Option<StatusCode>,
}

impl PendingCapture {
    fn begin<B>(request: &Request<B>, store: DevtoolsStore) -> Self {
        let entry = ServerCapturedRequest {
            id: new_capture_id(),
            method: request.method().as_str().to_string(),
            url: absolute_url(request),
            timestamp: capture_timestamp(),
            request_headers: header_map(request.headers()),
            status: None,
            duration: None,
        };

        Self {
            store,
            entry,
            started: Instant::now(),
            status: None,
        }
    }

    fn responded(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Fill status and duration, then append; consumes the capture so it can only fire once
    fn finish(self) {
        let mut entry = self.entry;
        entry.status = self.status.map(|s| s.as_u16());
        entry.duration = Some((self.started.elapsed().as_secs_f64() * 1000.0).round() as u64);

        debug!(
            "Tracked {} {} -> {:?} ({:?}ms)",
            entry.method, entry.url, entry.status, entry.duration
        );
        self.store.record_server(entry);
    }
}

pin_project! {
    /// Response body that fires its capture once the last frame was produced
    pub struct CompletionBody<B> {
        #[pin]
        inner: B,
        capture: Option<PendingCapture>,
        ended: bool,
    }

    impl<B> PinnedDrop for CompletionBody<B> {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if let Some(capture) = this.capture.take() {
                if *this.ended {
                    capture.finish();
                } else {
                    debug!("Response body dropped early, dropping capture {}", capture.entry.id);
                }
            }
        }
    }
}

impl<B: HttpBody> CompletionBody<B> {
    pub(crate) fn new(inner: B, capture: PendingCapture) -> Self {
        // A body with nothing to send is complete before the first poll
        let ended = inner.is_end_stream();
        Self {
            inner,
            capture: Some(capture),
            ended,
        }
    }
}

impl<B: HttpBody> HttpBody for CompletionBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();
        let frame = ready!(this.inner.as_mut().poll_frame(cx));

        match &frame {
            None => *this.ended = true,
            Some(Ok(_)) => *this.ended = this.inner.is_end_stream(),
            Some(Err(_)) => {
                if let Some(capture) = this.capture.take() {
                    debug!("Response body failed, dropping capture {}", capture.entry.id);
                }
            }
        }

        if *this.ended {
            if let Some(capture) = this.capture.take() {
                capture.finish();
            }
        }

        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Rebuild an absolute href for origin-form request targets
fn absolute_url<B>(request: &Request<B>) -> String {
    let uri = request.uri();
    if uri.scheme().is_some() {
        return uri.to_string();
    }

    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    format!("http://{}{}", host, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn request(uri: &str) -> Request<()> {
        Request::builder()
            .uri(uri)
            .header(header::HOST, "localhost:3000")
            .body(())
            .unwrap()
    }

    #[test]
    fn test_absolute_url_from_host_header() {
        assert_eq!(
            absolute_url(&request("/api/widgets?page=2")),
            "http://localhost:3000/api/widgets?page=2"
        );
        assert_eq!(
            absolute_url(&request("http://example.test/api/x")),
            "http://example.test/api/x"
        );
    }

    #[tokio::test]
    async fn test_body_fires_capture_once_at_end() {
        let store = DevtoolsStore::new();
        let capture = PendingCapture::begin(&request("/api/widgets"), store.clone())
            .responded(StatusCode::CREATED);
        let body = CompletionBody::new(Body::from("created"), capture);

        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"created");

        let recorded = store.server_requests();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].status, Some(201));
        assert!(recorded[0].duration.is_some());
    }

    #[tokio::test]
    async fn test_empty_body_fires_on_drop() {
        let store = DevtoolsStore::new();
        let capture = PendingCapture::begin(&request("/api/widgets/1"), store.clone())
            .responded(StatusCode::NO_CONTENT);

        drop(CompletionBody::new(Body::empty(), capture));

        assert_eq!(store.server_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_unfinished_body_is_not_recorded() {
        let store = DevtoolsStore::new();
        let capture = PendingCapture::begin(&request("/api/widgets"), store.clone())
            .responded(StatusCode::OK);

        drop(CompletionBody::new(Body::from("never read"), capture));

        assert!(store.server_requests().is_empty());
    }
}
