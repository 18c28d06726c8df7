//! Captured request types
//!
//! `CapturedRequest` is produced by the outbound-call decorator and is complete
//! the moment it is recorded. `ServerCapturedRequest` is produced by the server
//! middleware and only gains its status and duration once the response finished.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Header map (order is irrelevant, kept sorted for stable output)
pub type HeaderMap = BTreeMap<String, String>;

/// Flatten `http` headers into a plain map
///
/// Repeated names are joined with `", "` the way fetch `Headers` iterate them,
/// and values that are not valid UTF-8 are decoded lossily.
pub fn header_map(headers: &http::HeaderMap) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        map.entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    map
}

/// Outbound call recorded by the client-side interceptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CapturedRequest {
    /// Unique id for this call
    pub id: String,
    /// Uppercase HTTP verb
    pub method: String,
    /// Absolute target URL
    pub url: String,
    /// Response status, 0 when the call failed before a response existed
    pub status: u16,
    /// Response reason phrase, or "Network Error"
    pub status_text: String,
    /// Elapsed milliseconds
    pub duration: u64,
    /// Call start
    pub timestamp: DateTime<Utc>,
    pub request_headers: HeaderMap,
    pub response_headers: HeaderMap,
    pub request_body: Option<String>,
    pub response_body: Option<String>,
    /// `status >= 400` or a network-level failure
    pub error: bool,
}

impl CapturedRequest {
    /// Derive the error flag from a status code (0 means network failure)
    pub fn is_error_status(status: u16) -> bool {
        status == 0 || status >= 400
    }
}

/// Inbound API request observed by the server middleware
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ServerCapturedRequest {
    pub id: String,
    pub method: String,
    /// Absolute request href
    pub url: String,
    /// Request arrival
    pub timestamp: DateTime<Utc>,
    pub request_headers: HeaderMap,
    /// Filled when the response finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Filled when the response finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

/// Server-shaped entry accepted by the requests-ingest endpoint
///
/// Only finished requests can be folded into the client collection, so
/// `status` and `duration` are required here. Unknown fields are refused so a
/// client entry with a missing field is not silently narrowed to this shape.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FinishedServerRequest {
    pub id: String,
    pub method: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub request_headers: HeaderMap,
    pub status: u16,
    pub duration: u64,
}

/// Payload accepted by the requests-ingest endpoint
///
/// Clients normally post full [`CapturedRequest`] entries, but a finished
/// server-shaped entry is accepted too and folded into the client collection.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(untagged)]
pub enum IngestedRequest {
    Client(CapturedRequest),
    Server(FinishedServerRequest),
}

impl IngestedRequest {
    /// Normalize into a client entry, re-deriving the error flag from status
    pub fn into_captured(self) -> CapturedRequest {
        let mut captured = match self {
            IngestedRequest::Client(request) => request,
            IngestedRequest::Server(request) => CapturedRequest {
                id: request.id,
                method: request.method,
                url: request.url,
                status: request.status,
                status_text: String::new(),
                duration: request.duration,
                timestamp: request.timestamp,
                request_headers: request.request_headers,
                response_headers: HeaderMap::new(),
                request_body: None,
                response_body: None,
                error: false,
            },
        };
        captured.error = CapturedRequest::is_error_status(captured.status);
        captured
    }
}
