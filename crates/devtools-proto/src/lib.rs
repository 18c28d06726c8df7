//! Agent DevTools data model
//!
//! This crate defines the types shared by the capture pipeline: requests
//! recorded on the client side, requests observed by the server middleware,
//! UI annotations, and the export snapshot that merges all of them.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

pub mod annotation;
pub mod request;
pub mod snapshot;

pub use annotation::{Annotation, Rect};
pub use request::{
    header_map, CapturedRequest, FinishedServerRequest, HeaderMap, IngestedRequest,
    ServerCapturedRequest,
};
pub use snapshot::{ExportSnapshot, OkResponse, RequestsSnapshot, TaggedRequest};

/// Path prefix under which every debug endpoint is mounted
pub const DEBUG_PREFIX: &str = "/api/__agent";

/// Only server requests below this prefix are tracked
pub const API_PREFIX: &str = "/api/";

/// Framework-internal prefixes that are never tracked, even below [`API_PREFIX`]
pub const FRAMEWORK_SKIP_PREFIXES: &[&str] = &["/__internal", "/_assets"];

/// Status text recorded when the wrapped call failed before a response existed
pub const NETWORK_ERROR_TEXT: &str = "Network Error";

/// Substituted when a request body cannot be turned into text
pub const UNSERIALIZABLE_BODY: &str = "[unserializable body]";

/// Substituted when a response body cannot be read as text
pub const UNREADABLE_BODY: &str = "[unable to read body]";

/// Whether `path` lies below `prefix` on a segment boundary
///
/// `/api/__agent` covers `/api/__agent` and `/api/__agent/export` but not
/// `/api/__agentfoo`. A prefix ending in `/` already marks the boundary.
pub fn path_has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => prefix.ends_with('/') || rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Generate a fresh opaque id for a capture entry
pub fn new_capture_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current instant truncated to millisecond precision
pub fn capture_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// ISO-8601 rendering used in reports
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
