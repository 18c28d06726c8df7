//! Payloads returned by the debug endpoints

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::{Annotation, CapturedRequest, ServerCapturedRequest};

/// Both request collections, as returned by `GET /requests`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RequestsSnapshot {
    pub client: Vec<CapturedRequest>,
    pub server: Vec<ServerCapturedRequest>,
}

/// A request tagged with the side that captured it
///
/// Serializes as the request's own fields plus `"source": "client" | "server"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum TaggedRequest {
    Client(CapturedRequest),
    Server(ServerCapturedRequest),
}

impl TaggedRequest {
    pub fn source(&self) -> &'static str {
        match self {
            TaggedRequest::Client(_) => "client",
            TaggedRequest::Server(_) => "server",
        }
    }
}

/// Structured point-in-time export of all captured state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ExportSnapshot {
    /// Client requests followed by server requests, each in insertion order
    pub requests: Vec<TaggedRequest>,
    pub annotations: Vec<Annotation>,
}

impl ExportSnapshot {
    /// Merge the collections, client entries first
    pub fn new(requests: RequestsSnapshot, annotations: Vec<Annotation>) -> Self {
        let requests = requests
            .client
            .into_iter()
            .map(TaggedRequest::Client)
            .chain(requests.server.into_iter().map(TaggedRequest::Server))
            .collect();

        Self {
            requests,
            annotations,
        }
    }
}

/// Acknowledgement body for mutating endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub const OK: OkResponse = OkResponse { ok: true };
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn server_request(id: &str) -> ServerCapturedRequest {
        ServerCapturedRequest {
            id: id.to_string(),
            method: "GET".to_string(),
            url: format!("http://localhost/api/{}", id),
            timestamp: Utc::now(),
            request_headers: Default::default(),
            status: Some(200),
            duration: Some(1),
        }
    }

    #[test]
    fn test_tagged_request_carries_source_field() {
        let value = serde_json::to_value(TaggedRequest::Server(server_request("s1"))).unwrap();
        assert_eq!(value["source"], "server");
        assert_eq!(value["id"], "s1");
        assert_eq!(value["status"], 200);
    }

    #[test]
    fn test_empty_export_shape() {
        let value = serde_json::to_value(ExportSnapshot::default()).unwrap();
        assert_eq!(value, serde_json::json!({"requests": [], "annotations": []}));
    }

    #[test]
    fn test_export_keeps_server_order() {
        let snapshot = ExportSnapshot::new(
            RequestsSnapshot {
                client: Vec::new(),
                server: vec![server_request("a"), server_request("b")],
            },
            Vec::new(),
        );

        let ids: Vec<_> = snapshot
            .requests
            .iter()
            .map(|r| match r {
                TaggedRequest::Server(s) => s.id.as_str(),
                TaggedRequest::Client(c) => c.id.as_str(),
            })
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(snapshot.requests.iter().all(|r| r.source() == "server"));
    }
}
