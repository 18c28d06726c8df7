//! Live store updates for streaming to the overlay

use devtools_proto::{Annotation, CapturedRequest, ServerCapturedRequest};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Store mutation event, published after the mutation is visible
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(tag = "type")]
pub enum DevtoolsEvent {
    /// Client request recorded or ingested
    #[serde(rename = "client_request")]
    ClientRequest { request: CapturedRequest },
    /// Server request finished
    #[serde(rename = "server_request")]
    ServerRequest { request: ServerCapturedRequest },
    /// Annotation added or replaced in place
    #[serde(rename = "annotation")]
    Annotation { annotation: Annotation },
    #[serde(rename = "annotation_deleted")]
    AnnotationDeleted { id: String },
    #[serde(rename = "annotations_cleared")]
    AnnotationsCleared,
    /// All three collections emptied
    #[serde(rename = "cleared")]
    Cleared,
}
