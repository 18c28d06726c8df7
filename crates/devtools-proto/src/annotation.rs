//! UI annotations tied to source locations

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Viewport-relative bounding box at annotation time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// A developer comment attached to a UI element
///
/// Everything except `id` defaults to empty so partially filled payloads from
/// the overlay still land in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Creator-supplied identity
    pub id: String,
    /// Display name of the owning component
    #[serde(default)]
    pub component: String,
    /// Source location, empty when unknown
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub element_tag: String,
    /// Truncated text content of the element
    #[serde(default)]
    pub text_preview: String,
    #[serde(default)]
    pub comment: String,
    /// Creation instant as sent by the creator (ISO-8601)
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub rect: Rect,
}
