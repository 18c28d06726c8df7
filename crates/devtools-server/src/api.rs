//! Debug HTTP endpoints
//!
//! Thin handlers over [`DevtoolsStore`]. The router is meant to be nested
//! under the debug prefix, so routes here are relative to it.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{sse::Event, IntoResponse, Response, Sse},
    routing::{delete, get},
    Json, Router,
};
use chrono::Utc;
use devtools_proto::{
    Annotation, CapturedRequest, ExportSnapshot, FinishedServerRequest, IngestedRequest,
    OkResponse, Rect,
    RequestsSnapshot, ServerCapturedRequest, TaggedRequest,
};
use devtools_store::{render_markdown, DevtoolsStore, UpsertOutcome};
use futures::stream::Stream;
use problem_details::ProblemDetails;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, info};
use utoipa::{OpenApi, ToSchema};

/// Interval between keep-alive comments on the event stream
const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Errors surfaced by the debug endpoints
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Annotation id must not be empty")]
    MissingAnnotationId,

    #[error("{detail}")]
    InvalidPayload { status: StatusCode, detail: String },
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidPayload {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, title) = match &self {
            ApiError::MissingAnnotationId => {
                (StatusCode::UNPROCESSABLE_ENTITY, "Invalid Annotation")
            }
            ApiError::InvalidPayload { status, .. } => (*status, "Invalid Payload"),
        };

        let problem = ProblemDetails::new()
            .with_status(status)
            .with_title(title)
            .with_detail(self.to_string());

        (status, Json(problem)).into_response()
    }
}

/// Document form of the export
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkdownExport {
    pub markdown: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        list_requests,
        ingest_request,
        list_annotations,
        upsert_annotation,
        clear_annotations,
        delete_annotation,
        export_json,
        export_markdown,
        clear_all,
    ),
    components(
        schemas(
            CapturedRequest,
            ServerCapturedRequest,
            FinishedServerRequest,
            IngestedRequest,
            RequestsSnapshot,
            TaggedRequest,
            ExportSnapshot,
            Annotation,
            Rect,
            OkResponse,
            MarkdownExport,
        )
    ),
    tags(
        (name = "agent-devtools", description = "Agent DevTools debug endpoints")
    ),
    info(
        title = "Agent DevTools API",
        version = "1.0.0",
        description = "Captured requests, UI annotations and export for development builds"
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
struct ApiState {
    store: DevtoolsStore,
}

/// Build the debug router over `store`
pub fn debug_router(store: DevtoolsStore) -> Router {
    Router::new()
        .route("/requests", get(list_requests).post(ingest_request))
        .route(
            "/annotations",
            get(list_annotations)
                .post(upsert_annotation)
                .delete(clear_annotations),
        )
        .route("/annotations/{id}", delete(delete_annotation))
        .route("/export", get(export_json))
        .route("/export/markdown", get(export_markdown))
        .route("/clear", delete(clear_all))
        .route("/events", get(event_stream))
        .route("/openapi.json", get(openapi_document))
        .with_state(ApiState { store })
}

/// List captured requests
#[utoipa::path(
    get,
    path = "/api/__agent/requests",
    tag = "agent-devtools",
    summary = "List captured requests",
    description = "Returns the client and server request collections in insertion order",
    responses(
        (status = 200, description = "Both request collections", body = RequestsSnapshot)
    )
)]
async fn list_requests(State(state): State<ApiState>) -> Json<RequestsSnapshot> {
    Json(state.store.requests())
}

/// Ingest one captured request into the client collection
#[utoipa::path(
    post,
    path = "/api/__agent/requests",
    tag = "agent-devtools",
    summary = "Ingest a captured request",
    description = "Accepts a client or server shaped entry and stores it in the client collection; a repeated id replaces the earlier entry",
    request_body = IngestedRequest,
    responses(
        (status = 200, description = "Request stored", body = OkResponse),
        (status = 400, description = "Body is not JSON"),
        (status = 422, description = "Entry matches neither a client nor a finished server request")
    )
)]
async fn ingest_request(
    State(state): State<ApiState>,
    payload: Result<Json<IngestedRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let Json(request) = payload?;
    let request = request.into_captured();
    debug!("Ingested {} {} ({})", request.method, request.url, request.status);
    state.store.ingest_client(request);
    Ok(Json(OkResponse::OK))
}

/// List annotations
#[utoipa::path(
    get,
    path = "/api/__agent/annotations",
    tag = "agent-devtools",
    summary = "List annotations",
    responses(
        (status = 200, description = "All annotations in insertion order", body = Vec<Annotation>)
    )
)]
async fn list_annotations(State(state): State<ApiState>) -> Json<Vec<Annotation>> {
    Json(state.store.annotations())
}

/// Add or replace an annotation
#[utoipa::path(
    post,
    path = "/api/__agent/annotations",
    tag = "agent-devtools",
    summary = "Upsert an annotation",
    description = "Replaces the annotation with the same id in place, or appends it",
    request_body = Annotation,
    responses(
        (status = 200, description = "Annotation stored", body = OkResponse),
        (status = 422, description = "Annotation id is empty or the body is not an annotation")
    )
)]
async fn upsert_annotation(
    State(state): State<ApiState>,
    payload: Result<Json<Annotation>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let Json(annotation) = payload?;
    if annotation.id.is_empty() {
        return Err(ApiError::MissingAnnotationId);
    }

    let id = annotation.id.clone();
    match state.store.upsert_annotation(annotation) {
        UpsertOutcome::Inserted => debug!("Added annotation {}", id),
        UpsertOutcome::Replaced => debug!("Replaced annotation {}", id),
    }
    Ok(Json(OkResponse::OK))
}

/// Remove every annotation
#[utoipa::path(
    delete,
    path = "/api/__agent/annotations",
    tag = "agent-devtools",
    summary = "Clear annotations",
    description = "Empties the annotation list; captured requests are kept",
    responses(
        (status = 200, description = "Annotations cleared", body = OkResponse)
    )
)]
async fn clear_annotations(State(state): State<ApiState>) -> Json<OkResponse> {
    state.store.clear_annotations();
    Json(OkResponse::OK)
}

/// Delete an annotation by id
#[utoipa::path(
    delete,
    path = "/api/__agent/annotations/{id}",
    tag = "agent-devtools",
    summary = "Delete an annotation",
    description = "Removes the annotation with this id; an unknown id is not an error",
    params(
        ("id" = String, Path, description = "Annotation id")
    ),
    responses(
        (status = 200, description = "Annotation removed or never existed", body = OkResponse)
    )
)]
async fn delete_annotation(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Json<OkResponse> {
    if !state.store.delete_annotation(&id) {
        debug!("Delete of unknown annotation {}", id);
    }
    Json(OkResponse::OK)
}

/// Structured export
#[utoipa::path(
    get,
    path = "/api/__agent/export",
    tag = "agent-devtools",
    summary = "Export captured state",
    description = "Client requests followed by server requests, each tagged with its source, plus all annotations",
    responses(
        (status = 200, description = "Point-in-time snapshot", body = ExportSnapshot)
    )
)]
async fn export_json(State(state): State<ApiState>) -> Json<ExportSnapshot> {
    Json(state.store.snapshot())
}

/// Document export
#[utoipa::path(
    get,
    path = "/api/__agent/export/markdown",
    tag = "agent-devtools",
    summary = "Export as a markdown report",
    responses(
        (status = 200, description = "Rendered report", body = MarkdownExport)
    )
)]
async fn export_markdown(State(state): State<ApiState>) -> Json<MarkdownExport> {
    let markdown = render_markdown(&state.store.snapshot(), Utc::now());
    Json(MarkdownExport { markdown })
}

/// Empty every collection
#[utoipa::path(
    delete,
    path = "/api/__agent/clear",
    tag = "agent-devtools",
    summary = "Clear all captured state",
    description = "Empties client requests, server requests and annotations in one step",
    responses(
        (status = 200, description = "Everything cleared", body = OkResponse)
    )
)]
async fn clear_all(State(state): State<ApiState>) -> Json<OkResponse> {
    state.store.clear();
    info!("Devtools store cleared");
    Json(OkResponse::OK)
}

/// Server-Sent Events stream of store mutations
async fn event_stream(
    State(state): State<ApiState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("Devtools event subscriber connected");

    let stream = BroadcastStream::new(state.store.subscribe()).filter_map(|result| {
        // Lagged subscribers just miss events
        let event = result.ok()?;
        let json = serde_json::to_string(&event).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(SSE_KEEP_ALIVE)
            .text("keep-alive"),
    )
}

async fn openapi_document() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
