//! Integration tests for the debug endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use devtools_proto::Annotation;
use devtools_server::{install, DevtoolsConfig};
use devtools_store::DevtoolsStore;
use serde_json::{json, Value};
use tower::ServiceExt; // For `oneshot` method

/// Helper to create a host app with devtools installed in dev mode
fn create_test_app(store: DevtoolsStore) -> Router {
    let config = DevtoolsConfig::builder().dev(true).build().unwrap();
    install(Router::new(), &config, store)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("host", "localhost:3000");
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&value).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    // Non-JSON bodies come back as a string so a bad status fails on the assert
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    (status, value)
}

fn annotation(id: &str, comment: &str) -> Value {
    json!({
        "id": id,
        "component": "Button",
        "filePath": "Button.vue",
        "elementTag": "button",
        "textPreview": "Click",
        "comment": comment,
        "timestamp": "2024-01-01T00:00:00Z",
        "rect": {"x": 0, "y": 0, "w": 10, "h": 10}
    })
}

#[tokio::test]
async fn test_post_then_list_annotation() {
    let app = create_test_app(DevtoolsStore::new());
    let payload = annotation("a1", "too small");

    let (status, body) = send(&app, "POST", "/api/__agent/annotations", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (status, body) = send(&app, "GET", "/api/__agent/annotations", None).await;
    assert_eq!(status, StatusCode::OK);

    let listed: Vec<Annotation> = serde_json::from_value(body).unwrap();
    let expected: Annotation = serde_json::from_value(payload).unwrap();
    assert_eq!(listed, vec![expected]);
}

#[tokio::test]
async fn test_upsert_keeps_length_and_position() {
    let app = create_test_app(DevtoolsStore::new());

    for (id, comment) in [("a1", "first"), ("a2", "second"), ("a3", "third")] {
        send(&app, "POST", "/api/__agent/annotations", Some(annotation(id, comment))).await;
    }
    let (status, _) = send(
        &app,
        "POST",
        "/api/__agent/annotations",
        Some(annotation("a2", "second, revised")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/api/__agent/annotations", None).await;
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[1]["id"], "a2");
    assert_eq!(listed[1]["comment"], "second, revised");
}

#[tokio::test]
async fn test_delete_unknown_annotation_is_ok() {
    let app = create_test_app(DevtoolsStore::new());
    send(&app, "POST", "/api/__agent/annotations", Some(annotation("a1", "keep"))).await;

    let (status, body) = send(&app, "DELETE", "/api/__agent/annotations/missing", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (_, body) = send(&app, "GET", "/api/__agent/annotations", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", "/api/__agent/annotations/a1", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, "GET", "/api/__agent/annotations", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_empty_annotation_id_is_rejected() {
    let store = DevtoolsStore::new();
    let app = create_test_app(store.clone());

    let (status, body) = send(&app, "POST", "/api/__agent/annotations", Some(annotation("", "x"))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], 422);
    assert_eq!(body["title"], "Invalid Annotation");
    assert!(store.annotations().is_empty());
}

#[tokio::test]
async fn test_clear_annotations_keeps_requests() {
    let store = DevtoolsStore::new();
    let app = create_test_app(store.clone());

    send(&app, "POST", "/api/__agent/annotations", Some(annotation("a1", "x"))).await;
    send(
        &app,
        "POST",
        "/api/__agent/requests",
        Some(json!({
            "id": "s1",
            "method": "GET",
            "url": "http://localhost:3000/api/widgets",
            "timestamp": "2024-01-01T00:00:00.000Z",
            "requestHeaders": {},
            "status": 200,
            "duration": 3
        })),
    )
    .await;

    let (status, _) = send(&app, "DELETE", "/api/__agent/annotations", None).await;
    assert_eq!(status, StatusCode::OK);

    let counts = store.counts();
    assert_eq!(counts.annotations, 0);
    assert_eq!(counts.client, 1);
}

#[tokio::test]
async fn test_ingest_accepts_both_shapes() {
    let app = create_test_app(DevtoolsStore::new());

    let client_entry = json!({
        "id": "c1",
        "method": "POST",
        "url": "http://localhost:3000/api/demo",
        "status": 422,
        "statusText": "Unprocessable Entity",
        "duration": 12,
        "timestamp": "2024-01-01T00:00:00.000Z",
        "requestHeaders": {"content-type": "application/json"},
        "responseHeaders": {},
        "requestBody": "{\"name\":\"\"}",
        "responseBody": "{\"errors\":[]}",
        "error": true
    });
    let server_entry = json!({
        "id": "s1",
        "method": "GET",
        "url": "http://localhost:3000/api/widgets",
        "timestamp": "2024-01-01T00:00:01.000Z",
        "requestHeaders": {},
        "status": 500,
        "duration": 4
    });

    for entry in [client_entry, server_entry] {
        let (status, body) = send(&app, "POST", "/api/__agent/requests", Some(entry)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));
    }

    let (status, body) = send(&app, "GET", "/api/__agent/requests", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["server"], json!([]));

    let client = body["client"].as_array().unwrap();
    assert_eq!(client.len(), 2);
    assert_eq!(client[0]["id"], "c1");
    assert_eq!(client[0]["requestBody"], "{\"name\":\"\"}");
    assert_eq!(client[1]["id"], "s1");
    assert_eq!(client[1]["status"], 500);
    assert_eq!(client[1]["error"], true);
}

#[tokio::test]
async fn test_malformed_ingest_is_rejected() {
    let store = DevtoolsStore::new();
    let app = create_test_app(store.clone());

    let (status, body) = send(&app, "POST", "/api/__agent/requests", Some(json!({"nope": 1}))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], 422);
    assert_eq!(body["title"], "Invalid Payload");
    assert_eq!(store.counts().client, 0);
}

#[tokio::test]
async fn test_non_json_ingest_gets_problem_document() {
    let store = DevtoolsStore::new();
    let app = create_test_app(store.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/api/__agent/requests")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], 400);
    assert!(body["detail"].is_string());
    assert_eq!(store.counts().client, 0);
}

#[tokio::test]
async fn test_pending_server_entry_is_not_ingested() {
    let store = DevtoolsStore::new();
    let app = create_test_app(store.clone());

    // Still waiting for its response: no status, no duration
    let pending = json!({
        "id": "s9",
        "method": "GET",
        "url": "http://localhost:3000/api/widgets",
        "timestamp": "2024-01-01T00:00:00.000Z",
        "requestHeaders": {"host": "localhost:3000"}
    });

    let (status, body) = send(&app, "POST", "/api/__agent/requests", Some(pending)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], 422);
    assert!(store.client_requests().is_empty());
}

#[tokio::test]
async fn test_incomplete_client_entry_is_not_narrowed() {
    let store = DevtoolsStore::new();
    let app = create_test_app(store.clone());

    // Full client entry except for the `error` flag
    let entry = json!({
        "id": "c9",
        "method": "GET",
        "url": "http://localhost:3000/api/widgets",
        "status": 200,
        "statusText": "OK",
        "duration": 8,
        "timestamp": "2024-01-01T00:00:00.000Z",
        "requestHeaders": {},
        "responseHeaders": {"content-type": "application/json"},
        "requestBody": null,
        "responseBody": "[]"
    });

    let (status, body) = send(&app, "POST", "/api/__agent/requests", Some(entry)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["title"], "Invalid Payload");
    assert!(store.client_requests().is_empty());
}

#[tokio::test]
async fn test_clear_then_export_is_empty() {
    let app = create_test_app(DevtoolsStore::new());
    send(&app, "POST", "/api/__agent/annotations", Some(annotation("a1", "x"))).await;

    let (status, body) = send(&app, "DELETE", "/api/__agent/clear", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (status, body) = send(&app, "GET", "/api/__agent/export", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"requests": [], "annotations": []}));
}

#[tokio::test]
async fn test_export_tags_request_sources() {
    let app = create_test_app(DevtoolsStore::new());
    send(
        &app,
        "POST",
        "/api/__agent/requests",
        Some(json!({
            "id": "c1",
            "method": "GET",
            "url": "http://localhost:3000/api/widgets",
            "status": 200,
            "statusText": "OK",
            "duration": 1,
            "timestamp": "2024-01-01T00:00:00.000Z",
            "requestHeaders": {},
            "responseHeaders": {},
            "requestBody": null,
            "responseBody": "[]",
            "error": false
        })),
    )
    .await;

    let (_, body) = send(&app, "GET", "/api/__agent/export", None).await;
    let requests = body["requests"].as_array().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["source"], "client");
    assert_eq!(requests[0]["id"], "c1");
}

#[tokio::test]
async fn test_markdown_export() {
    let app = create_test_app(DevtoolsStore::new());
    send(&app, "POST", "/api/__agent/annotations", Some(annotation("a1", "too small"))).await;

    let (status, body) = send(&app, "GET", "/api/__agent/export/markdown", None).await;
    assert_eq!(status, StatusCode::OK);

    let markdown = body["markdown"].as_str().unwrap();
    assert!(markdown.starts_with("# Agent DevTools Export\n"));
    assert!(markdown.contains("_No failed requests._"));
    assert!(markdown.contains("| 1 | Button | Button.vue | too small |"));
}

#[tokio::test]
async fn test_openapi_document_lists_endpoints() {
    let app = create_test_app(DevtoolsStore::new());

    let (status, body) = send(&app, "GET", "/api/__agent/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);

    let paths = body["paths"].as_object().unwrap();
    assert!(paths.contains_key("/api/__agent/requests"));
    assert!(paths.contains_key("/api/__agent/annotations/{id}"));
    assert!(paths.contains_key("/api/__agent/clear"));
}
