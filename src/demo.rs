//! Demo host application used by `agent-devtools serve`

use axum::{
    body::Bytes,
    extract::Query,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Upper bound for `/api/slow`
const MAX_SLOW_MS: u64 = 30_000;
const DEFAULT_SLOW_MS: u64 = 250;

#[derive(Debug, Clone, Serialize)]
struct Widget {
    id: u32,
    name: &'static str,
    price: f64,
}

#[derive(Debug, Deserialize)]
struct WidgetQuery {
    /// Answer 500 instead of the list
    #[serde(default)]
    fail: bool,
}

#[derive(Debug, Deserialize)]
struct SlowQuery {
    ms: Option<u64>,
}

pub fn router() -> Router {
    Router::new()
        .route("/api/widgets", get(list_widgets))
        .route("/api/demo", post(submit_demo))
        .route("/api/slow", get(slow))
        .route("/health", get(health))
}

async fn list_widgets(Query(query): Query<WidgetQuery>) -> impl IntoResponse {
    if query.fail {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "widget inventory unavailable"})),
        )
            .into_response();
    }

    let widgets = vec![
        Widget {
            id: 1,
            name: "Sprocket",
            price: 4.5,
        },
        Widget {
            id: 2,
            name: "Flange",
            price: 12.0,
        },
    ];
    Json(widgets).into_response()
}

/// Always rejects the submission, echoing what was received
async fn submit_demo(body: Bytes) -> impl IntoResponse {
    let received: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "statusCode": 422,
            "statusMessage": "Unprocessable Entity",
            "data": {
                "message": "Validation failed",
                "errors": {
                    "email": "Invalid email format",
                    "quantity": "Must be greater than 0"
                },
                "received": received
            }
        })),
    )
}

async fn slow(Query(query): Query<SlowQuery>) -> Json<Value> {
    let ms = query.ms.unwrap_or(DEFAULT_SLOW_MS).min(MAX_SLOW_MS);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({"waited": ms}))
}

async fn health() -> &'static str {
    "ok"
}
