//! Human-readable export document
//!
//! Renders an [`ExportSnapshot`] as a markdown report: request tables for both
//! sides, a detailed section for every failed request, and the annotation
//! list. Missing values render as `-` and empty sections get an explicit
//! placeholder line instead of an empty table.

use chrono::{DateTime, Utc};
use devtools_proto::{
    format_timestamp, Annotation, CapturedRequest, ExportSnapshot, HeaderMap,
    ServerCapturedRequest, TaggedRequest,
};

const PLACEHOLDER: &str = "-";

/// One row of a request table, shared by both capture sides
struct RequestRow<'a> {
    method: &'a str,
    url: &'a str,
    status: Option<u16>,
    duration: Option<u64>,
    timestamp: String,
    request_headers: Option<&'a HeaderMap>,
    response_headers: Option<&'a HeaderMap>,
    request_body: Option<&'a str>,
    response_body: Option<&'a str>,
}

impl<'a> RequestRow<'a> {
    fn from_client(request: &'a CapturedRequest) -> Self {
        Self {
            method: &request.method,
            url: &request.url,
            status: Some(request.status),
            duration: Some(request.duration),
            timestamp: format_timestamp(&request.timestamp),
            request_headers: Some(&request.request_headers),
            response_headers: Some(&request.response_headers),
            request_body: request.request_body.as_deref(),
            response_body: request.response_body.as_deref(),
        }
    }

    fn from_server(request: &'a ServerCapturedRequest) -> Self {
        Self {
            method: &request.method,
            url: &request.url,
            status: request.status,
            duration: request.duration,
            timestamp: format_timestamp(&request.timestamp),
            request_headers: Some(&request.request_headers),
            response_headers: None,
            request_body: None,
            response_body: None,
        }
    }

    fn is_failed(&self) -> bool {
        self.status.is_some_and(|s| s >= 400)
    }
}

/// Render the full export document
pub fn render_markdown(snapshot: &ExportSnapshot, generated_at: DateTime<Utc>) -> String {
    let client: Vec<RequestRow<'_>> = snapshot
        .requests
        .iter()
        .filter_map(|r| match r {
            TaggedRequest::Client(request) => Some(RequestRow::from_client(request)),
            TaggedRequest::Server(_) => None,
        })
        .collect();
    let server: Vec<RequestRow<'_>> = snapshot
        .requests
        .iter()
        .filter_map(|r| match r {
            TaggedRequest::Server(request) => Some(RequestRow::from_server(request)),
            TaggedRequest::Client(_) => None,
        })
        .collect();

    let mut lines: Vec<String> = Vec::new();

    lines.push("# Agent DevTools Export".to_string());
    lines.push(format!("Generated: {}", format_timestamp(&generated_at)));
    lines.push(String::new());

    lines.push("## Network Requests".to_string());
    lines.push(String::new());
    lines.push("### Client Requests".to_string());
    lines.push(request_table(&client));
    lines.push("### Server Requests".to_string());
    lines.push(request_table(&server));

    lines.push("## Failed Requests".to_string());
    lines.push(String::new());
    let failed: Vec<&RequestRow<'_>> = client
        .iter()
        .chain(server.iter())
        .filter(|r| r.is_failed())
        .collect();
    if failed.is_empty() {
        lines.push("_No failed requests._".to_string());
    } else {
        for row in failed {
            push_failed_request(&mut lines, row);
        }
    }
    lines.push(String::new());

    lines.push("## Annotations".to_string());
    lines.push(String::new());
    if snapshot.annotations.is_empty() {
        lines.push("_No annotations._".to_string());
    } else {
        push_annotations(&mut lines, &snapshot.annotations);
    }

    lines.join("\n")
}

fn request_table(rows: &[RequestRow<'_>]) -> String {
    if rows.is_empty() {
        return "_None captured._\n".to_string();
    }

    let mut lines = vec![
        "| Method | URL | Status | Duration |".to_string(),
        "|--------|-----|--------|----------|".to_string(),
    ];
    for row in rows {
        lines.push(format!(
            "| {} | {} | {} | {} |",
            cell(row.method),
            cell(row.url),
            optional(row.status),
            duration(row.duration)
        ));
    }

    lines.join("\n") + "\n"
}

fn push_failed_request(lines: &mut Vec<String>, row: &RequestRow<'_>) {
    lines.push(format!("### {} {}", or_dash(row.method), or_dash(row.url)));
    lines.push(format!("- **Status**: {}", optional(row.status)));
    lines.push(format!("- **Duration**: {}", duration(row.duration)));
    lines.push(format!("- **Timestamp**: {}", row.timestamp));

    push_headers(lines, "Request Headers", row.request_headers);
    push_headers(lines, "Response Headers", row.response_headers);
    push_body(lines, "Request Body", row.request_body);
    push_body(lines, "Response Body", row.response_body);

    lines.push(String::new());
}

fn push_headers(lines: &mut Vec<String>, label: &str, headers: Option<&HeaderMap>) {
    let Some(headers) = headers.filter(|h| !h.is_empty()) else {
        return;
    };
    lines.push(format!("- **{}**:", label));
    for (name, value) in headers {
        lines.push(format!("  - `{}`: {}", name, value));
    }
}

/// Bodies are never truncated; multi-line or backticked bodies get a fence
fn push_body(lines: &mut Vec<String>, label: &str, body: Option<&str>) {
    let Some(body) = body.filter(|b| !b.is_empty()) else {
        return;
    };
    if body.contains('\n') || body.contains('`') {
        lines.push(format!("- **{}**:", label));
        lines.push("```".to_string());
        lines.push(body.to_string());
        lines.push("```".to_string());
    } else {
        lines.push(format!("- **{}**: `{}`", label, body));
    }
}

fn push_annotations(lines: &mut Vec<String>, annotations: &[Annotation]) {
    lines.push("| # | Component | File | Comment |".to_string());
    lines.push("|---|-----------|------|---------|".to_string());
    for (index, annotation) in annotations.iter().enumerate() {
        lines.push(format!(
            "| {} | {} | {} | {} |",
            index + 1,
            cell(&annotation.component),
            cell(or_dash(&annotation.file_path)),
            cell(&annotation.comment)
        ));
    }

    lines.push(String::new());
    lines.push("### Annotation Details".to_string());
    lines.push(String::new());

    for (index, annotation) in annotations.iter().enumerate() {
        let rect = &annotation.rect;
        lines.push(format!(
            "#### {}. {}",
            index + 1,
            or_dash(&annotation.component)
        ));
        lines.push(format!("- **File**: {}", or_dash(&annotation.file_path)));
        lines.push(format!(
            "- **Element**: `<{}>`",
            or_dash(&annotation.element_tag)
        ));
        lines.push(format!(
            "- **Text Preview**: {}",
            or_dash(&annotation.text_preview)
        ));
        lines.push(format!("- **Comment**: {}", or_dash(&annotation.comment)));
        lines.push(format!("- **Timestamp**: {}", or_dash(&annotation.timestamp)));
        lines.push(format!(
            "- **Position**: x={} y={} w={} h={}",
            rect.x, rect.y, rect.w, rect.h
        ));
        lines.push(String::new());
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        PLACEHOLDER
    } else {
        value
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn duration(value: Option<u64>) -> String {
    match value {
        Some(ms) => format!("{}ms", ms),
        None => PLACEHOLDER.to_string(),
    }
}

/// Keep a value inside its table cell
fn cell(value: &str) -> String {
    or_dash(value).replace('|', "\\|").replace('\n', " ")
}
