//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// Bodies longer than this many characters are truncated in the log.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The largest request body the server accepts, sized for statement PDFs.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const JSON_SECRET_FIELDS: [&str; 1] = ["password"];

/// Log the request and response for each request.
///
/// Both are logged at the `debug` level. The value of a `password` field in a JSON body is
/// replaced with asterisks. Multipart bodies are logged by size only.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::debug!("could not read request body: {error}");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    tracing::debug!(
        "Received request: {} {}\nbody: {}",
        parts.method,
        parts.uri,
        display_body(content_type, &body_bytes)
    );

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    tracing::debug!(
        "Sending response: {}\nbody: {}",
        parts.status,
        display_body(content_type, &body_bytes)
    );

    Response::from_parts(parts, Body::from(body_bytes))
}

fn display_body(content_type: &str, body: &Bytes) -> String {
    if content_type.starts_with("multipart/") {
        return format!("<multipart body of {} bytes>", body.len());
    }

    let text = String::from_utf8_lossy(body);
    let text = if content_type.starts_with("application/json") {
        redact_json(&text)
    } else {
        text.into_owned()
    };

    truncate(&text, LOG_BODY_LENGTH_LIMIT)
}

fn redact_json(text: &str) -> String {
    let Ok(mut value) = serde_json::from_str::<Value>(text) else {
        return text.to_owned();
    };

    if let Value::Object(fields) = &mut value {
        for name in JSON_SECRET_FIELDS {
            if let Some(secret) = fields.get_mut(name) {
                *secret = Value::String("********".to_owned());
            }
        }
    }

    value.to_string()
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_owned(),
    }
}
