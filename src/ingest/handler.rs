//! Envelope ingestion handler.
//!
//! # Request Flow
//! ```text
//! OPTIONS                 → 200 (pre-flight)
//! other than POST         → 405
//! over the per-IP quota   → 429 {"error":"Rate limit exceeded"}
//! unreadable / bad JSON   → 500 {"error":"Internal server error"} (failure logged)
//! missing event/requestId/url → 400 {"error":"Invalid log data structure"}
//! enrich → redact (production) → emit at event severity → 200 {"success":true}
//! ```
//! Every response carries the CORS headers.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

use super::client_ip::resolve_client_ip;
use super::rate_limit::RateLimiter;
use crate::emitter::{Emitter, EmitterError, Level};
use crate::env::{Environment, Side};
use crate::event::{now_iso, severity_of, validate_envelope, Redactor};
use crate::observability::metrics;

const ALLOW_METHODS: &str = "POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Failure while processing an accepted request. Always answered with 500.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read request body: {0}")]
    Body(#[from] axum::Error),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to emit record: {0}")]
    Emit(#[from] EmitterError),
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal server error" })),
        )
            .into_response()
    }
}

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct IngestState {
    pub emitter: Emitter,
    pub env: Arc<dyn Environment>,
    pub limiter: Option<Arc<RateLimiter>>,
    pub redactor: Arc<Redactor>,
    pub max_body_bytes: usize,
}

pub async fn handle_envelope(State(state): State<IngestState>, request: Request<Body>) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));

    let response = process(&state, request).await;
    with_cors(response, origin)
}

async fn process(state: &IngestState, request: Request<Body>) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    if request.method() != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, ALLOW_METHODS)],
            Json(json!({ "error": "Method not allowed" })),
        )
            .into_response();
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_ip = resolve_client_ip(request.headers(), peer);

    if let Some(limiter) = &state.limiter {
        if !limiter.check(&client_ip) {
            tracing::warn!(client_ip = %client_ip, "Rate limit exceeded");
            metrics::record_rate_limited();
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": "Rate limit exceeded" })),
            )
                .into_response();
        }
    }

    let (parts, body) = request.into_parts();
    match ingest(state, &parts.headers, body, &client_ip).await {
        Ok(response) => response,
        Err(e) => {
            let mut data = Map::new();
            data.insert("error".into(), Value::String(e.to_string()));
            data.insert("stack".into(), Value::String(error_chain(&e)));
            data.insert("clientIP".into(), Value::String(client_ip.clone()));
            state
                .emitter
                .log(Level::Error, Some(Value::Object(data)), "Failed to process client log");
            tracing::error!(client_ip = %client_ip, error = %e, "Envelope processing failed");
            metrics::record_envelope("unknown", 500);
            e.into_response()
        }
    }
}

async fn ingest(
    state: &IngestState,
    headers: &HeaderMap,
    body: Body,
    client_ip: &str,
) -> Result<Response, IngestError> {
    let bytes = axum::body::to_bytes(body, state.max_body_bytes).await?;
    let payload: Value = serde_json::from_slice(&bytes)?;

    if let Err(e) = validate_envelope(&payload) {
        tracing::debug!(client_ip = %client_ip, reason = %e, "Rejected envelope");
        metrics::record_envelope("invalid", 400);
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid log data structure" })),
        )
            .into_response());
    }

    let Value::Object(mut envelope) = payload else {
        return Ok(StatusCode::BAD_REQUEST.into_response());
    };
    enrich(&mut envelope, headers, client_ip);
    if !state.env.is_development() {
        state.redactor.redact(&mut envelope);
    }

    let event = envelope
        .get("event")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let message = format!(
        "client {} {} {}",
        event,
        envelope.get("method").and_then(Value::as_str).unwrap_or(""),
        envelope.get("url").and_then(Value::as_str).unwrap_or(""),
    );

    state
        .emitter
        .try_log(severity_of(&event), Some(Value::Object(envelope)), message.trim_end())?;
    metrics::record_envelope(&event, 200);

    Ok((StatusCode::OK, Json(json!({ "success": true }))).into_response())
}

/// Server-side fields added to every accepted envelope.
pub fn enrich(envelope: &mut Map<String, Value>, headers: &HeaderMap, client_ip: &str) {
    envelope.insert("serverTimestamp".into(), Value::String(now_iso()));
    envelope.insert("clientIP".into(), Value::String(client_ip.to_string()));
    for (name, key) in [(header::USER_AGENT, "userAgent"), (header::REFERER, "referer")] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            envelope.insert(key.into(), Value::String(value.to_string()));
        }
    }
    envelope.insert("environment".into(), Value::String(Side::Client.as_str().into()));
}

fn with_cors(mut response: Response, origin: HeaderValue) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut chain = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain.join("\n  caused by: ")
}
