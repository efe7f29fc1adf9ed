//! Builds lifecycle envelopes from captured call data.

use axum::http::{HeaderMap, Method, StatusCode, Uri};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::time::Instant;

use crate::config::LoggerSettings;
use crate::env::Side;
use crate::event::{
    generate_request_id, parse_body, EventBase, Headers, RequestError, RequestEvent, RequestStart,
    RequestSuccess,
};

/// Metadata attached to one logical call; threads the request id and start
/// instant from the start event to the terminal one.
#[derive(Debug, Clone)]
pub struct CallMeta {
    pub request_id: String,
    pub url: String,
    pub method: String,
    started: Instant,
}

impl CallMeta {
    pub fn new(method: &Method, uri: &Uri) -> Self {
        Self {
            request_id: generate_request_id(),
            url: uri.to_string(),
            method: method.as_str().to_ascii_uppercase(),
            started: Instant::now(),
        }
    }

    /// Re-sample the monotonic clock right before the underlying call.
    pub fn mark_issued(&mut self) {
        self.started = Instant::now();
    }

    /// Rounded milliseconds since the call was issued.
    pub fn elapsed_ms(&self) -> u64 {
        (self.started.elapsed().as_secs_f64() * 1000.0).round() as u64
    }

    pub fn base(&self, library: &str, side: Side) -> EventBase {
        EventBase::new(&self.request_id, &self.url, &self.method, library, side)
    }
}

/// Lower-cased header names; repeated headers are joined with ", ".
pub fn header_map(headers: &HeaderMap) -> Headers {
    let mut out = Headers::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else { continue };
        out.entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    out
}

/// Query string parameters, if any.
pub fn query_params(uri: &Uri) -> Option<Map<String, Value>> {
    let query = uri.query()?;
    let params: Map<String, Value> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect();
    (!params.is_empty()).then_some(params)
}

pub fn start_event(
    meta: &CallMeta,
    library: &str,
    side: Side,
    uri: &Uri,
    headers: &HeaderMap,
    body: Option<&[u8]>,
    settings: &LoggerSettings,
) -> RequestEvent {
    RequestEvent::RequestStart(RequestStart {
        base: meta.base(library, side),
        headers: settings.include_headers.then(|| header_map(headers)),
        body: if settings.include_body {
            body.and_then(parse_body)
        } else {
            None
        },
        params: query_params(uri),
    })
}

#[allow(clippy::too_many_arguments)]
pub fn success_event(
    meta: &CallMeta,
    library: &str,
    side: Side,
    status: StatusCode,
    headers: &HeaderMap,
    body: Option<&[u8]>,
    duration: u64,
    settings: &LoggerSettings,
) -> RequestEvent {
    RequestEvent::RequestSuccess(RequestSuccess {
        base: meta.base(library, side),
        status: status.as_u16(),
        status_text: status.canonical_reason().map(str::to_string),
        duration,
        response_headers: settings.include_headers.then(|| header_map(headers)),
        response_body: if settings.include_body {
            body.and_then(parse_body)
        } else {
            None
        },
        cached: (status == StatusCode::NOT_MODIFIED).then_some(true),
    })
}

pub fn error_event(
    meta: &CallMeta,
    library: &str,
    side: Side,
    error: &dyn Display,
    code: Option<&str>,
    duration: u64,
) -> RequestEvent {
    RequestEvent::RequestError(RequestError {
        base: meta.base(library, side),
        error: error.to_string(),
        stack: None,
        duration,
        error_code: code.map(str::to_string),
        retry: None,
    })
}
