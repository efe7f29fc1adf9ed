//! Event envelope protocol.
//!
//! # Data Flow
//! ```text
//! instrumentation wraps one outbound call:
//!     → request_start   (requestId generated once, id.rs)
//!     → request_success | request_error  (same requestId, duration from start)
//!
//! ingestion boundary:
//!     → validation.rs (event / requestId / url present)
//!     → redaction.rs  (production only)
//! ```
//!
//! # Design Decisions
//! - Envelopes are a tagged union discriminated by `event`
//! - Wire field names are camelCase
//! - The boundary validates raw JSON so unknown events and fields pass through

pub mod id;
pub mod redaction;
pub mod validation;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::emitter::Level;
use crate::env::Side;

pub use id::generate_request_id;
pub use redaction::Redactor;
pub use validation::{validate_envelope, ValidationError};

/// Header map as carried on the wire.
pub type Headers = BTreeMap<String, String>;

/// Fields shared by every lifecycle event of one outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBase {
    pub request_id: String,
    pub timestamp: String,
    pub url: String,
    pub method: String,
    pub library: String,
    pub environment: Side,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

impl EventBase {
    /// Base stamped with the current time. `method` is upper-cased.
    pub fn new(
        request_id: impl Into<String>,
        url: impl Into<String>,
        method: &str,
        library: impl Into<String>,
        environment: Side,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            timestamp: now_iso(),
            url: url.into(),
            method: method.to_ascii_uppercase(),
            library: library.into(),
            environment,
            context: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStart {
    #[serde(flatten)]
    pub base: EventBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSuccess {
    #[serde(flatten)]
    pub base: EventBase,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    /// Milliseconds since the start event's call was issued.
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<Headers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestError {
    #[serde(flatten)]
    pub base: EventBase,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
}

/// One envelope describing a stage of an outbound call's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RequestEvent {
    RequestStart(RequestStart),
    RequestSuccess(RequestSuccess),
    RequestError(RequestError),
}

impl RequestEvent {
    pub fn base(&self) -> &EventBase {
        match self {
            RequestEvent::RequestStart(e) => &e.base,
            RequestEvent::RequestSuccess(e) => &e.base,
            RequestEvent::RequestError(e) => &e.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut EventBase {
        match self {
            RequestEvent::RequestStart(e) => &mut e.base,
            RequestEvent::RequestSuccess(e) => &mut e.base,
            RequestEvent::RequestError(e) => &mut e.base,
        }
    }

    /// Wire name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            RequestEvent::RequestStart(_) => "request_start",
            RequestEvent::RequestSuccess(_) => "request_success",
            RequestEvent::RequestError(_) => "request_error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestEvent::RequestStart(_))
    }

    /// `error` for failures, `info` for everything else.
    pub fn severity(&self) -> Level {
        match self {
            RequestEvent::RequestError(_) => Level::Error,
            RequestEvent::RequestStart(_) | RequestEvent::RequestSuccess(_) => Level::Info,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.base().request_id
    }

    pub fn url(&self) -> &str {
        &self.base().url
    }

    /// Short human-readable summary used as the record message.
    pub fn summary(&self) -> String {
        let base = self.base();
        match self {
            RequestEvent::RequestStart(_) => format!("{} {} started", base.method, base.url),
            RequestEvent::RequestSuccess(e) => {
                format!("{} {} -> {} ({}ms)", base.method, base.url, e.status, e.duration)
            }
            RequestEvent::RequestError(e) => {
                format!("{} {} failed: {} ({}ms)", base.method, base.url, e.error, e.duration)
            }
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Event severity for a raw envelope: `request_error` is `error`, anything else `info`.
pub fn severity_of(event_name: &str) -> Level {
    if event_name == "request_error" {
        Level::Error
    } else {
        Level::Info
    }
}

/// Current wall-clock time as ISO-8601 with millisecond precision.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Best-effort JSON decoding of a textual payload; falls back to the raw string.
pub fn parse_body(raw: &[u8]) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_slice(raw) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(String::from_utf8_lossy(raw).into_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn success() -> RequestEvent {
        RequestEvent::RequestSuccess(RequestSuccess {
            base: EventBase::new("req_1", "/x", "get", "reqwest", Side::Client),
            status: 200,
            status_text: Some("OK".into()),
            duration: 10,
            response_headers: None,
            response_body: None,
            cached: None,
        })
    }

    #[test]
    fn test_wire_shape_is_flat_and_camel_case() {
        let value = success().to_value();
        assert_eq!(value["event"], "request_success");
        assert_eq!(value["requestId"], "req_1");
        assert_eq!(value["method"], "GET");
        assert_eq!(value["environment"], "client");
        assert_eq!(value["statusText"], "OK");
        assert!(value.get("responseBody").is_none());
    }

    #[test]
    fn test_parses_error_envelope() {
        let raw = json!({
            "event": "request_error",
            "requestId": "r",
            "timestamp": "2024-01-01T00:00:00.000Z",
            "url": "/api",
            "method": "POST",
            "library": "tower",
            "environment": "server",
            "error": "connection reset",
            "duration": 3,
            "errorCode": "ECONNRESET"
        });
        let event: RequestEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.name(), "request_error");
        assert_eq!(event.severity(), Level::Error);
        assert!(event.is_terminal());
        match event {
            RequestEvent::RequestError(e) => {
                assert_eq!(e.error_code.as_deref(), Some("ECONNRESET"));
                assert_eq!(e.retry, None);
            }
            other => panic!("unexpected variant {:?}", other),
        }
    }

    #[test]
    fn test_severity_of_raw_names() {
        assert_eq!(severity_of("request_error"), Level::Error);
        assert_eq!(severity_of("request_start"), Level::Info);
        assert_eq!(severity_of("custom_event"), Level::Info);
    }

    #[test]
    fn test_parse_body_falls_back_to_text() {
        assert_eq!(parse_body(br#"{"a":1}"#), Some(json!({"a": 1})));
        assert_eq!(parse_body(b"plain"), Some(json!("plain")));
        assert_eq!(parse_body(b""), None);
    }

    #[test]
    fn test_summary_mentions_status() {
        assert_eq!(success().summary(), "GET /x -> 200 (10ms)");
    }
}
