//! Redaction of credentials before a record leaves the process.
//!
//! Header maps (`headers`, `responseHeaders`) lose `authorization` and
//! `cookie`; bodies (`body`, `responseBody`) lose every `password` key at any
//! depth. Key matching is case-insensitive. Unchanged envelopes are not cloned.

use serde_json::{Map, Value};
use std::collections::HashSet;

pub const REDACTED: &str = "[REDACTED]";

const HEADER_CONTAINERS: [&str; 2] = ["headers", "responseHeaders"];
const BODY_CONTAINERS: [&str; 2] = ["body", "responseBody"];

#[derive(Debug, Clone)]
pub struct Redactor {
    header_keys: HashSet<String>,
    body_keys: HashSet<String>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(["authorization", "cookie"], ["password"])
    }
}

impl Redactor {
    pub fn new<H, B>(header_keys: H, body_keys: B) -> Self
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        B: IntoIterator,
        B::Item: AsRef<str>,
    {
        Self {
            header_keys: header_keys
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
            body_keys: body_keys
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Redact an envelope or record in place.
    pub fn redact(&self, envelope: &mut Map<String, Value>) {
        for container in HEADER_CONTAINERS {
            if let Some(Value::Object(headers)) = envelope.get_mut(container) {
                for (key, value) in headers.iter_mut() {
                    if self.header_keys.contains(&key.to_lowercase()) {
                        *value = Value::String(REDACTED.into());
                    }
                }
            }
        }
        for container in BODY_CONTAINERS {
            if let Some(body) = envelope.get(container) {
                if let Some(redacted) = self.redact_body(body) {
                    envelope.insert(container.into(), redacted);
                }
            }
        }
    }

    /// Returns `None` when nothing needed redacting.
    fn redact_body(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                let mut changed = false;
                for (key, val) in map {
                    if self.body_keys.contains(&key.to_lowercase()) {
                        out.insert(key.clone(), Value::String(REDACTED.into()));
                        changed = true;
                    } else if let Some(redacted) = self.redact_body(val) {
                        out.insert(key.clone(), redacted);
                        changed = true;
                    } else {
                        out.insert(key.clone(), val.clone());
                    }
                }
                changed.then_some(Value::Object(out))
            }
            Value::Array(items) => {
                let mut changed = false;
                let out: Vec<Value> = items
                    .iter()
                    .map(|item| match self.redact_body(item) {
                        Some(redacted) => {
                            changed = true;
                            redacted
                        }
                        None => item.clone(),
                    })
                    .collect();
                changed.then_some(Value::Array(out))
            }
            _ => None,
        }
    }
}
