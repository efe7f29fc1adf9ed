//! Envelope validation at the ingestion boundary.
//!
//! Only `event`, `requestId` and `url` are checked; each must be a non-empty
//! string or a number. Everything else passes through untouched.

use serde_json::Value;
use thiserror::Error;

const REQUIRED_FIELDS: [&str; 3] = ["event", "requestId", "url"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("envelope must be a JSON object")]
    NotAnObject,

    #[error("missing or empty field '{0}'")]
    MissingField(&'static str),
}

pub fn validate_envelope(envelope: &Value) -> Result<(), ValidationError> {
    let map = envelope.as_object().ok_or(ValidationError::NotAnObject)?;
    for field in REQUIRED_FIELDS {
        match map.get(field) {
            Some(Value::String(s)) if !s.is_empty() => {}
            Some(Value::Number(_)) => {}
            _ => return Err(ValidationError::MissingField(field)),
        }
    }
    Ok(())
}
