//! Severity levels and emitted records.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use super::EmitterError;

/// Record severity, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = EmitterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            other => Err(EmitterError::InvalidLevel(other.to_string())),
        }
    }
}

/// One emitted record: severity, message, merged fields and emission time.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub level: Level,
    pub time: DateTime<Utc>,
    pub msg: String,
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(level: Level, msg: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            level,
            time: Utc::now(),
            msg: msg.into(),
            fields,
        }
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Flat JSON rendering: `level`, `time` and `msg` next to the merged fields.
    pub fn to_json(&self) -> Value {
        let mut out = self.fields.clone();
        out.insert("level".into(), Value::String(self.level.as_str().into()));
        out.insert(
            "time".into(),
            Value::String(self.time.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        out.insert("msg".into(), Value::String(self.msg.clone()));
        Value::Object(out)
    }
}

/// Merge emission-time data over scoped fields. Emission-time keys win.
///
/// Non-object data is kept under a `data` key.
pub fn merge_fields(base: &Map<String, Value>, data: Option<Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    match data {
        Some(Value::Object(extra)) => merged.extend(extra),
        Some(Value::Null) | None => {}
        Some(other) => {
            merged.insert("data".into(), other);
        }
    }
    merged
}
