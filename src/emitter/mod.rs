//! Structured emitter subsystem.
//!
//! # Data Flow
//! ```text
//! caller: emitter.info_with(data, "msg")
//!     → level check against the emitter's minimum level
//!     → merge scoped fields + emission-time data (emission wins)
//!     → stamp wall-clock time (record.rs)
//!     → Sink::emit (sink.rs: json lines / tracing / console / capture)
//! ```
//!
//! # Design Decisions
//! - `Emitter` is a closed set: `Real` or `Null`. The context gate picks one;
//!   children of `Null` stay `Null`
//! - Level methods never fail; `try_log` exists for callers that must know
//! - Production roots write flat JSON lines to stdout; development roots
//!   go through `tracing` for pretty output
//! - If the default sink cannot be built, the root falls back to the
//!   console sink and says so once

pub mod record;
pub mod sink;

use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::env::Environment;

pub use record::{merge_fields, Level, Record};
pub use sink::{CapturingSink, ConsoleSink, JsonLinesSink, Sink, TracingSink};

static FALLBACK_WARNED: AtomicBool = AtomicBool::new(false);

/// JSON lines on stdout in production, `tracing` in development.
pub fn default_sink(env: &dyn Environment) -> Arc<dyn Sink> {
    if env.is_development() {
        Arc::new(TracingSink)
    } else {
        Arc::new(JsonLinesSink::stdout())
    }
}

/// Errors raised while building or writing through an emitter.
#[derive(Debug, Error)]
pub enum EmitterError {
    #[error("invalid log level '{0}'")]
    InvalidLevel(String),

    #[error("failed to write record: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Emitter writing real records.
#[derive(Debug, Clone)]
pub struct ScopedEmitter {
    sink: Arc<dyn Sink>,
    fields: Arc<Map<String, Value>>,
    min_level: Level,
}

/// Scoped logging interface: per-severity methods plus `child`.
#[derive(Debug, Clone)]
pub enum Emitter {
    Real(ScopedEmitter),
    Null,
}

impl Emitter {
    pub fn new(sink: Arc<dyn Sink>, min_level: Level) -> Self {
        Emitter::Real(ScopedEmitter {
            sink,
            fields: Arc::new(Map::new()),
            min_level,
        })
    }

    pub fn null() -> Self {
        Emitter::Null
    }

    /// Root emitter for the environment, falling back to the console.
    pub fn root(env: &dyn Environment) -> Self {
        Self::root_with_sink(env, default_sink(env))
    }

    /// Root emitter on `sink`, with the level taken from the environment.
    ///
    /// An unusable configuration yields a console emitter and one warning.
    pub fn root_with_sink(env: &dyn Environment, sink: Arc<dyn Sink>) -> Self {
        Self::root_or_fallback(env, sink, Arc::new(ConsoleSink), &FALLBACK_WARNED)
    }

    fn root_or_fallback(
        env: &dyn Environment,
        sink: Arc<dyn Sink>,
        fallback_sink: Arc<dyn Sink>,
        warned: &AtomicBool,
    ) -> Self {
        match Self::try_root(env, sink) {
            Ok(emitter) => emitter,
            Err(e) => {
                let fallback = Emitter::new(fallback_sink, env.default_level());
                if !warned.swap(true, Ordering::SeqCst) {
                    let mut data = Map::new();
                    data.insert("error".into(), Value::String(e.to_string()));
                    fallback.warn_with(
                        Value::Object(data),
                        "structured sink unavailable, falling back to console output",
                    );
                }
                fallback
            }
        }
    }

    pub fn try_root(env: &dyn Environment, sink: Arc<dyn Sink>) -> Result<Self, EmitterError> {
        let level = match env.log_level() {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => env.default_level(),
        };
        Ok(Emitter::new(sink, level))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Emitter::Null)
    }

    /// Whether a record at `level` would be written.
    pub fn enabled(&self, level: Level) -> bool {
        match self {
            Emitter::Real(inner) => level >= inner.min_level,
            Emitter::Null => false,
        }
    }

    /// Fields carried by every record of this emitter.
    pub fn fields(&self) -> Map<String, Value> {
        match self {
            Emitter::Real(inner) => inner.fields.as_ref().clone(),
            Emitter::Null => Map::new(),
        }
    }

    /// New emitter whose records carry `fields` in addition to this one's.
    pub fn child(&self, fields: Map<String, Value>) -> Emitter {
        match self {
            Emitter::Real(inner) => {
                let mut merged = inner.fields.as_ref().clone();
                merged.extend(fields);
                Emitter::Real(ScopedEmitter {
                    sink: inner.sink.clone(),
                    fields: Arc::new(merged),
                    min_level: inner.min_level,
                })
            }
            Emitter::Null => Emitter::Null,
        }
    }

    /// Write a record, reporting sink failures. Filtered records are `Ok`.
    pub fn try_log(&self, level: Level, data: Option<Value>, msg: &str) -> Result<(), EmitterError> {
        let inner = match self {
            Emitter::Real(inner) if level >= inner.min_level => inner,
            _ => return Ok(()),
        };
        let record = Record::new(level, msg, merge_fields(&inner.fields, data));
        inner.sink.emit(&record)
    }

    /// Write a record; sink failures are dropped.
    pub fn log(&self, level: Level, data: Option<Value>, msg: &str) {
        if let Err(e) = self.try_log(level, data, msg) {
            tracing::debug!(error = %e, "Dropped log record");
        }
    }

    pub fn trace(&self, msg: impl AsRef<str>) {
        self.log(Level::Trace, None, msg.as_ref());
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        self.log(Level::Debug, None, msg.as_ref());
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.log(Level::Info, None, msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.log(Level::Warn, None, msg.as_ref());
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.log(Level::Error, None, msg.as_ref());
    }

    pub fn fatal(&self, msg: impl AsRef<str>) {
        self.log(Level::Fatal, None, msg.as_ref());
    }

    pub fn trace_with(&self, data: Value, msg: impl AsRef<str>) {
        self.log(Level::Trace, Some(data), msg.as_ref());
    }

    pub fn debug_with(&self, data: Value, msg: impl AsRef<str>) {
        self.log(Level::Debug, Some(data), msg.as_ref());
    }

    pub fn info_with(&self, data: Value, msg: impl AsRef<str>) {
        self.log(Level::Info, Some(data), msg.as_ref());
    }

    pub fn warn_with(&self, data: Value, msg: impl AsRef<str>) {
        self.log(Level::Warn, Some(data), msg.as_ref());
    }

    pub fn error_with(&self, data: Value, msg: impl AsRef<str>) {
        self.log(Level::Error, Some(data), msg.as_ref());
    }

    pub fn fatal_with(&self, data: Value, msg: impl AsRef<str>) {
        self.log(Level::Fatal, Some(data), msg.as_ref());
    }
}
