//! Record sinks.
//!
//! A sink is the level-based structured-record backend an [`Emitter`](super::Emitter)
//! writes into. Production roots write flat JSON lines through `JsonLinesSink`
//! so every field stays a top-level key. Development roots go through
//! `TracingSink` and the pretty subscriber. `ConsoleSink` is the fallback used
//! when the default cannot be built. `CapturingSink` keeps records in memory.

use std::io::Write;
use std::sync::{Arc, Mutex};

use super::{EmitterError, Level, Record};

/// Target under which records are handed to `tracing`.
pub const RECORD_TARGET: &str = "log_bridge::record";

/// Level-based structured-record backend.
pub trait Sink: Send + Sync + std::fmt::Debug {
    fn emit(&self, record: &Record) -> Result<(), EmitterError>;
}

/// Forwards records to the installed `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn emit(&self, record: &Record) -> Result<(), EmitterError> {
        let fields = serde_json::to_string(&record.fields)?;
        let msg = record.msg.as_str();
        match record.level {
            Level::Trace => tracing::trace!(target: RECORD_TARGET, fields = %fields, "{}", msg),
            Level::Debug => tracing::debug!(target: RECORD_TARGET, fields = %fields, "{}", msg),
            Level::Info => tracing::info!(target: RECORD_TARGET, fields = %fields, "{}", msg),
            Level::Warn => tracing::warn!(target: RECORD_TARGET, fields = %fields, "{}", msg),
            Level::Error => tracing::error!(target: RECORD_TARGET, fields = %fields, "{}", msg),
            Level::Fatal => {
                tracing::error!(target: RECORD_TARGET, fatal = true, fields = %fields, "{}", msg)
            }
        }
        Ok(())
    }
}

/// Writes `Record::to_json()` as one line per record.
pub struct JsonLinesSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl std::fmt::Debug for JsonLinesSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink").finish_non_exhaustive()
    }
}

impl Sink for JsonLinesSink {
    fn emit(&self, record: &Record) -> Result<(), EmitterError> {
        let mut line = serde_json::to_vec(&record.to_json())?;
        line.push(b'\n');
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Writes one JSON line per record to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn emit(&self, record: &Record) -> Result<(), EmitterError> {
        let line = serde_json::to_string(&record.to_json())?;
        let mut stderr = std::io::stderr().lock();
        writeln!(stderr, "{}", line)?;
        Ok(())
    }
}

/// Keeps every record in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CapturingSink {
    records: Arc<Mutex<Vec<Record>>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured records.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Records at exactly `level`.
    pub fn at_level(&self, level: Level) -> Vec<Record> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl Sink for CapturingSink {
    fn emit(&self, record: &Record) -> Result<(), EmitterError> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
        Ok(())
    }
}
