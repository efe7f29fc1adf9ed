//! Timing helpers that observe an operation without altering its outcome.
//!
//! Durations are wall-clock milliseconds rounded to two decimals. A failed
//! operation is logged and its error returned unchanged.

use serde_json::{json, Value};
use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use crate::emitter::{Emitter, Level};
use crate::logger::default_emitter;

/// Result of [`measure_duration_quiet`].
#[derive(Debug, Clone, PartialEq)]
pub struct Measured<T> {
    pub result: T,
    pub duration_ms: f64,
}

/// Run `operation`, log an `info` completion record (or an `error` failure
/// record) carrying `label` and `durationMs`, and return its result.
pub async fn measure_duration<T, E, F, Fut>(
    label: &str,
    operation: F,
    emitter: Option<&Emitter>,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let (outcome, duration_ms) = timed(operation).await;
    let emitter = resolve(emitter);
    match &outcome {
        Ok(_) => emitter.log(
            Level::Info,
            Some(json!({ "label": label, "durationMs": duration_ms })),
            &format!("{label} completed"),
        ),
        Err(e) => emitter.log(
            Level::Error,
            Some(failure_fields(label, duration_ms, e)),
            &format!("{label} failed"),
        ),
    }
    outcome
}

/// Like [`measure_duration`] but logs at `debug` and returns the duration too.
pub async fn measure_duration_quiet<T, E, F, Fut>(
    label: &str,
    operation: F,
    emitter: Option<&Emitter>,
) -> Result<Measured<T>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let (outcome, duration_ms) = timed(operation).await;
    let emitter = resolve(emitter);
    match outcome {
        Ok(result) => {
            emitter.log(
                Level::Debug,
                Some(json!({ "label": label, "durationMs": duration_ms })),
                &format!("{label} completed"),
            );
            Ok(Measured {
                result,
                duration_ms,
            })
        }
        Err(e) => {
            emitter.log(
                Level::Debug,
                Some(failure_fields(label, duration_ms, &e)),
                &format!("{label} failed"),
            );
            Err(e)
        }
    }
}

async fn timed<T, F, Fut>(operation: F) -> (T, f64)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    let started = Instant::now();
    let outcome = operation().await;
    let elapsed = started.elapsed().as_secs_f64() * 1000.0;
    (outcome, round2(elapsed))
}

fn round2(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}

fn failure_fields(label: &str, duration_ms: f64, error: &dyn Display) -> Value {
    json!({ "label": label, "durationMs": duration_ms, "error": error.to_string() })
}

fn resolve(emitter: Option<&Emitter>) -> Emitter {
    match emitter {
        Some(e) => e.clone(),
        None => default_emitter(),
    }
}
