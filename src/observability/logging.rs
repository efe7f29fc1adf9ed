//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the process-wide tracing subscriber
//! - Pick the output format from the deployment mode
//! - Configure the log level from `LOG_LEVEL`
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Default level is `debug` in development and `info` otherwise

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;
use crate::emitter::Level;
use crate::env::Environment;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("a global subscriber is already installed")]
    AlreadyInitialized,
}

/// Filter directives derived from the environment.
///
/// Unknown levels fall back to the deployment default.
pub fn filter_directives(env: &dyn Environment) -> String {
    let level = env
        .log_level()
        .and_then(|raw| raw.parse::<Level>().ok())
        .unwrap_or_else(|| env.default_level());
    match level {
        // tracing has no fatal level
        Level::Fatal => Level::Error.as_str().to_string(),
        other => other.as_str().to_string(),
    }
}

/// Resolve `Auto` against the environment.
pub fn effective_format(format: LogFormat, env: &dyn Environment) -> LogFormat {
    match format {
        LogFormat::Auto if env.is_development() => LogFormat::Pretty,
        LogFormat::Auto => LogFormat::Json,
        other => other,
    }
}

/// Install the global subscriber.
pub fn init_logging(env: &dyn Environment, format: LogFormat) -> Result<(), TelemetryError> {
    let directives = filter_directives(env);
    let filter = EnvFilter::try_new(&directives).map_err(|e| TelemetryError::InvalidFilter {
        directive: directives.clone(),
        reason: e.to_string(),
    })?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match effective_format(format, env) {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .try_init(),
    };
    result.map_err(|_| TelemetryError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StaticEnvironment;

    #[test]
    fn test_filter_defaults_follow_deployment_mode() {
        assert_eq!(filter_directives(&StaticEnvironment::server()), "info");
        assert_eq!(filter_directives(&StaticEnvironment::server().development()), "debug");
        assert_eq!(
            filter_directives(&StaticEnvironment::server().with_log_level("WARN")),
            "warn"
        );
        assert_eq!(
            filter_directives(&StaticEnvironment::server().with_log_level("fatal")),
            "error"
        );
    }

    #[test]
    fn test_unknown_level_uses_default() {
        assert_eq!(
            filter_directives(&StaticEnvironment::server().with_log_level("shouting")),
            "info"
        );
        assert_eq!(
            filter_directives(&StaticEnvironment::server().development().with_log_level("shouting")),
            "debug"
        );
        assert_eq!(
            filter_directives(&StaticEnvironment::server().with_log_level("  ")),
            "info"
        );
        assert!(EnvFilter::try_new(filter_directives(
            &StaticEnvironment::server().with_log_level("warning")
        ))
        .is_ok());
    }

    #[test]
    fn test_auto_format() {
        let dev = StaticEnvironment::server().development();
        let prod = StaticEnvironment::server();
        assert_eq!(effective_format(LogFormat::Auto, &dev), LogFormat::Pretty);
        assert_eq!(effective_format(LogFormat::Auto, &prod), LogFormat::Json);
        assert_eq!(effective_format(LogFormat::Pretty, &prod), LogFormat::Pretty);
    }

    #[test]
    fn test_second_init_is_rejected() {
        let env = StaticEnvironment::server();
        let _ = init_logging(&env, LogFormat::Json);
        assert!(matches!(
            init_logging(&env, LogFormat::Json),
            Err(TelemetryError::AlreadyInitialized)
        ));
    }
}
