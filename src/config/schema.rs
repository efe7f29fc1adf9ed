//! Configuration schema definitions.
//!
//! This module defines the file-backed configuration for the bridge.
//! All types derive Serde traits for deserialization from TOML.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Conventional ingestion path.
pub const DEFAULT_LOG_ENDPOINT: &str = "/api/logs";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Ingestion endpoint settings (server side).
    pub ingest: IngestConfig,

    /// Universal logger settings (serializable part).
    pub logger: LoggerSettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Ingestion endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Route path for envelopes.
    pub path: String,

    /// Maximum accepted body size in bytes.
    pub max_body_bytes: usize,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Per-IP rate limiting.
    pub rate_limit: RateLimitConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            path: DEFAULT_LOG_ENDPOINT.to_string(),
            max_body_bytes: 64 * 1024,
            request_timeout_secs: 10,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per client IP per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 60,
        }
    }
}

/// Serializable universal logger settings. Hooks live in `LoggerConfig`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerSettings {
    /// Global kill switch.
    pub enabled: bool,

    /// Where clients send envelopes. Relative paths are resolved against `server_origin`.
    pub client_log_endpoint: String,

    /// Base URL of the ingestion server, e.g. "http://localhost:3000".
    pub server_origin: Option<String>,

    /// Events whose url matches any of these are dropped.
    pub exclude_urls: Vec<UrlMatcher>,

    /// Capture request/response bodies.
    pub include_body: bool,

    /// Capture request/response headers.
    pub include_headers: bool,

    /// Install interceptors on first configuration in a client context.
    pub auto_setup_interceptors: bool,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            client_log_endpoint: DEFAULT_LOG_ENDPOINT.to_string(),
            server_origin: None,
            exclude_urls: Vec::new(),
            include_body: false,
            include_headers: false,
            auto_setup_interceptors: true,
        }
    }
}

/// Url exclusion rule: a plain string matches by containment, a pattern by regex.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(try_from = "UrlMatcherSpec", into = "UrlMatcherSpec")]
pub enum UrlMatcher {
    Contains(String),
    Pattern(Regex),
}

impl UrlMatcher {
    pub fn contains(needle: impl Into<String>) -> Self {
        UrlMatcher::Contains(needle.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(UrlMatcher::Pattern)
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            UrlMatcher::Contains(needle) => url.contains(needle.as_str()),
            UrlMatcher::Pattern(re) => re.is_match(url),
        }
    }
}

/// On-disk form of [`UrlMatcher`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum UrlMatcherSpec {
    Contains(String),
    Pattern { pattern: String },
}

impl TryFrom<UrlMatcherSpec> for UrlMatcher {
    type Error = regex::Error;

    fn try_from(spec: UrlMatcherSpec) -> Result<Self, Self::Error> {
        match spec {
            UrlMatcherSpec::Contains(s) => Ok(UrlMatcher::Contains(s)),
            UrlMatcherSpec::Pattern { pattern } => UrlMatcher::pattern(&pattern),
        }
    }
}

impl From<UrlMatcher> for UrlMatcherSpec {
    fn from(matcher: UrlMatcher) -> Self {
        match matcher {
            UrlMatcher::Contains(s) => UrlMatcherSpec::Contains(s),
            UrlMatcher::Pattern(re) => UrlMatcherSpec::Pattern {
                pattern: re.as_str().to_string(),
            },
        }
    }
}

/// Output format of the process-wide tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty in development, JSON otherwise.
    #[default]
    Auto,
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Subscriber output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Auto,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.ingest.path, "/api/logs");
        assert_eq!(config.ingest.rate_limit.max_requests, 100);
        assert_eq!(config.ingest.rate_limit.window_secs, 60);
        assert!(config.logger.enabled);
        assert!(!config.logger.include_body);
        assert!(!config.logger.include_headers);
        assert!(config.logger.auto_setup_interceptors);
    }

    #[test]
    fn test_url_matchers_from_toml() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [logger]
            exclude_urls = ["/health", { pattern = "^https://cdn\\." }]
            "#,
        )
        .unwrap();
        let matchers = &config.logger.exclude_urls;
        assert_eq!(matchers.len(), 2);
        assert!(matchers[0].matches("http://app/health?x=1"));
        assert!(matchers[1].matches("https://cdn.example.com/a.js"));
        assert!(!matchers[1].matches("http://cdn.example.com"));
    }

    #[test]
    fn test_bad_pattern_is_rejected() {
        let result: Result<BridgeConfig, _> = toml::from_str(
            r#"
            [logger]
            exclude_urls = [{ pattern = "(" }]
            "#,
        );
        assert!(result.is_err());
    }
}
