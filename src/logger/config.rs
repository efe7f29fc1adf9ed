//! Process-wide logger configuration.
//!
//! `LoggerConfig` pairs the serializable [`LoggerSettings`] with code-only
//! hooks. A [`ConfigStore`] holds the current snapshot; every reader goes
//! through [`ConfigStore::snapshot`] and every writer merges a
//! [`ConfigPatch`], so a configuration is never partially replaced.

use arc_swap::ArcSwap;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use super::dispatch::DispatchError;
use crate::config::{LoggerSettings, UrlMatcher};
use crate::event::RequestEvent;

/// Returns extra context merged into every event's `context`.
pub type ContextProvider = Arc<dyn Fn() -> Map<String, Value> + Send + Sync>;
/// Applied last, after enrichment and before dispatch.
pub type TransformLog = Arc<dyn Fn(RequestEvent) -> RequestEvent + Send + Sync>;
/// Called when client-side transmission fails.
pub type ErrorHandler = Arc<dyn Fn(&DispatchError) + Send + Sync>;

#[derive(Clone, Default)]
pub struct LoggerHooks {
    pub context_provider: Option<ContextProvider>,
    pub transform_log: Option<TransformLog>,
    pub on_error: Option<ErrorHandler>,
}

impl fmt::Debug for LoggerHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerHooks")
            .field("context_provider", &self.context_provider.is_some())
            .field("transform_log", &self.transform_log.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoggerConfig {
    pub settings: LoggerSettings,
    pub hooks: LoggerHooks,
}

/// Partial configuration. `None` leaves the current value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigPatch {
    pub enabled: Option<bool>,
    pub client_log_endpoint: Option<String>,
    pub server_origin: Option<String>,
    pub exclude_urls: Option<Vec<UrlMatcher>>,
    pub include_body: Option<bool>,
    pub include_headers: Option<bool>,
    pub auto_setup_interceptors: Option<bool>,
    pub hooks: LoggerHooks,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn client_log_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.client_log_endpoint = Some(endpoint.into());
        self
    }

    pub fn server_origin(mut self, origin: impl Into<String>) -> Self {
        self.server_origin = Some(origin.into());
        self
    }

    pub fn exclude_urls(mut self, matchers: Vec<UrlMatcher>) -> Self {
        self.exclude_urls = Some(matchers);
        self
    }

    pub fn include_body(mut self, include: bool) -> Self {
        self.include_body = Some(include);
        self
    }

    pub fn include_headers(mut self, include: bool) -> Self {
        self.include_headers = Some(include);
        self
    }

    pub fn auto_setup_interceptors(mut self, auto: bool) -> Self {
        self.auto_setup_interceptors = Some(auto);
        self
    }

    pub fn context_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> Map<String, Value> + Send + Sync + 'static,
    {
        self.hooks.context_provider = Some(Arc::new(provider));
        self
    }

    pub fn transform_log<F>(mut self, transform: F) -> Self
    where
        F: Fn(RequestEvent) -> RequestEvent + Send + Sync + 'static,
    {
        self.hooks.transform_log = Some(Arc::new(transform));
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&DispatchError) + Send + Sync + 'static,
    {
        self.hooks.on_error = Some(Arc::new(handler));
        self
    }

    /// Merge this patch over `base`.
    pub fn apply(&self, base: &LoggerConfig) -> LoggerConfig {
        let mut next = base.clone();
        let s = &mut next.settings;
        if let Some(v) = self.enabled {
            s.enabled = v;
        }
        if let Some(v) = &self.client_log_endpoint {
            s.client_log_endpoint = v.clone();
        }
        if let Some(v) = &self.server_origin {
            s.server_origin = Some(v.clone());
        }
        if let Some(v) = &self.exclude_urls {
            s.exclude_urls = v.clone();
        }
        if let Some(v) = self.include_body {
            s.include_body = v;
        }
        if let Some(v) = self.include_headers {
            s.include_headers = v;
        }
        if let Some(v) = self.auto_setup_interceptors {
            s.auto_setup_interceptors = v;
        }

        let h = &mut next.hooks;
        if let Some(v) = &self.hooks.context_provider {
            h.context_provider = Some(v.clone());
        }
        if let Some(v) = &self.hooks.transform_log {
            h.transform_log = Some(v.clone());
        }
        if let Some(v) = &self.hooks.on_error {
            h.on_error = Some(v.clone());
        }
        next
    }
}

/// A file-loaded settings block becomes a patch that overrides every field.
impl From<LoggerSettings> for ConfigPatch {
    fn from(s: LoggerSettings) -> Self {
        Self {
            enabled: Some(s.enabled),
            client_log_endpoint: Some(s.client_log_endpoint),
            server_origin: s.server_origin,
            exclude_urls: Some(s.exclude_urls),
            include_body: Some(s.include_body),
            include_headers: Some(s.include_headers),
            auto_setup_interceptors: Some(s.auto_setup_interceptors),
            hooks: LoggerHooks::default(),
        }
    }
}

/// Single accessor for the current configuration.
#[derive(Debug, Default)]
pub struct ConfigStore {
    current: ArcSwap<LoggerConfig>,
}

impl ConfigStore {
    pub fn new(initial: LoggerConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Immutable snapshot; later merges do not affect it.
    pub fn snapshot(&self) -> Arc<LoggerConfig> {
        self.current.load_full()
    }

    /// Merge `patch` into the current configuration and return the result.
    pub fn merge(&self, patch: &ConfigPatch) -> Arc<LoggerConfig> {
        self.current.rcu(|current| patch.apply(current));
        self.snapshot()
    }

    pub fn replace(&self, config: LoggerConfig) {
        self.current.store(Arc::new(config));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LOG_ENDPOINT;

    #[test]
    fn test_defaults() {
        let store = ConfigStore::default();
        let config = store.snapshot();
        assert!(config.settings.enabled);
        assert_eq!(config.settings.client_log_endpoint, DEFAULT_LOG_ENDPOINT);
        assert!(!config.settings.include_body);
        assert!(!config.settings.include_headers);
        assert!(config.settings.auto_setup_interceptors);
        assert!(config.hooks.context_provider.is_none());
    }

    #[test]
    fn test_merge_keeps_unpatched_fields() {
        let store = ConfigStore::default();
        store.merge(&ConfigPatch::new().include_body(true));
        let config = store.merge(&ConfigPatch::new().client_log_endpoint("/logs"));

        assert!(config.settings.include_body);
        assert_eq!(config.settings.client_log_endpoint, "/logs");
        assert!(config.settings.enabled);
    }

    #[test]
    fn test_hooks_survive_later_merges() {
        let store = ConfigStore::default();
        store.merge(&ConfigPatch::new().context_provider(Map::new));
        let config = store.merge(&ConfigPatch::new().enabled(false));

        assert!(config.hooks.context_provider.is_some());
        assert!(!config.settings.enabled);
    }

    #[test]
    fn test_snapshot_is_stable() {
        let store = ConfigStore::default();
        let before = store.snapshot();
        store.merge(&ConfigPatch::new().enabled(false));
        assert!(before.settings.enabled);
        assert!(!store.snapshot().settings.enabled);
    }

    #[test]
    fn test_from_settings() {
        let mut settings = LoggerSettings::default();
        settings.include_headers = true;
        settings.server_origin = Some("http://localhost:3000".into());
        let config = ConfigPatch::from(settings).apply(&LoggerConfig::default());
        assert!(config.settings.include_headers);
        assert_eq!(
            config.settings.server_origin.as_deref(),
            Some("http://localhost:3000")
        );
    }
}
