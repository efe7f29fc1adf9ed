//! Per-event dispatch: filter, enrich, transform, then emit or transmit.
//!
//! # Data Flow
//! ```text
//! RequestEvent
//!     → enabled? excluded url? (drop silently)
//!     → context_provider() merged into event.context
//!     → transform_log(event)
//!     [server] → redact (production) → Emitter at event severity
//!     [client] → POST JSON to the ingestion endpoint
//!                  → failure: on_error, else one development warning
//! ```
//!
//! # Design Decisions
//! - Nothing here returns an error to the caller; failures end in `report`
//! - Server-side emission is synchronous so records keep call order
//! - Client-side transmission from `dispatch_detached` is spawned and never awaited

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use url::Url;

use super::config::{ConfigStore, LoggerConfig};
use crate::config::LoggerSettings;
use crate::emitter::Emitter;
use crate::env::Environment;
use crate::event::{Redactor, RequestEvent};
use crate::observability::metrics;

/// Client-side transmission failure.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("cannot resolve log endpoint '{endpoint}': {reason}")]
    Endpoint { endpoint: String, reason: String },

    #[error("failed to transmit event: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ingestion endpoint responded with status {0}")]
    Status(u16),
}

#[derive(Debug)]
struct Inner {
    env: Arc<dyn Environment>,
    config: Arc<ConfigStore>,
    emitter: Emitter,
    redactor: Redactor,
    client: reqwest::Client,
    warned: AtomicBool,
}

/// Routes events to the local emitter (server) or the ingestion endpoint (client).
#[derive(Debug, Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(env: Arc<dyn Environment>, config: Arc<ConfigStore>, emitter: Emitter) -> Self {
        Self {
            inner: Arc::new(Inner {
                env,
                config,
                emitter,
                redactor: Redactor::default(),
                client: reqwest::Client::new(),
                warned: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> Arc<LoggerConfig> {
        self.inner.config.snapshot()
    }

    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.inner.config
    }

    pub fn environment(&self) -> &dyn Environment {
        self.inner.env.as_ref()
    }

    pub fn emitter(&self) -> &Emitter {
        &self.inner.emitter
    }

    /// Dispatch and wait until the event is emitted or transmitted.
    pub async fn dispatch(&self, event: RequestEvent) {
        let Some((event, config)) = self.prepare(event) else {
            return;
        };

        if self.inner.env.is_server() {
            self.emit_local(&event);
            return;
        }

        match self.transmit(&event, &config.settings).await {
            Ok(()) => metrics::record_dispatch("client", "sent"),
            Err(e) => self.report(&config, &e),
        }
    }

    /// Fire-and-forget dispatch for the instrumentation path.
    pub fn dispatch_detached(&self, event: RequestEvent) {
        if self.inner.env.is_server() {
            if let Some((event, _)) = self.prepare(event) {
                self.emit_local(&event);
            }
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                let this = self.clone();
                handle.spawn(async move { this.dispatch(event).await });
            }
            Err(_) => {
                tracing::debug!(
                    request_id = %event.request_id(),
                    "No async runtime available, event dropped"
                );
                metrics::record_dispatch("client", "dropped");
            }
        }
    }

    /// True if `url` matches an exclusion rule or points at the ingestion endpoint.
    pub fn is_excluded(settings: &LoggerSettings, url: &str) -> bool {
        if settings.exclude_urls.iter().any(|m| m.matches(url)) {
            return true;
        }

        let endpoint = settings.client_log_endpoint.as_str();
        if endpoint.is_empty() {
            return false;
        }
        if url.contains(endpoint) {
            return true;
        }
        match Url::parse(endpoint) {
            Ok(absolute) => absolute.path() != "/" && url.contains(absolute.path()),
            Err(_) => false,
        }
    }

    /// Apply the enabled switch, exclusions and hooks. `None` means drop.
    fn prepare(&self, mut event: RequestEvent) -> Option<(RequestEvent, Arc<LoggerConfig>)> {
        let config = self.config();
        if !config.settings.enabled {
            return None;
        }
        if Self::is_excluded(&config.settings, event.url()) {
            metrics::record_dispatch(self.inner.env.side().as_str(), "excluded");
            return None;
        }

        if let Some(provider) = &config.hooks.context_provider {
            let extra = provider();
            if !extra.is_empty() {
                event
                    .base_mut()
                    .context
                    .get_or_insert_with(Default::default)
                    .extend(extra);
            }
        }

        if let Some(transform) = &config.hooks.transform_log {
            event = transform(event);
        }

        Some((event, config))
    }

    fn emit_local(&self, event: &RequestEvent) {
        let mut value = event.to_value();
        if !self.inner.env.is_development() {
            if let Value::Object(map) = &mut value {
                self.inner.redactor.redact(map);
            }
        }
        self.inner
            .emitter
            .log(event.severity(), Some(value), &event.summary());
        metrics::record_dispatch("server", "emitted");
    }

    async fn transmit(&self, event: &RequestEvent, settings: &LoggerSettings) -> Result<(), DispatchError> {
        let endpoint = resolve_endpoint(settings)?;
        let response = self.inner.client.post(endpoint).json(event).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status(status.as_u16()));
        }
        Ok(())
    }

    fn report(&self, config: &LoggerConfig, error: &DispatchError) {
        metrics::record_dispatch("client", "failed");
        if let Some(on_error) = &config.hooks.on_error {
            on_error(error);
            return;
        }
        if self.inner.env.is_development() && !self.inner.warned.swap(true, Ordering::SeqCst) {
            tracing::warn!(error = %error, "Failed to send log event to server");
        } else {
            tracing::debug!(error = %error, "Failed to send log event to server");
        }
    }
}

/// Absolute URL of the ingestion endpoint. Relative paths need `server_origin`.
pub fn resolve_endpoint(settings: &LoggerSettings) -> Result<Url, DispatchError> {
    let endpoint = settings.client_log_endpoint.as_str();
    if let Ok(url) = Url::parse(endpoint) {
        return Ok(url);
    }

    let origin = settings
        .server_origin
        .as_deref()
        .ok_or_else(|| DispatchError::Endpoint {
            endpoint: endpoint.to_string(),
            reason: "relative endpoint requires server_origin".to_string(),
        })?;

    Url::parse(origin)
        .and_then(|base| base.join(endpoint))
        .map_err(|e| DispatchError::Endpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
}
