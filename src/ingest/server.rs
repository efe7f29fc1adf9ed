//! Ingestion server setup.
//!
//! # Responsibilities
//! - Build the axum router for the envelope endpoint
//! - Wire up middleware (tracing, timeout, body size limit)
//! - Serve on a listener until the shutdown future resolves

use axum::{routing::any, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::handler::{handle_envelope, IngestState};
use super::rate_limit::RateLimiter;
use crate::config::IngestConfig;
use crate::emitter::Emitter;
use crate::env::Environment;
use crate::event::Redactor;

/// HTTP server for client envelopes.
pub struct IngestServer {
    config: IngestConfig,
    state: IngestState,
}

impl IngestServer {
    pub fn new(config: IngestConfig, emitter: Emitter, env: Arc<dyn Environment>) -> Self {
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::from_config(&config.rate_limit)));

        let state = IngestState {
            emitter,
            env,
            limiter,
            redactor: Arc::new(Redactor::default()),
            max_body_bytes: config.max_body_bytes,
        };
        Self { config, state }
    }

    /// Router with the endpoint and its middleware, for mounting or serving.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.config.path, any(handle_envelope))
            .with_state(self.state.clone())
            .layer(RequestBodyLimitLayer::new(self.config.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            path = %self.config.path,
            rate_limit = self.config.rate_limit.enabled,
            "Ingestion server starting"
        );

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Ingestion server stopped");
        Ok(())
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }
}

/// Resolves on Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
