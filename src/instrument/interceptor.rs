//! Decorator that mirrors every outbound call into lifecycle envelopes, and
//! the install/uninstall lifecycle that swaps it in.
//!
//! # Design Decisions
//! - One request id per call, shared by the start and terminal event
//! - The start event is dispatched before the call is issued and is not
//!   awaited; arrival order at the ingestion side is not guaranteed
//! - The wrapped call's result is returned untouched

use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use super::capture::{error_event, start_event, success_event, CallMeta};
use super::layer::InstrumentLayer;
use super::primitive::HttpPrimitive;
use super::transport::{OutboundRequest, OutboundResponse, Transport, TransportError};
use crate::logger::Dispatcher;
use crate::observability::metrics;

pub struct InstrumentedTransport {
    inner: Arc<dyn Transport>,
    dispatcher: Dispatcher,
}

impl InstrumentedTransport {
    pub fn new(inner: Arc<dyn Transport>, dispatcher: Dispatcher) -> Self {
        Self { inner, dispatcher }
    }
}

#[async_trait]
impl Transport for InstrumentedTransport {
    fn library(&self) -> &str {
        self.inner.library()
    }

    async fn send(&self, request: OutboundRequest) -> Result<OutboundResponse, TransportError> {
        let config = self.dispatcher.config();
        let settings = &config.settings;
        let side = self.dispatcher.environment().side();
        let library = self.inner.library();

        let mut meta = CallMeta::new(request.method(), request.uri());
        self.dispatcher.dispatch_detached(start_event(
            &meta,
            library,
            side,
            request.uri(),
            request.headers(),
            Some(request.body().as_ref()),
            settings,
        ));

        meta.mark_issued();
        let outcome = self.inner.send(request).await;
        let duration = meta.elapsed_ms();

        let terminal = match &outcome {
            Ok(response) => {
                metrics::record_instrumented_call(library, "success");
                success_event(
                    &meta,
                    library,
                    side,
                    response.status(),
                    response.headers(),
                    Some(response.body().as_ref()),
                    duration,
                    settings,
                )
            }
            Err(e) => {
                metrics::record_instrumented_call(library, "error");
                error_event(&meta, library, side, e, Some(e.code()), duration)
            }
        };
        self.dispatcher.dispatch_detached(terminal);

        outcome
    }
}

/// Interceptor installation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Uninstalled,
    Installing,
    Installed,
}

const UNINSTALLED: u8 = 0;
const INSTALLING: u8 = 1;
const INSTALLED: u8 = 2;

/// One-shot installer for the HTTP interceptors. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct Interceptors {
    state: Arc<AtomicU8>,
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InstallState {
        match self.state.load(Ordering::SeqCst) {
            INSTALLING => InstallState::Installing,
            INSTALLED => InstallState::Installed,
            _ => InstallState::Uninstalled,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.state() == InstallState::Installed
    }

    /// Wrap `primitive`. Returns false if already installed or installing.
    pub fn install(&self, primitive: &HttpPrimitive, dispatcher: &Dispatcher) -> bool {
        if self
            .state
            .compare_exchange(UNINSTALLED, INSTALLING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let dispatcher = dispatcher.clone();
        primitive.wrap(move |native| Arc::new(InstrumentedTransport::new(native, dispatcher)));
        self.state.store(INSTALLED, Ordering::SeqCst);

        tracing::debug!(library = %primitive.library(), "HTTP interceptors installed");
        true
    }

    /// Restore the native primitive. Returns false if nothing was installed.
    pub fn uninstall(&self, primitive: &HttpPrimitive) -> bool {
        if self
            .state
            .compare_exchange(INSTALLED, UNINSTALLED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        primitive.restore();
        tracing::debug!(library = %primitive.library(), "HTTP interceptors removed");
        true
    }

    /// Tower layer that instruments only while these interceptors are installed.
    pub fn layer(&self, dispatcher: &Dispatcher, library: impl Into<String>) -> InstrumentLayer {
        InstrumentLayer::new(dispatcher.clone(), self.clone(), library)
    }
}
