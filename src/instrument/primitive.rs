//! Swappable slot holding the process's outbound HTTP primitive.
//!
//! Application code sends through an `HttpPrimitive` instead of the raw
//! client. Installing interceptors swaps the active transport for a
//! decorated one; uninstalling restores the native transport.

use arc_swap::ArcSwap;
use std::sync::Arc;

use super::transport::{
    OutboundRequest, OutboundResponse, ReqwestTransport, Transport, TransportError,
};

struct Slot {
    native: Arc<dyn Transport>,
    active: Arc<dyn Transport>,
    wrapped: bool,
}

/// Shared handle; clones observe the same slot.
#[derive(Clone)]
pub struct HttpPrimitive {
    slot: Arc<ArcSwap<Slot>>,
}

impl std::fmt::Debug for HttpPrimitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.load();
        f.debug_struct("HttpPrimitive")
            .field("library", &slot.native.library())
            .field("wrapped", &slot.wrapped)
            .finish()
    }
}

impl Default for HttpPrimitive {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestTransport::default()))
    }
}

impl HttpPrimitive {
    pub fn new(native: Arc<dyn Transport>) -> Self {
        Self {
            slot: Arc::new(ArcSwap::from_pointee(Slot {
                active: native.clone(),
                native,
                wrapped: false,
            })),
        }
    }

    /// Send through whatever transport is currently active.
    pub async fn send(&self, request: OutboundRequest) -> Result<OutboundResponse, TransportError> {
        let active = self.slot.load().active.clone();
        active.send(request).await
    }

    pub fn library(&self) -> String {
        self.slot.load().native.library().to_string()
    }

    pub fn is_wrapped(&self) -> bool {
        self.slot.load().wrapped
    }

    /// Replace the active transport with `decorate(native)`.
    ///
    /// Always decorates the native transport, never a previous decoration.
    pub(crate) fn wrap<F>(&self, decorate: F)
    where
        F: FnOnce(Arc<dyn Transport>) -> Arc<dyn Transport>,
    {
        let native = self.slot.load().native.clone();
        let active = decorate(native.clone());
        self.slot.store(Arc::new(Slot {
            native,
            active,
            wrapped: true,
        }));
    }

    /// Make the native transport active again.
    pub(crate) fn restore(&self) {
        let native = self.slot.load().native.clone();
        self.slot.store(Arc::new(Slot {
            active: native.clone(),
            native,
            wrapped: false,
        }));
    }
}
