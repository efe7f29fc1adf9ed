//! HTTP instrumentation subsystem.
//!
//! # Data Flow
//! ```text
//! application code
//!     → HttpPrimitive::send (primitive.rs)
//!         [installed]   → InstrumentedTransport (interceptor.rs)
//!                           → request_start   → Dispatcher (fire and forget)
//!                           → native Transport (transport.rs)
//!                           → request_success | request_error → Dispatcher
//!         [uninstalled] → native Transport
//!
//! tower clients
//!     → InstrumentService (layer.rs), active while interceptors are installed
//! ```
//!
//! # Design Decisions
//! - Instrumentation is an explicit decorator installed at one composition
//!   point; installing twice is a no-op
//! - Outcomes of the wrapped call are never altered

pub mod capture;
pub mod interceptor;
pub mod layer;
pub mod primitive;
pub mod transport;

pub use capture::CallMeta;
pub use interceptor::{InstallState, InstrumentedTransport, Interceptors};
pub use layer::{InstrumentLayer, InstrumentService};
pub use primitive::HttpPrimitive;
pub use transport::{OutboundRequest, OutboundResponse, ReqwestTransport, Transport, TransportError};
