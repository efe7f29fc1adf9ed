//! Ingestion endpoint: receives client envelopes and re-emits them server side.
//!
//! # Data Flow
//! ```text
//! POST {path} (JSON envelope)
//!     → handler.rs (method, CORS, client IP, rate limit, validation)
//!     → enrichment (serverTimestamp, clientIP, userAgent, referer, environment)
//!     → redaction in production
//!     → Emitter at the event's severity
//! ```
//!
//! # Design Decisions
//! - The rate limiter is in-process and keyed by client IP; it is not shared
//!   across instances and resets on restart
//! - Unknown envelope fields pass through untouched

pub mod client_ip;
pub mod handler;
pub mod rate_limit;
pub mod server;

pub use client_ip::resolve_client_ip;
pub use handler::{handle_envelope, IngestError, IngestState};
pub use rate_limit::RateLimiter;
pub use server::{shutdown_signal, IngestServer};
