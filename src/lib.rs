//! Client/server logging bridge.
//!
//! One logger for both sides of a web application: on the server, lifecycle
//! events and scoped records go straight to a structured emitter; on the
//! client, outbound HTTP calls are mirrored into request envelopes and sent
//! to an ingestion endpoint, which re-emits them server side.
//!
//! # Architecture Overview
//!
//! ```text
//!   client                                          server
//!   ──────                                          ──────
//!   HttpPrimitive ──▶ InstrumentedTransport         IngestServer (axum)
//!                        │ request_start             │ validate, enrich, redact
//!                        │ request_success/error     ▼
//!                        ▼                          Emitter ──▶ Sink (tracing)
//!                     Dispatcher ──── POST ────────▶ ▲
//!                        │                           │
//!                        └── server side: emit ──────┘
//!
//!   Environment (capability)  ·  ConfigStore (snapshot)  ·  Context gate
//! ```

pub mod config;
pub mod emitter;
pub mod env;
pub mod event;
pub mod gate;
pub mod ingest;
pub mod instrument;
pub mod logger;
pub mod observability;
pub mod timing;

pub use config::BridgeConfig;
pub use emitter::{Emitter, Level};
pub use env::{Environment, Side, StaticEnvironment, SystemEnvironment};
pub use event::RequestEvent;
pub use gate::LoggerContext;
pub use ingest::IngestServer;
pub use logger::{
    create_child_logger, create_logger, default_emitter, ConfigPatch, LoggerHandle,
    UniversalLogger,
};
pub use timing::{measure_duration, measure_duration_quiet, Measured};
