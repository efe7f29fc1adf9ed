//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BridgeConfig
//!         ingest   → IngestServer
//!         logger   → ConfigStore (merged with code-supplied hooks/patches)
//!         observability → logging / metrics setup
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Hooks (functions) never come from files; see `logger::config`

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BridgeConfig, IngestConfig, LogFormat, LoggerSettings, ObservabilityConfig, RateLimitConfig,
    UrlMatcher, DEFAULT_LOG_ENDPOINT,
};
