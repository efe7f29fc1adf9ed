//! Execution environment classification.
//!
//! # Responsibilities
//! - Tell client-side code apart from server-side code
//! - Tell development deployments apart from production ones
//! - Expose the development module allow-list and the minimum log level
//!
//! # Design Decisions
//! - Every answer is computed at call time; nothing is cached, so the same
//!   binary can serve both roles and tests can swap the capability
//! - Anything other than `development` is treated as production

use serde::{Deserialize, Serialize};

use crate::emitter::Level;

/// Deployment mode variable. `development` enables pretty output and module filtering.
pub const DEPLOYMENT_MODE_VAR: &str = "NODE_ENV";
/// Comma-separated module allow-list, honoured in development only.
pub const MODULE_FILTER_VAR: &str = "LOG_MODULE";
/// Minimum severity for emitted records.
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";
/// Marks the process as a client runtime (`client`) rather than a server one.
pub const RUNTIME_VAR: &str = "LOG_BRIDGE_RUNTIME";

/// Which side of the bridge is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Client,
    Server,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Client => "client",
            Side::Server => "server",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability queried by every other component instead of caching the answer.
pub trait Environment: Send + Sync + std::fmt::Debug {
    /// True when running in a client (browser-like) context.
    fn is_client(&self) -> bool;

    /// True when running in a server context.
    fn is_server(&self) -> bool {
        !self.is_client()
    }

    /// True for development deployments.
    fn is_development(&self) -> bool;

    /// Raw deployment mode, if one is set.
    fn deployment_mode(&self) -> Option<String>;

    /// Module names permitted to log, if an allow-list is configured.
    fn module_allow_list(&self) -> Option<Vec<String>>;

    /// Configured minimum level, if any.
    fn log_level(&self) -> Option<String>;

    fn side(&self) -> Side {
        if self.is_client() {
            Side::Client
        } else {
            Side::Server
        }
    }

    /// Minimum level to emit: the configured one, else `debug` in development and `info` otherwise.
    fn default_level(&self) -> Level {
        if self.is_development() {
            Level::Debug
        } else {
            Level::Info
        }
    }
}

/// Parse a comma-separated allow-list. Empty entries are dropped.
pub fn parse_allow_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Allow-list from a raw variable. A list with no entries means no filtering.
pub fn allow_list_from(raw: &str) -> Option<Vec<String>> {
    let modules = parse_allow_list(raw);
    (!modules.is_empty()).then_some(modules)
}

/// Environment backed by process state, read fresh on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn is_client(&self) -> bool {
        if cfg!(target_arch = "wasm32") {
            return true;
        }
        std::env::var(RUNTIME_VAR)
            .map(|v| v.trim().eq_ignore_ascii_case("client"))
            .unwrap_or(false)
    }

    fn is_development(&self) -> bool {
        self.deployment_mode().as_deref() == Some("development")
    }

    fn deployment_mode(&self) -> Option<String> {
        std::env::var(DEPLOYMENT_MODE_VAR).ok()
    }

    fn module_allow_list(&self) -> Option<Vec<String>> {
        std::env::var(MODULE_FILTER_VAR)
            .ok()
            .and_then(|raw| allow_list_from(&raw))
    }

    fn log_level(&self) -> Option<String> {
        std::env::var(LOG_LEVEL_VAR).ok()
    }
}

/// Fixed environment, for injection and tests.
#[derive(Debug, Clone)]
pub struct StaticEnvironment {
    side: Side,
    deployment_mode: Option<String>,
    allow_list: Option<Vec<String>>,
    log_level: Option<String>,
}

impl StaticEnvironment {
    /// A production server.
    pub fn server() -> Self {
        Self {
            side: Side::Server,
            deployment_mode: Some("production".to_string()),
            allow_list: None,
            log_level: None,
        }
    }

    /// A production client.
    pub fn client() -> Self {
        Self {
            side: Side::Client,
            ..Self::server()
        }
    }

    pub fn development(mut self) -> Self {
        self.deployment_mode = Some("development".to_string());
        self
    }

    pub fn with_deployment_mode(mut self, mode: impl Into<String>) -> Self {
        self.deployment_mode = Some(mode.into());
        self
    }

    pub fn with_allow_list(mut self, raw: &str) -> Self {
        self.allow_list = allow_list_from(raw);
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }
}

impl Environment for StaticEnvironment {
    fn is_client(&self) -> bool {
        self.side == Side::Client
    }

    fn is_development(&self) -> bool {
        self.deployment_mode.as_deref() == Some("development")
    }

    fn deployment_mode(&self) -> Option<String> {
        self.deployment_mode.clone()
    }

    fn module_allow_list(&self) -> Option<Vec<String>> {
        self.allow_list.clone()
    }

    fn log_level(&self) -> Option<String> {
        self.log_level.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allow_list_trims_and_drops_empty() {
        assert_eq!(parse_allow_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(parse_allow_list("").is_empty());
    }

    #[test]
    fn test_blank_allow_list_means_unset() {
        assert_eq!(allow_list_from(""), None);
        assert_eq!(allow_list_from(" , ,"), None);
        assert_eq!(allow_list_from("api"), Some(vec!["api".to_string()]));
        assert_eq!(StaticEnvironment::server().with_allow_list("").module_allow_list(), None);
    }

    #[test]
    fn test_static_environment_flags() {
        let env = StaticEnvironment::client().development();
        assert!(env.is_client());
        assert!(!env.is_server());
        assert!(env.is_development());
        assert_eq!(env.side(), Side::Client);
        assert_eq!(env.default_level(), Level::Debug);

        let env = StaticEnvironment::server().with_deployment_mode("staging");
        assert!(env.is_server());
        assert!(!env.is_development());
        assert_eq!(env.default_level(), Level::Info);
    }

    #[test]
    fn test_side_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Side::Client).unwrap(), "\"client\"");
        assert_eq!(Side::Server.to_string(), "server");
    }
}
