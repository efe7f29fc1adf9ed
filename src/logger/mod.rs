//! Universal logger: one entry point for both sides of the bridge.
//!
//! # Responsibilities
//! - Own the process-wide configuration (`config.rs`)
//! - Route each lifecycle event locally or to the ingestion endpoint (`dispatch.rs`)
//! - Install the HTTP interceptors once on the client
//! - Hand out scoped emitters through the context gate
//!
//! # Design Decisions
//! - Environment, emitter and native transport are injected through
//!   [`LoggerBuilder`]; [`UniversalLogger::global`] builds a default instance
//!   lazily for code that wants process-wide state
//! - Interceptor setup is triggered by `configure` on the client when
//!   `auto_setup_interceptors` is on; it can also be driven explicitly

pub mod config;
pub mod dispatch;

use serde_json::Value;
use std::sync::{Arc, OnceLock};

use crate::config::LoggerSettings;
use crate::emitter::{Emitter, Level};
use crate::env::{Environment, SystemEnvironment};
use crate::event::RequestEvent;
use crate::gate::{resolve_emitter, LoggerContext};
use crate::instrument::{
    HttpPrimitive, InstallState, InstrumentLayer, Interceptors, ReqwestTransport, Transport,
};

pub use config::{
    ConfigPatch, ConfigStore, ContextProvider, ErrorHandler, LoggerConfig, LoggerHooks,
    TransformLog,
};
pub use dispatch::{resolve_endpoint, DispatchError, Dispatcher};

static GLOBAL: OnceLock<UniversalLogger> = OnceLock::new();

/// Builder for [`UniversalLogger`].
#[derive(Default)]
pub struct LoggerBuilder {
    env: Option<Arc<dyn Environment>>,
    emitter: Option<Emitter>,
    transport: Option<Arc<dyn Transport>>,
    patch: Option<ConfigPatch>,
}

impl LoggerBuilder {
    pub fn environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = Some(env);
        self
    }

    /// Root emitter. Defaults to the tracing-backed root for the environment.
    pub fn emitter(mut self, emitter: Emitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Native outbound primitive. Defaults to reqwest.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn settings(self, settings: LoggerSettings) -> Self {
        self.patch(ConfigPatch::from(settings))
    }

    /// Initial overrides, merged over the defaults.
    pub fn patch(mut self, patch: ConfigPatch) -> Self {
        let base = match self.patch.take() {
            Some(existing) => existing.apply(&LoggerConfig::default()),
            None => LoggerConfig::default(),
        };
        let merged = patch.apply(&base);
        let mut combined = ConfigPatch::from(merged.settings);
        combined.hooks = merged.hooks;
        self.patch = Some(combined);
        self
    }

    pub fn build(self) -> UniversalLogger {
        let env = self
            .env
            .unwrap_or_else(|| Arc::new(SystemEnvironment) as Arc<dyn Environment>);
        let emitter = self.emitter.unwrap_or_else(|| Emitter::root(env.as_ref()));
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::default()) as Arc<dyn Transport>);

        let initial = match &self.patch {
            Some(patch) => patch.apply(&LoggerConfig::default()),
            None => LoggerConfig::default(),
        };
        let store = Arc::new(ConfigStore::new(initial));

        let logger = UniversalLogger {
            dispatcher: Dispatcher::new(env, store, emitter),
            primitive: HttpPrimitive::new(transport),
            interceptors: Interceptors::new(),
        };
        logger.auto_install();
        logger
    }
}

#[derive(Debug, Clone)]
pub struct UniversalLogger {
    dispatcher: Dispatcher,
    primitive: HttpPrimitive,
    interceptors: Interceptors,
}

impl UniversalLogger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    /// Process-wide instance on the system environment, built on first use.
    pub fn global() -> &'static UniversalLogger {
        GLOBAL.get_or_init(|| UniversalLogger::builder().build())
    }

    /// Merge `patch` into the configuration and return a handle.
    pub fn configure(&self, patch: ConfigPatch) -> LoggerHandle {
        self.dispatcher.config_store().merge(&patch);
        self.auto_install();
        self.handle()
    }

    pub fn handle(&self) -> LoggerHandle {
        let env = self.dispatcher.environment();
        LoggerHandle {
            is_client: env.is_client(),
            is_server: env.is_server(),
            is_development: env.is_development(),
            dispatcher: self.dispatcher.clone(),
        }
    }

    pub fn config(&self) -> Arc<LoggerConfig> {
        self.dispatcher.config()
    }

    pub async fn dispatch(&self, event: RequestEvent) {
        self.dispatcher.dispatch(event).await
    }

    /// Install the interceptors. Returns false if they already were.
    pub fn install_interceptors(&self) -> bool {
        self.interceptors.install(&self.primitive, &self.dispatcher)
    }

    pub fn uninstall_interceptors(&self) -> bool {
        self.interceptors.uninstall(&self.primitive)
    }

    pub fn interceptor_state(&self) -> InstallState {
        self.interceptors.state()
    }

    /// Outbound primitive application code should send through.
    pub fn http(&self) -> &HttpPrimitive {
        &self.primitive
    }

    /// Tower layer for interceptor-style clients; inert until installed.
    pub fn layer(&self, library: impl Into<String>) -> InstrumentLayer {
        self.interceptors.layer(&self.dispatcher, library)
    }

    /// Unscoped root emitter.
    pub fn emitter(&self) -> &Emitter {
        self.dispatcher.emitter()
    }

    pub fn environment(&self) -> &dyn Environment {
        self.dispatcher.environment()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn create_child_logger(&self, context: LoggerContext) -> Emitter {
        resolve_emitter(context, self.environment(), self.emitter())
    }

    fn auto_install(&self) {
        let config = self.dispatcher.config();
        let settings = &config.settings;
        if self.environment().is_client() && settings.enabled && settings.auto_setup_interceptors {
            self.install_interceptors();
        }
    }
}

/// Environment flags plus event dispatch and the root emitter's level methods.
#[derive(Debug, Clone)]
pub struct LoggerHandle {
    pub is_client: bool,
    pub is_server: bool,
    pub is_development: bool,
    dispatcher: Dispatcher,
}

impl LoggerHandle {
    /// Dispatch a lifecycle event.
    pub async fn log(&self, event: RequestEvent) {
        self.dispatcher.dispatch(event).await
    }

    pub fn emitter(&self) -> &Emitter {
        self.dispatcher.emitter()
    }

    pub fn log_at(&self, level: Level, data: Option<Value>, msg: &str) {
        self.emitter().log(level, data, msg);
    }

    pub fn trace(&self, msg: impl AsRef<str>) {
        self.emitter().trace(msg);
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        self.emitter().debug(msg);
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.emitter().info(msg);
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.emitter().warn(msg);
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.emitter().error(msg);
    }

    pub fn fatal(&self, msg: impl AsRef<str>) {
        self.emitter().fatal(msg);
    }
}

/// Scoped emitter from the process-wide logger.
pub fn create_child_logger(context: LoggerContext) -> Emitter {
    UniversalLogger::global().create_child_logger(context)
}

/// Configure the process-wide logger and return its handle.
pub fn create_logger(patch: Option<ConfigPatch>) -> LoggerHandle {
    UniversalLogger::global().configure(patch.unwrap_or_default())
}

/// Bare process-wide emitter. Prefer [`create_child_logger`].
pub fn default_emitter() -> Emitter {
    UniversalLogger::global().emitter().clone()
}
