//! Context gate: decides which emitter a logical module gets.
//!
//! # Responsibilities
//! - Apply the development-only module allow-list on the server
//! - Build the scoped base record (module, component, file path, environment)
//! - Hand the shared root emitter to client-side callers unchanged

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::emitter::Emitter;
use crate::env::Environment;

/// Identifies a logical logging scope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerContext {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl LoggerContext {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Default::default()
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }
}

/// Resolve the emitter for `context`.
///
/// Server-side development runs honour the module allow-list and return
/// [`Emitter::Null`] for modules outside it. Client-side callers get `root`.
pub fn resolve_emitter(context: LoggerContext, env: &dyn Environment, root: &Emitter) -> Emitter {
    if env.is_client() {
        return root.clone();
    }

    let development = env.is_development();
    if development {
        if let Some(allowed) = env.module_allow_list() {
            if !allowed.iter().any(|m| m == &context.module) {
                return Emitter::null();
            }
        }
    }

    root.child(base_fields(context, env, development))
}

fn base_fields(context: LoggerContext, env: &dyn Environment, development: bool) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("module".into(), Value::String(context.module));
    if let Some(component) = context.component {
        fields.insert("component".into(), Value::String(component));
    }
    if let Some(path) = context.file_path {
        fields.insert("filePath".into(), Value::String(strip_cwd(&path)));
    }
    if !development {
        if let Some(environment) = context.environment.or_else(|| env.deployment_mode()) {
            fields.insert("environment".into(), Value::String(environment));
        }
    }
    fields
}

fn strip_cwd(path: &str) -> String {
    let Ok(cwd) = std::env::current_dir() else {
        return path.to_string();
    };
    match Path::new(path).strip_prefix(&cwd) {
        Ok(rest) if rest.as_os_str().is_empty() => path.to_string(),
        Ok(rest) => rest.to_string_lossy().into_owned(),
        Err(_) => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::{CapturingSink, Level};
    use crate::env::StaticEnvironment;
    use std::sync::Arc;

    fn root() -> (Emitter, CapturingSink) {
        let sink = CapturingSink::new();
        (Emitter::new(Arc::new(sink.clone()), Level::Trace), sink)
    }

    #[test]
    fn test_production_never_filters() {
        let (root, sink) = root();
        let env = StaticEnvironment::server().with_allow_list("a,b");
        let emitter = resolve_emitter(LoggerContext::new("c"), &env, &root);
        assert!(!emitter.is_null());
        emitter.info("visible");
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_development_without_allow_list_logs_everything() {
        let (root, sink) = root();
        let env = StaticEnvironment::server().development();
        for module in ["api", "db", ""] {
            let emitter = resolve_emitter(LoggerContext::new(module), &env, &root);
            assert!(!emitter.is_null());
            emitter.info("hello");
        }
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn test_development_allow_list_silences_others() {
        let (root, sink) = root();
        let env = StaticEnvironment::server().development().with_allow_list("a, b");

        let silent = resolve_emitter(LoggerContext::new("c"), &env, &root);
        assert!(silent.is_null());
        silent.info("dropped");
        silent.child(Map::new()).error("still dropped");
        assert!(sink.is_empty());

        let allowed = resolve_emitter(LoggerContext::new("b"), &env, &root);
        allowed.info("kept");
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_blank_allow_list_does_not_silence() {
        let (root, sink) = root();
        let env = StaticEnvironment::server().development().with_allow_list(" , ");
        let emitter = resolve_emitter(LoggerContext::new("api"), &env, &root);
        assert!(!emitter.is_null());
        emitter.info("visible");
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_environment_field_only_outside_development() {
        let (root, sink) = root();
        let prod = StaticEnvironment::server();
        resolve_emitter(LoggerContext::new("m"), &prod, &root).info("p");
        let dev = StaticEnvironment::server().development();
        resolve_emitter(LoggerContext::new("m").with_environment("qa"), &dev, &root).info("d");

        let records = sink.records();
        assert_eq!(records[0].fields["environment"], "production");
        assert!(records[1].field("environment").is_none());
    }

    #[test]
    fn test_file_path_strips_working_directory() {
        let (root, sink) = root();
        let cwd = std::env::current_dir().unwrap();
        let file = cwd.join("src").join("lib.rs");
        let context = LoggerContext::new("m")
            .with_component("c")
            .with_file_path(file.to_string_lossy());
        resolve_emitter(context, &StaticEnvironment::server(), &root).info("x");

        let record = &sink.records()[0];
        assert_eq!(record.fields["component"], "c");
        assert_eq!(
            record.fields["filePath"],
            Path::new("src").join("lib.rs").to_string_lossy().into_owned()
        );
    }

    #[test]
    fn test_client_gets_root_unchanged() {
        let (root, sink) = root();
        let env = StaticEnvironment::client().development().with_allow_list("a");
        let emitter = resolve_emitter(LoggerContext::new("zzz"), &env, &root);
        emitter.info("client");
        assert_eq!(sink.len(), 1);
        assert!(sink.records()[0].field("module").is_none());
    }
}
