//! Interceptor installation, outcome preservation and the tower target.

use axum::body::Bytes;
use axum::http::{Request, Response, StatusCode};
use log_bridge::emitter::Level;
use log_bridge::env::StaticEnvironment;
use log_bridge::instrument::{CallMeta, InstallState, TransportError};
use log_bridge::logger::{ConfigPatch, UniversalLogger};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tower::{service_fn, Layer, ServiceExt};

mod common;

use common::MockTransport;

fn server_logger(transport: Arc<MockTransport>) -> (UniversalLogger, log_bridge::emitter::CapturingSink) {
    let (emitter, sink) = common::capturing_emitter();
    let logger = UniversalLogger::builder()
        .environment(Arc::new(StaticEnvironment::server()))
        .emitter(emitter)
        .transport(transport)
        .build();
    (logger, sink)
}

fn get(uri: &str) -> Request<Bytes> {
    Request::builder().uri(uri).body(Bytes::new()).unwrap()
}

fn events(sink: &log_bridge::emitter::CapturingSink, name: &str) -> usize {
    sink.records()
        .iter()
        .filter(|r| r.field("event") == Some(&json!(name)))
        .count()
}

#[tokio::test]
async fn test_double_install_wraps_once() {
    let transport = Arc::new(MockTransport::ok("{}"));
    let (logger, sink) = server_logger(transport.clone());

    assert!(logger.install_interceptors());
    assert!(!logger.install_interceptors());
    assert_eq!(logger.interceptor_state(), InstallState::Installed);

    logger.http().send(get("http://svc/a")).await.unwrap();

    assert_eq!(transport.call_count(), 1);
    assert_eq!(events(&sink, "request_start"), 1);
    assert_eq!(events(&sink, "request_success"), 1);

    let records = sink.records();
    assert_eq!(records[0].field("requestId"), records[1].field("requestId"));
    assert_eq!(records[0].field("environment"), Some(&json!("server")));
}

#[tokio::test]
async fn test_uninstalled_primitive_is_silent() {
    let transport = Arc::new(MockTransport::ok("{}"));
    let (logger, sink) = server_logger(transport.clone());

    logger.http().send(get("http://svc/a")).await.unwrap();
    assert_eq!(transport.call_count(), 1);
    assert!(sink.is_empty());

    logger.install_interceptors();
    logger.uninstall_interceptors();
    logger.http().send(get("http://svc/b")).await.unwrap();
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_error_is_returned_unchanged() {
    let transport = Arc::new(MockTransport::failing(TransportError::Aborted("user cancelled".into())));
    let (logger, sink) = server_logger(transport);
    logger.install_interceptors();

    let err = logger.http().send(get("http://svc/a")).await.unwrap_err();
    assert_eq!(err, TransportError::Aborted("user cancelled".into()));

    let errors = sink.at_level(Level::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("error"), Some(&json!("request aborted: user cancelled")));
    assert_eq!(errors[0].field("errorCode"), Some(&json!("ABORTED")));
    assert_eq!(events(&sink, "request_success"), 0);
}

#[tokio::test]
async fn test_disabled_logger_still_passes_calls_through() {
    let transport = Arc::new(MockTransport::ok("{}"));
    let (logger, sink) = server_logger(transport.clone());
    logger.install_interceptors();
    logger.configure(ConfigPatch::new().enabled(false));

    let response = logger.http().send(get("http://svc/a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(transport.call_count(), 1);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_tower_layer_correlates_through_extensions() {
    let transport = Arc::new(MockTransport::ok("{}"));
    let (logger, sink) = server_logger(transport);
    let layer = logger.layer("tower-client");

    let inner = service_fn(|request: Request<String>| async move {
        let id = request
            .extensions()
            .get::<CallMeta>()
            .map(|meta| meta.request_id.clone())
            .unwrap_or_default();
        Ok::<_, Infallible>(Response::new(id))
    });

    let response = layer
        .layer(inner)
        .oneshot(Request::builder().uri("/before").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.body(), "");
    assert!(sink.is_empty());

    logger.install_interceptors();
    let inner = service_fn(|request: Request<String>| async move {
        let id = request
            .extensions()
            .get::<CallMeta>()
            .map(|meta| meta.request_id.clone())
            .unwrap_or_default();
        Ok::<_, Infallible>(Response::new(id))
    });
    let response = layer
        .layer(inner)
        .oneshot(Request::builder().uri("/after").body(String::new()).unwrap())
        .await
        .unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].field("library"), Some(&json!("tower-client")));
    assert_eq!(records[1].field("requestId"), Some(&json!(response.body())));
    assert_eq!(records[1].field("status"), Some(&json!(200)));
}
