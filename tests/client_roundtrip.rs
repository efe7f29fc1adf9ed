//! Client-side logger → ingestion server over loopback.

use axum::body::Bytes;
use axum::http::{Method, Request};
use log_bridge::config::{IngestConfig, UrlMatcher};
use log_bridge::emitter::{Emitter, Level};
use log_bridge::env::{Environment, Side, StaticEnvironment};
use log_bridge::event::{EventBase, RequestEvent, RequestStart};
use log_bridge::instrument::ReqwestTransport;
use log_bridge::logger::{ConfigPatch, UniversalLogger};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod common;

async fn client_logger(origin: String) -> UniversalLogger {
    UniversalLogger::builder()
        .environment(Arc::new(StaticEnvironment::client()))
        .emitter(Emitter::null())
        .transport(Arc::new(ReqwestTransport::default()))
        .patch(
            ConfigPatch::new()
                .server_origin(origin)
                .include_body(true)
                .include_headers(true),
        )
        .build()
}

fn server_env() -> Arc<dyn Environment> {
    Arc::new(StaticEnvironment::server())
}

#[tokio::test]
async fn test_instrumented_call_reaches_ingestion() {
    let (ingest_addr, sink) = common::spawn_ingest(IngestConfig::default(), server_env()).await;
    let backend = common::start_programmable_backend(|| async { (200, r#"{"ok":true}"#.to_string()) }).await;
    let logger = client_logger(format!("http://{}", ingest_addr)).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("http://{}/items?page=2", backend))
        .header("content-type", "application/json")
        .body(Bytes::from_static(br#"{"name":"widget"}"#))
        .unwrap();
    let response = logger.http().send(request).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.body().as_ref(), br#"{"ok":true}"#);

    let records = common::wait_for_records(&sink, 2).await;
    assert_eq!(records.len(), 2);

    let start = records
        .iter()
        .find(|r| r.field("event") == Some(&json!("request_start")))
        .unwrap();
    let success = records
        .iter()
        .find(|r| r.field("event") == Some(&json!("request_success")))
        .unwrap();

    assert_eq!(start.field("requestId"), success.field("requestId"));
    assert_eq!(start.field("method"), Some(&json!("POST")));
    assert_eq!(start.field("library"), Some(&json!("reqwest")));
    assert_eq!(start.field("body"), Some(&json!({ "name": "widget" })));
    assert_eq!(start.field("params"), Some(&json!({ "page": "2" })));
    assert_eq!(start.field("clientIP"), Some(&json!("127.0.0.1")));
    assert_eq!(success.field("status"), Some(&json!(200)));
    assert_eq!(success.field("responseBody"), Some(&json!({ "ok": true })));
    assert_eq!(success.field("environment"), Some(&json!("client")));
    assert!(success.field("duration").unwrap().is_u64());
    assert_eq!(success.level, Level::Info);
}

#[tokio::test]
async fn test_failed_call_is_mirrored_and_propagated() {
    let (ingest_addr, sink) = common::spawn_ingest(IngestConfig::default(), server_env()).await;
    let logger = client_logger(format!("http://{}", ingest_addr)).await;

    let request = Request::builder()
        .uri("http://127.0.0.1:9/unreachable")
        .body(Bytes::new())
        .unwrap();
    let err = logger.http().send(request).await.unwrap_err();

    let records = common::wait_for_records(&sink, 2).await;
    let error = records
        .iter()
        .find(|r| r.field("event") == Some(&json!("request_error")))
        .unwrap();
    assert_eq!(error.level, Level::Error);
    assert_eq!(error.field("error"), Some(&json!(err.to_string())));
    assert_eq!(error.field("errorCode"), Some(&json!(err.code())));
}

#[tokio::test]
async fn test_explicit_dispatch_with_context_provider() {
    let (ingest_addr, sink) = common::spawn_ingest(IngestConfig::default(), server_env()).await;
    let logger = client_logger(format!("http://{}", ingest_addr)).await;
    logger.configure(ConfigPatch::new().context_provider(|| {
        let mut m = serde_json::Map::new();
        m.insert("session".into(), json!("s-1"));
        m
    }));

    let event = RequestEvent::RequestStart(RequestStart {
        base: EventBase::new("req_ctx", "/api/users", "get", "manual", Side::Client),
        headers: None,
        body: None,
        params: None,
    });
    logger.dispatch(event).await;

    let records = common::wait_for_records(&sink, 1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].field("context"), Some(&json!({ "session": "s-1" })));
    assert_eq!(records[0].field("method"), Some(&json!("GET")));
}

#[tokio::test]
async fn test_excluded_urls_are_never_sent() {
    let (ingest_addr, sink) = common::spawn_ingest(IngestConfig::default(), server_env()).await;
    let logger = client_logger(format!("http://{}", ingest_addr)).await;
    logger.configure(ConfigPatch::new().exclude_urls(vec![UrlMatcher::contains("/api/logs")]));

    let event = RequestEvent::RequestStart(RequestStart {
        base: EventBase::new("req_x", "/api/logs", "POST", "manual", Side::Client),
        headers: None,
        body: None,
        params: None,
    });
    logger.dispatch(event).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_unreachable_ingestion_reports_to_on_error() {
    let failures = Arc::new(AtomicU32::new(0));
    let counter = failures.clone();
    let logger = client_logger("http://127.0.0.1:9".to_string()).await;
    logger.configure(ConfigPatch::new().on_error(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let event = RequestEvent::RequestStart(RequestStart {
        base: EventBase::new("req_y", "/api/data", "GET", "manual", Side::Client),
        headers: None,
        body: None,
        params: None,
    });
    logger.dispatch(event).await;

    assert_eq!(failures.load(Ordering::SeqCst), 1);
}
