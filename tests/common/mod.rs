//! Shared utilities for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{Response, StatusCode};
use log_bridge::config::IngestConfig;
use log_bridge::emitter::{CapturingSink, Emitter, Level, Record};
use log_bridge::env::Environment;
use log_bridge::ingest::IngestServer;
use log_bridge::instrument::{OutboundRequest, OutboundResponse, Transport, TransportError};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Emitter writing into a fresh capturing sink.
pub fn capturing_emitter() -> (Emitter, CapturingSink) {
    let sink = CapturingSink::new();
    (Emitter::new(Arc::new(sink.clone()), Level::Trace), sink)
}

/// Serve an ingestion endpoint on an ephemeral loopback port.
pub async fn spawn_ingest(config: IngestConfig, env: Arc<dyn Environment>) -> (SocketAddr, CapturingSink) {
    let (emitter, sink) = capturing_emitter();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = IngestServer::new(config, emitter, env);
    tokio::spawn(async move {
        let _ = server.run(listener, std::future::pending()).await;
    });
    (addr, sink)
}

/// Poll until `sink` holds at least `count` records or the timeout passes.
pub async fn wait_for_records(sink: &CapturingSink, count: usize) -> Vec<Record> {
    for _ in 0..100 {
        if sink.len() >= count {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    sink.records()
}

/// Start a programmable raw HTTP backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let (status, body) = f().await;
                let status_text = match status {
                    200 => "200 OK",
                    304 => "304 Not Modified",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// In-memory transport answering with a fixed status, or failing on demand.
#[derive(Debug)]
pub struct MockTransport {
    status: StatusCode,
    body: &'static str,
    fail: Option<TransportError>,
    pub calls: AtomicU32,
}

impl MockTransport {
    pub fn ok(body: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            fail: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing(error: TransportError) -> Self {
        Self {
            status: StatusCode::OK,
            body: "",
            fail: Some(error),
            calls: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn library(&self) -> &str {
        "mock"
    }

    async fn send(&self, _request: OutboundRequest) -> Result<OutboundResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.fail {
            return Err(e.clone());
        }
        let mut response = Response::new(Bytes::from_static(self.body.as_bytes()));
        *response.status_mut() = self.status;
        Ok(response)
    }
}
