//! The native outbound network primitive.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{Request, Response};
use thiserror::Error;

pub type OutboundRequest = Request<Bytes>;
pub type OutboundResponse = Response<Bytes>;

/// Failure of the underlying network call. Passed through to callers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request aborted: {0}")]
    Aborted(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Short machine-readable code carried as `errorCode`.
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::Aborted(_) => "ABORTED",
            TransportError::Timeout => "TIMEOUT",
            TransportError::Connect(_) => "CONNECT",
            TransportError::InvalidRequest(_) => "INVALID_REQUEST",
            TransportError::Other(_) => "NETWORK",
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// An outbound HTTP primitive that can be decorated.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Name reported as the event `library`.
    fn library(&self) -> &str;

    async fn send(&self, request: OutboundRequest) -> Result<OutboundResponse, TransportError>;
}

/// `reqwest`-backed transport with fully buffered responses.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn library(&self) -> &str {
        "reqwest"
    }

    async fn send(&self, request: OutboundRequest) -> Result<OutboundResponse, TransportError> {
        let request = reqwest::Request::try_from(request)?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let mut out = Response::new(body);
        *out.status_mut() = status;
        *out.version_mut() = version;
        *out.headers_mut() = headers;
        Ok(out)
    }
}
