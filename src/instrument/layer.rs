//! Tower middleware target for request/response-interceptor style clients.
//!
//! Any `Service<Request<B>, Response = Response<R>>` (a hyper client, a
//! `tower::ServiceBuilder` stack) can be wrapped. Call metadata travels in
//! the request extensions as [`CallMeta`]. Bodies are streamed, so only
//! headers are captured on this path.

use axum::http::{Request, Response};
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use super::capture::{error_event, start_event, success_event, CallMeta};
use super::interceptor::Interceptors;
use crate::logger::Dispatcher;
use crate::observability::metrics;

#[derive(Debug, Clone)]
pub struct InstrumentLayer {
    dispatcher: Dispatcher,
    interceptors: Interceptors,
    library: Arc<str>,
}

impl InstrumentLayer {
    pub fn new(dispatcher: Dispatcher, interceptors: Interceptors, library: impl Into<String>) -> Self {
        Self {
            dispatcher,
            interceptors,
            library: Arc::from(library.into()),
        }
    }
}

impl<S> Layer<S> for InstrumentLayer {
    type Service = InstrumentService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InstrumentService {
            inner,
            dispatcher: self.dispatcher.clone(),
            interceptors: self.interceptors.clone(),
            library: self.library.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstrumentService<S> {
    inner: S,
    dispatcher: Dispatcher,
    interceptors: Interceptors,
    library: Arc<str>,
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

impl<S, ReqB, ResB> Service<Request<ReqB>> for InstrumentService<S>
where
    S: Service<Request<ReqB>, Response = Response<ResB>>,
    S::Future: Send + 'static,
    S::Error: Display + 'static,
    ResB: 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqB>) -> Self::Future {
        if !self.interceptors.is_installed() {
            return Box::pin(self.inner.call(request));
        }

        let config = self.dispatcher.config();
        let side = self.dispatcher.environment().side();
        let library = self.library.clone();

        let mut meta = CallMeta::new(request.method(), request.uri());
        self.dispatcher.dispatch_detached(start_event(
            &meta,
            &library,
            side,
            request.uri(),
            request.headers(),
            None,
            &config.settings,
        ));

        meta.mark_issued();
        request.extensions_mut().insert(meta.clone());
        let future = self.inner.call(request);
        let dispatcher = self.dispatcher.clone();

        Box::pin(async move {
            let outcome = future.await;
            let duration = meta.elapsed_ms();
            let terminal = match &outcome {
                Ok(response) => {
                    metrics::record_instrumented_call(&library, "success");
                    success_event(
                        &meta,
                        &library,
                        side,
                        response.status(),
                        response.headers(),
                        None,
                        duration,
                        &config.settings,
                    )
                }
                Err(e) => {
                    metrics::record_instrumented_call(&library, "error");
                    error_event(&meta, &library, side, e, None, duration)
                }
            };
            dispatcher.dispatch_detached(terminal);
            outcome
        })
    }
}
