use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service, ServiceExt};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tower Layer for access logging of relay endpoints.
///
/// Emits one structured `tracing` event per request once the response is
/// ready. Bodies are never logged: chat text and expense rows stay out of
/// the access log.
#[derive(Clone, Default)]
pub struct AccessLogLayer;

impl AccessLogLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for AccessLogLayer {
    type Service = AccessLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessLogService { inner }
    }
}

#[derive(Clone)]
pub struct AccessLogService<S> {
    inner: S,
}

impl<S> Service<Request> for AccessLogService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let not_ready = self.inner.clone();
        let ready = std::mem::replace(&mut self.inner, not_ready);

        Box::pin(async move {
            let path = req.uri().path().to_owned();

            // Only log relay endpoints
            if !is_relay_path(&path) {
                return Ok(ready.oneshot(req).await.into_response());
            }

            let start = Instant::now();
            let method = req.method().to_string();
            let request_id = req
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);

            let response = ready.oneshot(req).await.into_response();

            let status = response.status().as_u16();
            let latency_ms = start.elapsed().as_millis().min(u64::MAX as u128) as u64;
            let request_id = request_id.as_deref().unwrap_or("-");

            if response.status().is_server_error() {
                tracing::warn!(%method, %path, status, latency_ms, request_id, "access");
            } else {
                tracing::info!(%method, %path, status, latency_ms, request_id, "access");
            }

            Ok(response)
        })
    }
}

fn is_relay_path(path: &str) -> bool {
    path.starts_with("/api/") || path.starts_with("/.netlify/functions/")
}
