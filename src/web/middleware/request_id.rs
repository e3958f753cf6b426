//! Per-request tracing spans and request IDs.
//!
//! A well-formed inbound `X-Request-Id` is reused so a fronting proxy's logs
//! line up with ours; otherwise a ULID is generated. The resolved ID is
//! always echoed back as `X-Request-Id`.

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::Response;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;

static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const MAX_INBOUND_ID_LEN: usize = 64;

/// Reuse the inbound request ID when it is short and printable.
pub fn resolve_request_id(headers: &HeaderMap) -> String {
    headers
        .get(&REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_INBOUND_ID_LEN
                && id.bytes().all(|b| b.is_ascii_graphic())
        })
        .map(String::from)
        .unwrap_or_else(|| ulid::Ulid::new().to_string())
}

fn log_response(method: &Method, path: &str, status: StatusCode, duration_ms: u64) {
    let status = status.as_u16();
    match status {
        200..=399 => tracing::debug!(%method, path, status, duration_ms, "Response"),
        400..=499 => tracing::info!(%method, path, status, duration_ms, "Response"),
        _ => tracing::warn!(%method, path, status, duration_ms, "Response"),
    }
}

#[derive(Clone)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response<B>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let req_id = resolve_request_id(req.headers());
        let header_value = HeaderValue::from_str(&req_id).ok();

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let span = tracing::info_span!("request", req_id = %req_id);
        let start = Instant::now();

        let future = {
            let _entered = span.enter();
            self.inner.call(req)
        };

        Box::pin(
            async move {
                let mut result = future.await;
                let duration_ms = start.elapsed().as_millis() as u64;

                match &mut result {
                    Ok(response) => {
                        log_response(&method, &path, response.status(), duration_ms);
                        if let Some(value) = header_value {
                            response.headers_mut().insert(REQUEST_ID.clone(), value);
                        }
                    }
                    Err(e) => {
                        tracing::error!(%method, path, error = ?e, duration_ms, "Request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
