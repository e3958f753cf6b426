//! Permissive CORS headers on every response, plus preflight handling.
//!
//! `OPTIONS` requests are answered here and never reach the router. Headers
//! already present on a relayed response are left alone.

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};

static ALLOW_ORIGIN: HeaderValue = HeaderValue::from_static("*");
static ALLOW_HEADERS: HeaderValue =
    HeaderValue::from_static("Origin, X-Requested-With, Content-Type, Accept");
static ALLOW_METHODS: HeaderValue = HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS");

fn cors_headers() -> [(HeaderName, &'static HeaderValue); 3] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, &ALLOW_ORIGIN),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, &ALLOW_HEADERS),
        (header::ACCESS_CONTROL_ALLOW_METHODS, &ALLOW_METHODS),
    ]
}

/// Insert each CORS header the response does not already carry.
pub fn apply_cors(headers: &mut HeaderMap) {
    for (name, value) in cors_headers() {
        if !headers.contains_key(&name) {
            headers.insert(name, value.clone());
        }
    }
}

#[derive(Clone)]
pub struct CorsLayer;

impl<S> Layer<S> for CorsLayer {
    type Service = CorsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorsService { inner }
    }
}

#[derive(Clone)]
pub struct CorsService<S> {
    inner: S,
}

impl<S> Service<Request> for CorsService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        if req.method() == Method::OPTIONS {
            tracing::debug!(path = req.uri().path(), "answering CORS preflight");
            return Box::pin(async {
                let mut response = StatusCode::OK.into_response();
                apply_cors(response.headers_mut());
                Ok(response)
            });
        }

        let future = self.inner.call(req);
        Box::pin(async move {
            let mut response = future.await?;
            apply_cors(response.headers_mut());
            Ok(response)
        })
    }
}
