//! Upstream fetch and response relay.

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::gateway::error::{RedirectError, RelayError};
use crate::gateway::headers::{
    filter_request_headers, html_response_headers, passthrough_headers, redirect_headers,
};
use crate::gateway::profile::TargetProfile;
use crate::gateway::redirect::translate_redirect;
use crate::gateway::transform::transform;
use crate::utils::{fmt_duration, log_if_slow};

/// Documents taking longer than this to rewrite are logged.
const SLOW_TRANSFORM_THRESHOLD: Duration = Duration::from_millis(250);

/// Fetch `pathname` (already stripped of its route prefix) from the
/// profile's upstream and relay the result.
///
/// Redirects get their `Location` translated, HTML is rewritten, anything
/// else streams through. A failed fetch becomes a plain 500.
pub async fn fetch_and_relay(
    client: &reqwest::Client,
    request: Request,
    pathname: &str,
    profile: &TargetProfile,
) -> Response {
    match relay(client, request, pathname, profile).await {
        Ok(response) => response,
        Err(e) => {
            error!(class = %profile.content_class(), error = ?e, "upstream fetch failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

async fn relay(
    client: &reqwest::Client,
    request: Request,
    pathname: &str,
    profile: &TargetProfile,
) -> Result<Response, RelayError> {
    let class = profile.content_class();
    let target = profile.fetch_url(pathname, request.uri().query());
    let (parts, body) = request.into_parts();

    info!(%class, method = %parts.method, url = %target, "fetching upstream");

    let mut upstream_request = client
        .request(parts.method.clone(), target.clone())
        .headers(filter_request_headers(&parts.headers));
    if !matches!(parts.method, Method::GET | Method::HEAD) {
        upstream_request = upstream_request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let start = Instant::now();
    let upstream = upstream_request
        .send()
        .await
        .map_err(|source| RelayError::Fetch {
            url: target.to_string(),
            source,
        })?;
    let status = upstream.status();
    info!(
        %class,
        status = status.as_u16(),
        duration = fmt_duration(start.elapsed()),
        "received upstream response"
    );

    if status.is_redirection() && upstream.headers().contains_key(header::LOCATION) {
        return Ok(relay_redirect(upstream, &target, profile));
    }

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    debug!(%class, content_type, "upstream content type");

    if content_type.contains("text/html") {
        let headers = html_response_headers(upstream.headers());
        let html = upstream.text().await.map_err(|source| RelayError::Body {
            url: target.to_string(),
            source,
        })?;

        let start = Instant::now();
        let html = transform(&html, profile);
        log_if_slow(start, SLOW_TRANSFORM_THRESHOLD, "html transform");

        return Ok(respond(status, headers, Body::from(html)));
    }

    debug!(%class, "streaming non-HTML body");
    let headers = passthrough_headers(upstream.headers());
    Ok(respond(status, headers, Body::from_stream(upstream.bytes_stream())))
}

fn relay_redirect(upstream: reqwest::Response, fetched: &Url, profile: &TargetProfile) -> Response {
    let class = profile.content_class();
    let status = upstream.status();
    let Some(location) = upstream.headers().get(header::LOCATION).cloned() else {
        return respond(status, passthrough_headers(upstream.headers()), Body::empty());
    };

    if location.is_empty() {
        error!(%class, "upstream redirect has an empty Location header");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error: Invalid redirect response",
        )
            .into_response();
    }

    match translate_location(&location, fetched, profile) {
        Ok(value) => respond(status, redirect_headers(upstream.headers(), value), Body::empty()),
        Err(e) => {
            warn!(%class, location = ?location, error = %e, "failed to translate redirect, relaying verbatim");
            let headers = passthrough_headers(upstream.headers());
            respond(status, headers, Body::from_stream(upstream.bytes_stream()))
        }
    }
}

fn translate_location(
    location: &HeaderValue,
    fetched: &Url,
    profile: &TargetProfile,
) -> Result<HeaderValue, RedirectError> {
    let location = location.to_str().map_err(|_| RedirectError::NonUtf8Location)?;
    let translated = translate_redirect(location, fetched, profile)?;
    Ok(HeaderValue::from_str(&translated)?)
}

fn respond(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
