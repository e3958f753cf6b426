//! `/proxy?url=…` ad-hoc fetch endpoint.
//!
//! Unlike the profile relay, this follows redirects and performs no
//! rewriting: the body comes back either raw (`type=html`) or wrapped as
//! `{"contents": …}`.

use axum::Json;
use axum::extract::{Query, Request};
use axum::http::{HeaderValue, Method, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use crate::gateway::headers::{HTML_CONTENT_TYPE, filter_request_headers};
use crate::state::AppState;
use crate::web::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct AdhocQuery {
    url: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl AdhocQuery {
    fn wants_html(&self) -> bool {
        self.kind.as_deref() == Some("html")
    }
}

pub async fn adhoc_proxy(state: &AppState, request: Request) -> Response {
    match fetch(state, request).await {
        Ok(response) => response,
        Err(e) => {
            match &e {
                ApiError::Fetch(source) => warn!(error = %source, "ad-hoc fetch failed"),
                _ => info!(error = %e, "rejected ad-hoc request"),
            }
            e.into_response()
        }
    }
}

async fn fetch(state: &AppState, request: Request) -> Result<Response, ApiError> {
    let query = Query::<AdhocQuery>::try_from_uri(request.uri())
        .map(|Query(query)| query)
        .unwrap_or_default();

    let raw = query
        .url
        .as_deref()
        .filter(|url| !url.is_empty())
        .ok_or(ApiError::MissingUrl)?;
    let target = Url::parse(raw).map_err(|_| ApiError::InvalidUrl)?;
    info!(url = %target, html = query.wants_html(), "ad-hoc fetch");

    let (parts, body) = request.into_parts();
    let mut upstream_request = state
        .adhoc_client
        .request(parts.method.clone(), target)
        .headers(filter_request_headers(&parts.headers));
    if !matches!(parts.method, Method::GET | Method::HEAD) {
        upstream_request = upstream_request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let upstream = upstream_request.send().await?;
    let status = upstream.status();
    info!(status = status.as_u16(), "ad-hoc upstream responded");

    if query.wants_html() {
        let content_type = upstream
            .headers()
            .get(header::CONTENT_TYPE)
            .filter(|v| v.to_str().is_ok_and(|s| s.contains("text/html")))
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(HTML_CONTENT_TYPE));
        let contents = upstream.text().await?;
        return Ok((status, [(header::CONTENT_TYPE, content_type)], contents).into_response());
    }

    let contents = upstream.text().await?;
    Ok(Json(json!({ "contents": contents })).into_response())
}
