//! Header policies for forwarded requests and relayed responses.

use axum::http::{HeaderMap, HeaderName, HeaderValue, header};

/// Request headers never forwarded to an upstream.
pub const FORBIDDEN_REQUEST_HEADERS: [&str; 9] = [
    "host",
    "connection",
    "x-forwarded-for",
    "cf-connecting-ip",
    "cf-ipcountry",
    "x-real-ip",
    "cookie",
    "authorization",
    "referer",
];

/// Transport framing belongs to the outgoing connection, not the upstream's.
const FRAMING_HEADERS: &[HeaderName] = &[header::TRANSFER_ENCODING, header::CONNECTION];

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Copy inbound request headers minus the deny-list.
pub fn filter_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if FORBIDDEN_REQUEST_HEADERS.contains(&name.as_str()) {
            continue;
        }
        filtered.append(name.clone(), value.clone());
    }
    filtered
}

fn copy_except(upstream: &HeaderMap, skipped: &[HeaderName]) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if skipped.contains(name) || FRAMING_HEADERS.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Headers for a rewritten HTML document.
pub fn html_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = copy_except(
        upstream,
        &[
            header::CONTENT_ENCODING,
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
        ],
    );
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    headers
}

/// Headers for a body relayed unchanged (assets, and redirects that could
/// not be translated).
pub fn passthrough_headers(upstream: &HeaderMap) -> HeaderMap {
    copy_except(upstream, &[header::CONTENT_ENCODING, header::CONTENT_LENGTH])
}

/// Headers for a translated redirect.
pub fn redirect_headers(upstream: &HeaderMap, location: HeaderValue) -> HeaderMap {
    let mut headers = copy_except(
        upstream,
        &[
            header::LOCATION,
            header::CONTENT_ENCODING,
            header::CONTENT_LENGTH,
        ],
    );
    headers.insert(header::LOCATION, location);
    headers
}
