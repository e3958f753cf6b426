//! JSON error responses for the ad-hoc fetch endpoint.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing 'url' query parameter.")]
    MissingUrl,
    #[error("Invalid URL provided.")]
    InvalidUrl,
    #[error("Failed to fetch URL: {0}")]
    Fetch(#[from] reqwest::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingUrl | ApiError::InvalidUrl => StatusCode::BAD_REQUEST,
            ApiError::Fetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
