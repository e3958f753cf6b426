//! Application state shared across request handlers.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderMap, header};
use reqwest::redirect::Policy;
use url::Url;

use crate::gateway::profile::Targets;

#[derive(Clone)]
pub struct AppState {
    /// Profile relay client. Never follows redirects so they can be translated.
    pub relay_client: reqwest::Client,
    /// `/proxy` client, follows redirects.
    pub adhoc_client: reqwest::Client,
    pub targets: Arc<Targets>,
    pub public_origin: Option<Url>,
    local_origin: Url,
}

impl AppState {
    pub fn new(
        targets: Targets,
        public_origin: Option<Url>,
        port: u16,
    ) -> anyhow::Result<Self> {
        let relay_client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .context("Failed to build relay client")?;
        let adhoc_client = reqwest::Client::builder()
            .build()
            .context("Failed to build ad-hoc client")?;
        let local_origin = Url::parse(&format!("http://localhost:{port}"))
            .context("Failed to build local origin")?;

        Ok(Self {
            relay_client,
            adhoc_client,
            targets: Arc::new(targets),
            public_origin,
            local_origin,
        })
    }

    /// Origin that rewritten URLs point at.
    ///
    /// `PUBLIC_ORIGIN` when configured, else `https://` plus the request's
    /// `Host`, else the local listener.
    pub fn proxy_origin(&self, headers: &HeaderMap) -> Url {
        if let Some(origin) = &self.public_origin {
            return origin.clone();
        }

        headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|host| !host.is_empty())
            .and_then(|host| Url::parse(&format!("https://{host}")).ok())
            .filter(|url| url.path() == "/" && url.query().is_none())
            .unwrap_or_else(|| self.local_origin.clone())
    }
}
