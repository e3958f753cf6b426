use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use crate::state::AppState;
use crate::web::create_router;

/// HTTP listener for the gateway router.
pub struct WebService {
    port: u16,
    app_state: AppState,
}

impl WebService {
    pub fn new(port: u16, app_state: AppState) -> Self {
        Self { port, app_state }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let router = create_router(self.app_state);
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(
            address = %addr,
            link = format!("http://localhost:{}", self.port),
            "web server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("web server draining connections");
            })
            .await
            .context("Web server failed")?;

        info!("web server stopped");
        Ok(())
    }
}
