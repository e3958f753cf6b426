//! Long-running service tasks and their coordinated shutdown.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

type ServiceResult = (&'static str, anyhow::Result<()>);

pub struct ServiceManager {
    tasks: JoinSet<ServiceResult>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            tasks: JoinSet::new(),
            shutdown_tx,
        }
    }

    /// Spawn a service. `run` receives a channel that fires once shutdown begins.
    pub fn spawn<F, Fut>(&mut self, name: &'static str, run: F)
    where
        F: FnOnce(broadcast::Receiver<()>) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let shutdown_rx = self.shutdown_tx.subscribe();
        let future = run(shutdown_rx);
        self.tasks.spawn(async move { (name, future.await) });
        debug!(service = name, "service spawned");
    }

    pub fn has_services(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Wait for the next service to exit on its own.
    pub async fn next_exit(&mut self) -> Option<ServiceResult> {
        match self.tasks.join_next().await? {
            Ok(result) => Some(result),
            Err(e) => Some(("unknown", Err(anyhow::anyhow!("service task panicked: {e}")))),
        }
    }

    /// Signal every service and wait up to `timeout` for them to finish.
    ///
    /// Returns the number of services that failed or did not stop in time.
    pub async fn shutdown(mut self, timeout: Duration) -> usize {
        let _ = self.shutdown_tx.send(());
        let pending = self.tasks.len();
        info!(services = pending, timeout = ?timeout, "stopping services");

        let mut failures = 0;
        let drained = tokio::time::timeout(timeout, async {
            while let Some(joined) = self.tasks.join_next().await {
                match joined {
                    Ok((name, Ok(()))) => debug!(service = name, "service stopped"),
                    Ok((name, Err(e))) => {
                        error!(service = name, error = ?e, "service stopped with an error");
                        failures += 1;
                    }
                    Err(e) => {
                        error!(error = %e, "service task panicked");
                        failures += 1;
                    }
                }
            }
        })
        .await;

        if drained.is_err() {
            let remaining = self.tasks.len();
            warn!(remaining, "services did not stop within the shutdown timeout");
            self.tasks.abort_all();
            failures += remaining;
        }

        failures
    }
}
