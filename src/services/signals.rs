use std::process::ExitCode;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info, warn};

use crate::services::manager::ServiceManager;
use crate::utils::fmt_duration;

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}

/// Run until a shutdown signal or a service exits, then stop everything.
pub async fn handle_shutdown_signals(
    mut service_manager: ServiceManager,
    shutdown_timeout: Duration,
) -> ExitCode {
    let early_exit = tokio::select! {
        _ = shutdown_signal() => false,
        Some((name, result)) = service_manager.next_exit() => {
            match result {
                Ok(()) => warn!(service = name, "service exited unexpectedly"),
                Err(e) => error!(service = name, error = ?e, "service failed"),
            }
            true
        }
    };

    info!(
        timeout = fmt_duration(shutdown_timeout),
        "shutting down"
    );
    let failures = service_manager.shutdown(shutdown_timeout).await;

    if early_exit || failures > 0 {
        error!(failures, "shutdown completed with errors");
        ExitCode::FAILURE
    } else {
        info!("shutdown complete");
        ExitCode::SUCCESS
    }
}
