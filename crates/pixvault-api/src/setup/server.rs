//! Server startup and graceful shutdown

use anyhow::Result;
use axum::Router;
use pixvault_core::Config;

/// Bind the configured port and serve `app` until SIGINT or SIGTERM.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        addr = %addr,
        storage_backend = %config.storage.backend,
        container = %config.signing.container,
        max_size_bytes = config.upload.max_size_bytes,
        max_files_per_batch = config.max_files_per_batch,
        max_retries = config.retry.max_retries,
        "Accepting upload requests"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves once a termination signal arrives. A handler that fails to install is
/// logged and never fires, leaving the other one in charge.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    };

    tracing::info!(signal, "Shutdown signal received, draining connections");
}
