use anyhow::Context;
use tracing::{error, info, warn};

use schoolmart_api::app::{build_app, services::build_services};
use schoolmart_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    schoolmart_observability::init();

    let config = AppConfig::from_env()?;
    info!(?config, "configuration loaded");

    let services = build_services(&config).await?;
    let app = build_app(services.ctx.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // Drain queued op-log entries before exiting.
    let stats = services.audit_worker.shutdown().await;
    info!(?stats, "audit log drained");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
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
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("received Ctrl+C, shutting down"),
        _ = terminate => warn!("received SIGTERM, shutting down"),
    }
}
