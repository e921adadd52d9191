use std::sync::Arc;

use log::info;
use tokio::net::TcpListener;

use naturrate::{logging, storage, Orchestrator};
use naturrate_server::{serve, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let config = naturrate::load_from_env()?;
    logging::init(&config.logging)?;

    info!(
        "Starting Naturrate v{} ({:?} services, {:?} storage)",
        env!("CARGO_PKG_VERSION"),
        config.services.mode,
        config.storage.backend
    );

    let blob_store = storage::from_config(&config)?;
    let orchestrator = Arc::new(Orchestrator::from_config(
        &config,
        Arc::clone(&blob_store.store),
    )?);

    let state = AppState::new(
        Arc::clone(&orchestrator),
        blob_store.local.clone(),
        config.server.max_upload_mb,
    );
    let listener = TcpListener::bind(&config.server.bind).await?;

    // Cancel jobs first so open status streams reach a terminal event
    let shutdown = {
        let orchestrator = Arc::clone(&orchestrator);
        async move {
            shutdown_signal().await;
            orchestrator.shutdown().await;
        }
    };
    serve(listener, state, shutdown).await?;

    info!("Naturrate stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
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
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}
