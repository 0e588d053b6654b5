use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use agent_outbox::config::Settings;
use agent_outbox::connectivity::ConnectivityProbe;
use agent_outbox::server::{create_app, AppState};
use agent_outbox::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    init_tracing(&settings.log);
    tracing::info!("Configuration loaded");

    // Create application state
    let state = AppState::new(&settings)?;
    tracing::info!(
        storage = state.queue.backend_name(),
        queue_key = %settings.storage.queue_key,
        "Application state initialized"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start connectivity probe in background
    let probe_handle = if settings.connectivity.probe_enabled {
        let url = settings
            .connectivity
            .probe_url
            .clone()
            .unwrap_or_else(|| settings.chat_api.base_url.clone());
        let probe = ConnectivityProbe::new(
            state.connectivity.clone(),
            url,
            settings.connectivity.probe_interval(),
            settings.connectivity.probe_timeout(),
            shutdown_tx.subscribe(),
        );
        Some(tokio::spawn(probe.run()))
    } else {
        tracing::info!("Connectivity probe disabled, waiting for host signal");
        None
    };

    // Start resync driver in background (runs the startup flush first)
    let driver_handle = tokio::spawn(state.driver.clone().run(shutdown_tx.subscribe()));

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    // Wait for background tasks to finish
    tracing::info!("Waiting for background tasks to finish...");
    let _ = driver_handle.await;
    if let Some(handle) = probe_handle {
        let _ = handle.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Stop the probe and the resync driver
    let _ = shutdown_tx.send(());
}
