//! market-server — marketplace order & payment orchestration service
//!
//! Long-running service that:
//! - Turns user carts into durable orders with reserved stock
//! - Drives an external payment gateway to completion (idempotent submission)
//! - Verifies gateway webhooks and reconciles lost notifications
//! - Relays payment-completed events to the order finalizer (at-least-once)

mod api;
mod config;
mod db;
mod error;
mod orders;
mod payments;
mod relay;
mod state;
mod tasks;

use config::Config;
use state::AppState;
use tasks::{BackgroundTasks, TaskKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting market-server (env: {})", config.environment);

    // Initialize application state (DB pool + migrations + gateway client)
    let state = AppState::new(&config).await?;

    // Register background tasks
    let mut tasks = BackgroundTasks::new();

    let reconciler = payments::reconciler::PaymentReconciler::new(
        state.clone(),
        tasks.shutdown_token(),
    );
    tasks.spawn("payment_reconciler", TaskKind::Periodic, reconciler.run());

    let relay_worker = relay::worker::RelayWorker::new(state.clone(), tasks.shutdown_token());
    tasks.spawn("relay_worker", TaskKind::Worker, relay_worker.run());

    tasks.log_summary();

    // Start HTTP server
    let app = api::create_router(state);
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("market-server HTTP listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drain background tasks
    tasks.shutdown().await;

    tracing::info!("market-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
