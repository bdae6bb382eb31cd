mod config;
mod docx;
mod errors;
mod models;
mod offer;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::errors::AppError;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{FirestoreStore, RecordStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on a missing or unreadable FIREBASE_KEY)
    let config = Config::from_env().map_err(|e| AppError::Config(format!("{e:#}")))?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting offerdesk v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the record store
    let store: Arc<dyn RecordStore> = match &config.firestore_emulator_host {
        Some(host) => {
            info!("Using Firestore emulator at {host}");
            Arc::new(FirestoreStore::emulator(
                host,
                &config.service_account.project_id,
            )?)
        }
        None => Arc::new(FirestoreStore::new(config.service_account.clone())?),
    };
    info!(
        "Firestore client initialized (project: {}, collection: '{}')",
        config.service_account.project_id, config.collection
    );

    // Build app state
    let state = AppState::new(config.clone(), store.clone());

    let missing = state.templates.missing_templates();
    if !missing.is_empty() {
        warn!(
            "{} template(s) missing from {}: {:?}",
            missing.len(),
            state.templates.dir().display(),
            missing
        );
    }

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.shutdown().await;
    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
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
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
