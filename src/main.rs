// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::session::{ReplaySession, SessionHandle};
use crate::infrastructure::config::load_replay_config;
use crate::infrastructure::http_api::HttpReplayApi;
use crate::presentation::app_state::AppState;
use crate::presentation::routes::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_replay_config().context("Failed to load replay configuration")?;

    // Remote backend serves both the time series and the checkpoints
    let api = Arc::new(HttpReplayApi::new(
        config.api.base_url.clone(),
        config.api.timeout(),
    )?);

    // Start the session owner task
    let (session, session_task) = ReplaySession::spawn(
        config.identity(),
        config.session_settings(),
        api.clone(),
        api,
    )?;

    let state = Arc::new(AppState {
        session: session.clone(),
    });

    let app = router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!(
        "Starting glucose-replay for {} (subject {}) on {}",
        config.session.username,
        config.session.subject_id,
        addr
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal(session))
        .await?;

    session_task.await.context("Session task panicked")?;
    tracing::info!("Replay session closed");

    Ok(())
}

/// Resolves on Ctrl-C (after logging the session out) or once the operator logs out
async fn shutdown_signal(session: SessionHandle) {
    let mut updates = session.subscribe();
    let ended = async move {
        let _ = updates.wait_for(|snapshot| snapshot.ended).await;
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested, flushing checkpoint");
            if let Err(e) = session.logout().await {
                tracing::warn!("Logout during shutdown failed: {}", e);
            }
        }
        _ = ended => {
            tracing::info!("Session ended, shutting down");
        }
    }
}
