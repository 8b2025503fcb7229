use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use scholar_backend::core::config::AppPaths;
use scholar_backend::core::logging;
use scholar_backend::server;
use scholar_backend::state::AppState;

/// `PORT` picks the listening port; unset or invalid means any free port.
fn listen_addr() -> SocketAddr {
    let port = env::var("PORT")
        .ok()
        .and_then(|raw| raw.trim().parse::<u16>().ok())
        .unwrap_or(0);
    SocketAddr::from(([127, 0, 0, 1], port))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let state = AppState::initialize(paths).await?;
    tracing::info!(
        "Judge model {} via {}, answer model {}",
        state.settings.llm.judge_model,
        state.llm.name(),
        state.settings.llm.answer_model
    );

    let addr = listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let bound = listener.local_addr()?;

    // The desktop shell reads the port from stdout.
    println!("SCHOLAR_PORT={}", bound.port());
    tracing::info!("Listening on {}", bound);

    axum::serve(listener, server::router::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}
