//! Careline - clinic appointment service
//!
//! Loads configuration, wires the application context and serves the JSON
//! routes until Ctrl-C.

use std::sync::Arc;

use anyhow::Context as _;
use careline_api::{http, AppContext};
use careline_infra::{config, init_tracing};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading configuration from the environment
    let dotenv = dotenvy::dotenv();

    let config = config::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => debug!(error = %err, "no .env file loaded"),
    }

    let ctx = Arc::new(AppContext::new(config).context("failed to initialise application")?);
    let app = http::router(Arc::clone(&ctx));

    let listener = TcpListener::bind(&ctx.config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", ctx.config.server.bind_addr))?;
    info!(addr = %listener.local_addr()?, "careline listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    if !ctx.shutdown().await {
        warn!("calendar sync jobs were cancelled during shutdown");
    }
    info!("careline stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
