use std::sync::Arc;

use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use tracing::{info, warn};

mod config;
mod error;
mod generator;
mod handlers;
mod history;
mod llm;
mod recipe;
mod routes;
mod state;
mod utils;

use config::{Config, SERVICE_NAME};
use history::FileRecipeLog;
use state::AppState;
use utils::logging::init_logging;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = Config::load()?;
    let _guards = init_logging(&config);

    info!("Starting {SERVICE_NAME}");
    config.log_summary();

    if let Err(err) = std::fs::create_dir_all(&config.result_dir) {
        warn!(
            "Could not create result directory {}: {}; generations will not be logged",
            config.result_dir.display(),
            err
        );
    }

    let addr = config.bind_addr()?;
    let log = Arc::new(FileRecipeLog::new(config.result_dir.clone()));
    let router = routes::create_routes(AppState::new(config, log));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| anyhow!("Failed to bind {addr}: {err}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
