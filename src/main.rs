use std::{error::Error, sync::Arc};

use clap::Parser;
use log::{info, warn};

mod api;
mod config;
mod engine;
mod error;
mod processing;
mod storage;
mod tests_common;

use config::{Args, Config};

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => warn!("Unable to listen for shutdown signal: {e}"),
    }
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn Error>> {
    // init .env
    dotenvy::dotenv().ok();
    dotenvy::from_filename(".env.local").ok();

    // init logger
    env_logger::init();

    // init cli
    let config = Config::try_from(Args::parse())?;

    let state = Arc::new(api::AppState::from_config(&config));
    state.store.ensure_root()?;

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(
        "Listening on http://{} (media in {})",
        config.bind,
        state.store.root().display()
    );

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
