use std::sync::Arc;

use anyhow::{Error, Result};
use tracing_subscriber::EnvFilter;

use delivery_engine::{
    api::{AppState, run_api_server},
    config::Config,
    engine::DeliveryEngine,
    ingest::{event_channel, run_ingest},
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::load()?;

    let engine = Arc::new(DeliveryEngine::from_config(config.clone()));

    let (events, receiver) = event_channel(config.event_queue_capacity);
    tokio::spawn(run_ingest(receiver, Arc::clone(&engine)));

    let state = Arc::new(AppState { engine, events });

    run_api_server(config, state)
        .await
        .map_err(|e| anyhow::anyhow!("API server failed: {e}"))?;

    Ok(())
}
