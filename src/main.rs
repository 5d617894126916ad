use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill_backend::api;
use quill_backend::broadcast::Broadcaster;
use quill_backend::config::Config;
use quill_backend::db::init_database;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,quill_backend=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    Config::init()?;
    info!("Initialized configuration");

    // Initialize database
    let db = Arc::new(init_database().await?);
    info!("Connected to database");

    // The live-update subscriber registry lives for the whole process
    let broadcaster = Broadcaster::new();

    // Serve until interrupted
    api::start_api_server(db, broadcaster).await?;

    info!("Quill backend shutdown complete");
    Ok(())
}
