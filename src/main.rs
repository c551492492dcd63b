mod config;
mod db;
mod error;
mod extractors;
mod handlers;
mod marketplace;
mod middleware;
mod models;
mod openapi;
mod startup;

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use handlers::MetricsState;
pub use marketplace::Marketplace;

#[derive(Clone)]
pub struct AppState {
    pub market: Marketplace,
    pub config: AppConfig,
    pub metrics: Arc<MetricsState>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Conditional JSON/text logging
    let use_json = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()) == "json";

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,shift_exchange=debug,tower_http=debug".into());

    if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration error: {}", e);
        e
    })?;

    let db = db::create_pool(&config.database_url).await.map_err(|e| {
        tracing::error!("Failed to create database pool: {}", e);
        e
    })?;
    tracing::info!("Database pool created successfully");

    let metrics_state = Arc::new(handlers::setup_metrics_recorder());
    tracing::info!("Metrics recorder initialized");

    let market = Marketplace::new(db);

    let _sweeper = marketplace::sweeper::spawn(market.clone(), config.sweep_interval_secs);
    tracing::info!(
        interval_secs = config.sweep_interval_secs,
        "Expiry sweeper started"
    );

    let listen_addr = config.listen_addr.clone();
    let state = Arc::new(AppState {
        market,
        config,
        metrics: metrics_state,
    });

    let app = startup::build_router(state);

    let listener = TcpListener::bind(&listen_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
