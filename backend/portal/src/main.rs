//! Micro-donation portal backend — entry point.
//!
//! Serves the donation REST API: campaign browsing, donation intake with a
//! simulated QR payment flow, payment verification, and receipt reads.
//! State lives in SQLite; each request runs to completion with no
//! background workers.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use portal::api;
use portal::config::Config;
use portal::db;
use portal::gateway::SimulatedGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    // Load config from environment.
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;

    let state = Arc::new(api::ApiState {
        pool,
        gateway: Arc::new(SimulatedGateway),
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/campaigns", get(api::list_campaigns))
        .route("/campaigns/:id", get(api::get_campaign))
        .route("/campaigns/:id/donations", get(api::campaign_donations))
        .route("/donations", post(api::donate))
        .route("/donations/:id", get(api::donation_receipt))
        .route("/donations/verify", post(api::verify_payment))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
