//! aDeal API server — entry point.
//!
//! Exposes the aDeal network over REST: DID-backed identity
//! registration, per-wallet wishlists, wishlist-driven ad matching, and
//! the ADEAL reward ledger with withdrawals. All state lives in an
//! embedded SQLite database owned by `adeal-core`.

mod api;
mod config;
mod errors;
mod seed;

use std::sync::Arc;

use adeal_core::Service;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;

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

    // Open the database, run migrations, and wire up the engine.
    let service = Service::open(&config.database_url).await?;

    if config.seed_demo {
        seed::seed_demo_catalog(&service).await?;
    }

    let state = Arc::new(api::ApiState { service });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/identity", post(api::register))
        .route(
            "/identity/:address",
            get(api::get_identity).put(api::update_profile),
        )
        .route("/identity/:address/did.json", get(api::did_document))
        .route("/wishlist", post(api::add_wishlist_item))
        .route("/wishlist/remove", post(api::remove_wishlist_item))
        .route("/wishlist/:address", get(api::get_wishlist))
        .route("/ads", post(api::publish_ad))
        .route("/ads/search", get(api::search_ads))
        .route("/ads/match/:address", get(api::match_ads))
        .route("/ads/view", post(api::record_view))
        .route("/ads/feedback", post(api::record_feedback))
        .route("/ads/:id/reputation", put(api::update_reputation))
        .route("/rewards/withdraw", post(api::withdraw))
        .route("/rewards/:address/balance", get(api::get_balance))
        .route("/rewards/:address/history", get(api::get_history))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
