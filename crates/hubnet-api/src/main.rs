//! # hubnet-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the Hubnet parcel network API.
//! Binds to configurable port (default 8080).

use hubnet_api::state::{AppConfig, AppState, DEFAULT_BARCODE_FLOOR};
use hubnet_core::PricingScheme;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Build configuration from environment.
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let auth_token = std::env::var("AUTH_TOKEN").ok().filter(|t| !t.is_empty());
    if auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set: authentication disabled, all callers are admin");
    }

    let barcode_floor: u64 = std::env::var("BARCODE_FLOOR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_BARCODE_FLOOR);

    let config = AppConfig {
        port,
        auth_token,
        barcode_floor,
        pricing: PricingScheme::default(),
    };

    let state = AppState::with_config(config);
    let app = hubnet_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Hubnet API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
