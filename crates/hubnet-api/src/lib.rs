//! # hubnet-api: Axum API Service for the Hubnet Parcel Network
//!
//! Hubnet coordinates parcel shipments between hubs. Every shipment
//! status change is approval-gated: an actor submits a typed request
//! and the authorizing hub's manager approves or rejects it. Assigned
//! transporters report live positions, fanned out per shipment to
//! WebSocket subscribers.
//!
//! ## API Surface
//!
//! | Prefix                          | Module                  | Domain              |
//! |---------------------------------|-------------------------|---------------------|
//! | `/v1/shipments`                 | [`routes::shipments`]   | Shipment ledger     |
//! | `/v1/shipments/:id/requests`    | [`routes::requests`]    | Approval workflow   |
//! | `/v1/requests/*`                | [`routes::requests`]    | Approval workflow   |
//! | `/v1/shipments/:id/location*`   | [`routes::location`]    | Live location       |
//! | `/v1/hubs/*`                    | [`routes::hubs`]        | Hub directory       |
//! | `/v1/actors/*`                  | [`routes::actors`]      | Actor directory     |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Auto-generated OpenAPI spec via utoipa derive macros at `/openapi.json`.

pub mod auth;
pub mod error;
pub mod extract;
pub mod gate;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware
/// so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::shipments::router())
        .merge(routes::requests::router())
        .merge(routes::location::router())
        .merge(routes::hubs::router())
        .merge(routes::actors::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .with_state(state);

    // Unauthenticated health probes.
    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
