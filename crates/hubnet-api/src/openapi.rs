//! # OpenAPI Documentation
//!
//! Assembles the OpenAPI 3 document for the whole API surface via
//! `utoipa` derive macros and serves it at `GET /openapi.json`. Schemas
//! come from the domain types in `hubnet-core` and `hubnet-state` plus
//! the request/response DTOs declared next to each route.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// OpenAPI document for the Hubnet API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hubnet API",
        version = "0.3.2",
        description = "Parcel shipment coordination: shipment ledger, approval-gated request workflow, and live-location tracking.",
        license(name = "AGPL-3.0-or-later"),
    ),
    paths(
        crate::routes::shipments::create_shipment,
        crate::routes::shipments::get_shipment,
        crate::routes::requests::submit_request,
        crate::routes::requests::pending_requests,
        crate::routes::requests::decide_request,
        crate::routes::location::publish_location,
        crate::routes::location::latest_location,
        crate::routes::location::location_ws,
        crate::routes::hubs::create_hub,
        crate::routes::hubs::get_hub,
        crate::routes::hubs::assign_manager,
        crate::routes::actors::create_actor,
        crate::routes::actors::get_actor,
    ),
    components(schemas(
        hubnet_core::ShipmentId,
        hubnet_core::RequestId,
        hubnet_core::ActorId,
        hubnet_core::HubId,
        hubnet_core::Timestamp,
        hubnet_core::GeoPoint,
        hubnet_state::Shipment,
        hubnet_state::ShipmentStatus,
        hubnet_state::HubVisit,
        hubnet_state::LivePosition,
        hubnet_state::ShipmentRequest,
        hubnet_state::RequestKind,
        hubnet_state::RequestStatus,
        hubnet_state::Actor,
        hubnet_state::ActorRole,
        hubnet_state::ActorCounters,
        hubnet_state::Hub,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::gate::DecisionOutcome,
        crate::routes::shipments::CreateShipmentRequest,
        crate::routes::requests::SubmitRequest,
        crate::routes::requests::DecisionRequest,
        crate::routes::location::PublishLocationRequest,
        crate::routes::location::LocationSnapshot,
        crate::routes::hubs::CreateHubRequest,
        crate::routes::hubs::AssignManagerRequest,
        crate::routes::actors::CreateActorRequest,
    )),
    tags(
        (name = "shipments", description = "Shipment creation and retrieval"),
        (name = "requests", description = "Approval-gated workflow requests and decisions"),
        (name = "location", description = "Live-location reporting and tracking"),
        (name = "hubs", description = "Hub directory and manager assignment"),
        (name = "actors", description = "Actor directory"),
    )
)]
pub struct ApiDoc;

/// Router exposing the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
