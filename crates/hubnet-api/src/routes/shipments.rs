//! # Shipments API
//!
//! Shipment creation and retrieval.
//!
//! ## Endpoints
//!
//! - `POST /v1/shipments`: create a shipment; the caller (or, for
//!   admins, a named actor) becomes the shipper
//! - `GET /v1/shipments/:id`: fetch a shipment; visible to its
//!   parties, the managers of its route hubs, and admins
//!
//! Creation fixes the price from package weight and the great-circle
//! distance between the two route hubs, and issues the waybill barcode
//! from the process-wide sequence. Everything after creation moves
//! through the approval workflow in [`crate::routes::requests`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use hubnet_core::{ActorId, HubId, ShipmentId, Timestamp};
use hubnet_state::{Shipment, ShipmentStatus};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extract::{extract_validated_json, Validate};
use crate::state::AppState;

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to create a new shipment.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateShipmentRequest {
    /// Origin hub id.
    pub from_hub: HubId,
    /// Destination hub id.
    pub to_hub: HubId,
    /// The actor expected to take delivery.
    pub receiver: ActorId,
    /// Package name.
    pub name: String,
    /// Package description.
    pub description: String,
    /// Package weight in kilograms.
    pub weight_kg: f64,
    /// Measurement unit or dimension code.
    pub measurement: String,
    /// Acting shipper. Bound callers act as themselves; only admins may
    /// name a different actor here.
    pub actor_id: Option<ActorId>,
}

impl Validate for CreateShipmentRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("description must not be empty".to_string());
        }
        if self.measurement.trim().is_empty() {
            return Err("measurement must not be empty".to_string());
        }
        if !(self.weight_kg > 0.0) || !self.weight_kg.is_finite() {
            return Err("weight_kg must be positive and finite".to_string());
        }
        Ok(())
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the shipments router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/shipments", post(create_shipment))
        .route("/v1/shipments/:id", get(get_shipment))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/shipments: Create a new shipment.
#[utoipa::path(
    post,
    path = "/v1/shipments",
    request_body = CreateShipmentRequest,
    responses(
        (status = 201, description = "Shipment created", body = Shipment),
        (status = 404, description = "Hub or actor not found", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody),
    ),
    tag = "shipments"
)]
pub(crate) async fn create_shipment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateShipmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Shipment>), AppError> {
    let req = extract_validated_json(body)?;
    let shipper = caller.acting_actor(req.actor_id.as_ref())?;

    if !state.actors.contains(shipper.as_uuid())? {
        return Err(AppError::NotFound(format!("actor {shipper} not found")));
    }
    if !state.actors.contains(req.receiver.as_uuid())? {
        return Err(AppError::NotFound(format!(
            "actor {} not found",
            req.receiver
        )));
    }
    let from = state
        .hubs
        .get(req.from_hub.as_uuid())?
        .ok_or_else(|| AppError::NotFound(format!("hub {} not found", req.from_hub)))?;
    let to = state
        .hubs
        .get(req.to_hub.as_uuid())?
        .ok_or_else(|| AppError::NotFound(format!("hub {} not found", req.to_hub)))?;

    let distance_km = from.position.distance_km(&to.position);
    let quote = state.config.pricing.quote(req.weight_kg, distance_km)?;
    let unique_code = state.barcodes.next();

    let now = Timestamp::now();
    let shipment = Shipment {
        id: ShipmentId::new(),
        unique_code,
        from_hub: req.from_hub,
        to_hub: req.to_hub,
        shipper: shipper.clone(),
        receiver: req.receiver,
        transporter: None,
        name: req.name,
        description: req.description,
        weight_kg: req.weight_kg,
        measurement: req.measurement,
        amount: quote.amount,
        transporter_amount: quote.transporter_amount,
        status: ShipmentStatus::Pending,
        visits: Vec::new(),
        live: None,
        created_at: now,
        updated_at: now,
    };
    state
        .shipments
        .insert(*shipment.id.as_uuid(), shipment.clone())?;

    tracing::info!(
        shipment = %shipment.id,
        shipper = %shipper,
        unique_code,
        amount = shipment.amount,
        "shipment created"
    );
    Ok((StatusCode::CREATED, Json(shipment)))
}

/// GET /v1/shipments/:id: Fetch a shipment.
#[utoipa::path(
    get,
    path = "/v1/shipments/{id}",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment found", body = Shipment),
        (status = 403, description = "Caller may not view this shipment", body = ErrorBody),
        (status = 404, description = "Shipment not found", body = ErrorBody),
    ),
    tag = "shipments"
)]
pub(crate) async fn get_shipment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Shipment>, AppError> {
    let shipment = state
        .shipments
        .get(&id)?
        .ok_or_else(|| AppError::NotFound(format!("shipment {id} not found")))?;
    authorize_view(&state, &caller, &shipment)?;
    Ok(Json(shipment))
}

/// A shipment is visible to its parties, to the managers of either
/// route hub, and to admins.
fn authorize_view(
    state: &AppState,
    caller: &CallerIdentity,
    shipment: &Shipment,
) -> Result<(), AppError> {
    if caller.is_admin() {
        return Ok(());
    }
    let Some(actor_id) = caller.actor.as_ref() else {
        return Err(AppError::Forbidden(
            "viewing a shipment requires an actor-bound token".to_string(),
        ));
    };
    if shipment.is_party(actor_id) {
        return Ok(());
    }
    if let Some(actor) = state.actors.get(actor_id.as_uuid())? {
        if let Some(hub) = actor.managed_hub() {
            if hub == &shipment.from_hub || hub == &shipment.to_hub {
                return Ok(());
            }
        }
    }
    Err(AppError::Forbidden(
        "only shipment parties, route-hub managers, and admins may view this shipment".to_string(),
    ))
}
