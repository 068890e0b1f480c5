//! # Hubs API
//!
//! Hubs are reference data: admins seed them once and later point each
//! at its gate manager.
//!
//! ## Endpoints
//!
//! - `POST /v1/hubs`: seed a hub (admin; short code must be unique)
//! - `GET /v1/hubs/:id`: fetch a hub (any authenticated caller)
//! - `POST /v1/hubs/:id/manager`: assign or replace the hub's manager
//!   (admin; the actor must be a manager affiliated with this hub)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use hubnet_core::{ActorId, GeoPoint, HubId};
use hubnet_state::{ActorRole, Hub};

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extract::{extract_json, extract_validated_json, Validate};
use crate::state::AppState;

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to seed a new hub.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateHubRequest {
    /// Display name.
    pub name: String,
    /// Short code used on waybills; normalized to uppercase.
    pub code: String,
    /// Latitude in degrees, [-90, 90].
    pub lat: f64,
    /// Longitude in degrees, [-180, 180].
    pub lng: f64,
}

impl Validate for CreateHubRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.code.trim().is_empty() {
            return Err("code must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request to assign a hub's manager.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignManagerRequest {
    /// The manager actor; must be affiliated with this hub.
    pub actor_id: ActorId,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the hubs router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/hubs", post(create_hub))
        .route("/v1/hubs/:id", get(get_hub))
        .route("/v1/hubs/:id/manager", post(assign_manager))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/hubs: Seed a new hub.
#[utoipa::path(
    post,
    path = "/v1/hubs",
    request_body = CreateHubRequest,
    responses(
        (status = 201, description = "Hub seeded", body = Hub),
        (status = 403, description = "Admin only", body = ErrorBody),
        (status = 409, description = "Short code already in use", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody),
    ),
    tag = "hubs"
)]
pub(crate) async fn create_hub(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateHubRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Hub>), AppError> {
    require_role(&caller, ActorRole::Admin)?;
    let req = extract_validated_json(body)?;
    let position = GeoPoint::new(req.lat, req.lng)?;

    let hub = Hub::new(req.name, &req.code, position);
    state.hubs.insert_if(*hub.id.as_uuid(), hub.clone(), |map| {
        if map.values().any(|existing| existing.code == hub.code) {
            Err(AppError::Conflict(format!(
                "hub code {} is already in use",
                hub.code
            )))
        } else {
            Ok(())
        }
    })??;

    tracing::info!(hub = %hub.id, code = %hub.code, "hub seeded");
    Ok((StatusCode::CREATED, Json(hub)))
}

/// GET /v1/hubs/:id: Fetch a hub.
#[utoipa::path(
    get,
    path = "/v1/hubs/{id}",
    params(("id" = Uuid, Path, description = "Hub ID")),
    responses(
        (status = 200, description = "Hub found", body = Hub),
        (status = 404, description = "Hub not found", body = ErrorBody),
    ),
    tag = "hubs"
)]
pub(crate) async fn get_hub(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Hub>, AppError> {
    state
        .hubs
        .get(&id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("hub {id} not found")))
}

/// POST /v1/hubs/:id/manager: Assign or replace the hub's manager.
#[utoipa::path(
    post,
    path = "/v1/hubs/{id}/manager",
    params(("id" = Uuid, Path, description = "Hub ID")),
    request_body = AssignManagerRequest,
    responses(
        (status = 200, description = "Manager assigned", body = Hub),
        (status = 403, description = "Admin only", body = ErrorBody),
        (status = 404, description = "Hub or actor not found", body = ErrorBody),
        (status = 422, description = "Actor is not a manager of this hub", body = ErrorBody),
    ),
    tag = "hubs"
)]
pub(crate) async fn assign_manager(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<AssignManagerRequest>, JsonRejection>,
) -> Result<Json<Hub>, AppError> {
    require_role(&caller, ActorRole::Admin)?;
    let req = extract_json(body)?;
    let hub_id = HubId::from_uuid(id);

    if !state.hubs.contains(&id)? {
        return Err(AppError::NotFound(format!("hub {hub_id} not found")));
    }
    let actor = state
        .actors
        .get(req.actor_id.as_uuid())?
        .ok_or_else(|| AppError::NotFound(format!("actor {} not found", req.actor_id)))?;
    if actor.managed_hub() != Some(&hub_id) {
        return Err(AppError::Validation(format!(
            "actor {} is not a manager affiliated with hub {hub_id}",
            actor.id
        )));
    }

    let updated = state
        .hubs
        .update(&id, |hub| hub.assign_manager(req.actor_id.clone()))?
        .ok_or_else(|| AppError::NotFound(format!("hub {hub_id} not found")))?;

    tracing::info!(hub = %hub_id, manager = %req.actor_id, "hub manager assigned");
    Ok(Json(updated))
}
