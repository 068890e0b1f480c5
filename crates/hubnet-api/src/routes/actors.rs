//! # Actors API
//!
//! ## Endpoints
//!
//! - `POST /v1/actors`: seed an actor record (admin)
//! - `GET /v1/actors/:id`: fetch an actor profile, cumulative counters
//!   included (the actor themselves, or an admin)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use hubnet_core::HubId;
use hubnet_state::{Actor, ActorRole};

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extract::{extract_validated_json, Validate};
use crate::state::AppState;

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to seed a new actor.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateActorRequest {
    /// Display name.
    pub name: String,
    /// Fixed role: `user`, `hubManager`, or `admin`.
    pub role: ActorRole,
    /// Managed hub; required for `hubManager`, rejected otherwise.
    pub hub: Option<HubId>,
}

impl Validate for CreateActorRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        Ok(())
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the actors router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/actors", post(create_actor))
        .route("/v1/actors/:id", get(get_actor))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/actors: Seed a new actor record.
#[utoipa::path(
    post,
    path = "/v1/actors",
    request_body = CreateActorRequest,
    responses(
        (status = 201, description = "Actor seeded", body = Actor),
        (status = 403, description = "Admin only", body = ErrorBody),
        (status = 404, description = "Affiliated hub not found", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody),
    ),
    tag = "actors"
)]
pub(crate) async fn create_actor(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateActorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Actor>), AppError> {
    require_role(&caller, ActorRole::Admin)?;
    let req = extract_validated_json(body)?;

    if let Some(hub) = &req.hub {
        if !state.hubs.contains(hub.as_uuid())? {
            return Err(AppError::NotFound(format!("hub {hub} not found")));
        }
    }
    let actor = Actor::new(req.name, req.role, req.hub)?;
    state.actors.insert(*actor.id.as_uuid(), actor.clone())?;

    tracing::info!(actor = %actor.id, role = %actor.role, "actor seeded");
    Ok((StatusCode::CREATED, Json(actor)))
}

/// GET /v1/actors/:id: Fetch an actor profile.
#[utoipa::path(
    get,
    path = "/v1/actors/{id}",
    params(("id" = Uuid, Path, description = "Actor ID")),
    responses(
        (status = 200, description = "Actor found", body = Actor),
        (status = 403, description = "Callers may only view their own profile", body = ErrorBody),
        (status = 404, description = "Actor not found", body = ErrorBody),
    ),
    tag = "actors"
)]
pub(crate) async fn get_actor(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Actor>, AppError> {
    let is_self = caller
        .actor
        .as_ref()
        .is_some_and(|actor| actor.as_uuid() == &id);
    if !caller.is_admin() && !is_self {
        return Err(AppError::Forbidden(
            "callers may only view their own profile".to_string(),
        ));
    }
    state
        .actors
        .get(&id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("actor {id} not found")))
}
