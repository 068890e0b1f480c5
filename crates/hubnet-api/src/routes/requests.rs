//! # Approval Workflow API
//!
//! ## Endpoints
//!
//! - `POST /v1/shipments/:id/requests`: submit an approval request
//!   against a shipment (who may submit depends on the request kind)
//! - `GET /v1/requests/pending`: the pending queue; hub managers see
//!   requests their hub authorizes, admins see everything
//! - `POST /v1/requests/:id/decision`: approve or reject a pending
//!   request; only the authorizing hub's manager may decide
//!
//! The handlers resolve who is acting and delegate the domain rules to
//! the approval gate in [`crate::gate`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use hubnet_core::{ActorId, RequestId, ShipmentId};
use hubnet_state::{ActorRole, RequestKind, ShipmentRequest};

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extract::extract_json;
use crate::gate::{self, DecisionOutcome};
use crate::state::AppState;

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to raise an approval request against a shipment.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitRequest {
    /// The action kind.
    pub kind: RequestKind,
    /// Barcode value, for kinds that demand one.
    pub barcode: Option<u64>,
    /// Acting submitter. Bound callers act as themselves; only admins
    /// may name a different actor here.
    pub actor_id: Option<ActorId>,
}

/// A manager's decision on a pending request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DecisionRequest {
    /// `true` approves, `false` rejects.
    pub approve: bool,
    /// Operator notes, recorded on any hub visit the approval appends.
    pub notes: Option<String>,
    /// Acting manager. Bound callers act as themselves; only admins may
    /// name a different actor here.
    pub actor_id: Option<ActorId>,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the approval-workflow router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/shipments/:id/requests", post(submit_request))
        .route("/v1/requests/pending", get(pending_requests))
        .route("/v1/requests/:id/decision", post(decide_request))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/shipments/:id/requests: Submit an approval request.
#[utoipa::path(
    post,
    path = "/v1/shipments/{id}/requests",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = SubmitRequest,
    responses(
        (status = 201, description = "Request admitted, pending approval", body = ShipmentRequest),
        (status = 403, description = "Caller may not submit this kind", body = ErrorBody),
        (status = 404, description = "Shipment or actor not found", body = ErrorBody),
        (status = 409, description = "Shipment status does not admit this kind", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody),
    ),
    tag = "requests"
)]
pub(crate) async fn submit_request(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShipmentRequest>), AppError> {
    let req = extract_json(body)?;
    let actor = caller.acting_actor(req.actor_id.as_ref())?;
    let request = gate::submit(
        &state,
        &ShipmentId::from_uuid(id),
        &actor,
        req.kind,
        req.barcode,
    )?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /v1/requests/pending: The pending approval queue.
///
/// Hub managers get the requests their hub authorizes, oldest first.
/// Admins get the whole network's pending queue.
#[utoipa::path(
    get,
    path = "/v1/requests/pending",
    responses(
        (status = 200, description = "Pending requests, oldest first", body = Vec<ShipmentRequest>),
        (status = 403, description = "Caller has no pending queue", body = ErrorBody),
    ),
    tag = "requests"
)]
pub(crate) async fn pending_requests(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<ShipmentRequest>>, AppError> {
    if caller.is_admin() {
        return Ok(Json(gate::pending_queue(&state, None)?));
    }
    require_role(&caller, ActorRole::HubManager)?;
    let actor_id = caller.actor.as_ref().ok_or_else(|| {
        AppError::Forbidden("the pending queue requires an actor-bound manager token".to_string())
    })?;
    let actor = state
        .actors
        .get(actor_id.as_uuid())?
        .ok_or_else(|| AppError::NotFound(format!("actor {actor_id} not found")))?;
    let hub = actor
        .managed_hub()
        .ok_or_else(|| {
            AppError::Forbidden("only hub managers have a pending queue".to_string())
        })?
        .clone();
    Ok(Json(gate::pending_queue(&state, Some(&hub))?))
}

/// POST /v1/requests/:id/decision: Decide a pending request.
#[utoipa::path(
    post,
    path = "/v1/requests/{id}/decision",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = DecisionOutcome),
        (status = 403, description = "Caller does not manage the authorizing hub", body = ErrorBody),
        (status = 404, description = "Request or actor not found", body = ErrorBody),
        (status = 409, description = "Already decided or shipment state no longer admits it", body = ErrorBody),
    ),
    tag = "requests"
)]
pub(crate) async fn decide_request(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<Json<DecisionOutcome>, AppError> {
    let req = extract_json(body)?;
    let manager = caller.acting_actor(req.actor_id.as_ref())?;
    let outcome = gate::decide(
        &state,
        &RequestId::from_uuid(id),
        &manager,
        req.approve,
        req.notes,
    )?;
    Ok(Json(outcome))
}
