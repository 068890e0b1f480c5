//! # Live-Location API
//!
//! ## Endpoints
//!
//! - `POST /v1/shipments/:id/location`: the assigned transporter
//!   reports the shipment's current position
//! - `GET /v1/shipments/:id/location`: latest known position; `null`
//!   before the first report rather than an error
//! - `GET /v1/shipments/:id/location/ws`: WebSocket tracking feed;
//!   sends the latest known position first (when one exists), then
//!   every subsequent report as it is accepted
//!
//! An accepted report is written to the shipment ledger and then fanned
//! out on the shipment's channel topic. The fan-out is best-effort;
//! the ledger entry is what `GET` serves.

use axum::extract::rejection::JsonRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use hubnet_channel::{PositionUpdate, Subscription};
use hubnet_core::{ActorId, GeoPoint, ShipmentId, Timestamp};
use hubnet_state::{LivePosition, Shipment};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extract::extract_json;
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// A transporter's position report.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PublishLocationRequest {
    /// Latitude in degrees, [-90, 90].
    pub lat: f64,
    /// Longitude in degrees, [-180, 180].
    pub lng: f64,
    /// Acting transporter. Bound callers act as themselves; only admins
    /// may name a different actor here.
    pub actor_id: Option<ActorId>,
}

/// The latest known position of a shipment.
#[derive(Debug, Serialize, ToSchema)]
pub struct LocationSnapshot {
    /// The shipment the snapshot belongs to.
    pub shipment_id: ShipmentId,
    /// Latest accepted position report; `null` before the first one.
    pub position: Option<LivePosition>,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the live-location router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/shipments/:id/location",
            get(latest_location).post(publish_location),
        )
        .route("/v1/shipments/:id/location/ws", get(location_ws))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/shipments/:id/location: Report the current position.
#[utoipa::path(
    post,
    path = "/v1/shipments/{id}/location",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = PublishLocationRequest,
    responses(
        (status = 200, description = "Position accepted", body = LocationSnapshot),
        (status = 403, description = "Caller is not the assigned transporter", body = ErrorBody),
        (status = 404, description = "Shipment not found", body = ErrorBody),
        (status = 409, description = "Shipment journey is over", body = ErrorBody),
        (status = 422, description = "Coordinates out of range", body = ErrorBody),
    ),
    tag = "location"
)]
pub(crate) async fn publish_location(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<PublishLocationRequest>, JsonRejection>,
) -> Result<Json<LocationSnapshot>, AppError> {
    let req = extract_json(body)?;
    let actor = caller.acting_actor(req.actor_id.as_ref())?;
    let point = GeoPoint::new(req.lat, req.lng)?;

    let now = Timestamp::now();
    let live = LivePosition {
        point,
        recorded_at: now,
        transporter: actor.clone(),
    };

    // Authorization and the ledger write happen under one guard so a
    // decision landing in between cannot be overwritten by a report
    // that was checked against the older state.
    let accepted = state.shipments.try_update(&id, |shipment| {
        if shipment.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "shipment {} is {}",
                shipment.id, shipment.status
            )));
        }
        if shipment.transporter.as_ref() != Some(&actor) {
            return Err(AppError::Forbidden(
                "only the assigned transporter reports positions".to_string(),
            ));
        }
        shipment.record_position(live.clone());
        Ok(shipment.id.clone())
    })?;
    let shipment_id = match accepted {
        None => return Err(AppError::NotFound(format!("shipment {id} not found"))),
        Some(outcome) => outcome?,
    };

    let delivered = state.channels.publish(PositionUpdate {
        shipment: shipment_id.clone(),
        point,
        recorded_at: now,
        transporter: actor,
    });
    debug!(shipment = %shipment_id, delivered, "position report accepted");

    Ok(Json(LocationSnapshot {
        shipment_id,
        position: Some(live),
    }))
}

/// GET /v1/shipments/:id/location: Latest known position.
#[utoipa::path(
    get,
    path = "/v1/shipments/{id}/location",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Latest position, null before the first report", body = LocationSnapshot),
        (status = 403, description = "Caller may not track this shipment", body = ErrorBody),
        (status = 404, description = "Shipment not found", body = ErrorBody),
    ),
    tag = "location"
)]
pub(crate) async fn latest_location(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<LocationSnapshot>, AppError> {
    let shipment = state
        .shipments
        .get(&id)?
        .ok_or_else(|| AppError::NotFound(format!("shipment {id} not found")))?;
    authorize_tracking(&caller, &shipment)?;
    Ok(Json(LocationSnapshot {
        shipment_id: shipment.id,
        position: shipment.live,
    }))
}

/// GET /v1/shipments/:id/location/ws: WebSocket tracking feed.
#[utoipa::path(
    get,
    path = "/v1/shipments/{id}/location/ws",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 101, description = "Switching protocols: position updates as JSON text frames"),
        (status = 403, description = "Caller may not track this shipment", body = ErrorBody),
        (status = 404, description = "Shipment not found", body = ErrorBody),
    ),
    tag = "location"
)]
pub(crate) async fn location_ws(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let shipment = state
        .shipments
        .get(&id)?
        .ok_or_else(|| AppError::NotFound(format!("shipment {id} not found")))?;
    authorize_tracking(&caller, &shipment)?;

    let subscription = state.channels.subscribe(&shipment.id);
    Ok(ws.on_upgrade(move |socket| stream_positions(socket, subscription)))
}

/// Tracking views are for the shipment's parties and admins.
fn authorize_tracking(caller: &CallerIdentity, shipment: &Shipment) -> Result<(), AppError> {
    if caller.is_admin() {
        return Ok(());
    }
    if let Some(actor) = caller.actor.as_ref() {
        if shipment.is_party(actor) {
            return Ok(());
        }
    }
    Err(AppError::Forbidden(
        "only shipment parties and admins may track this shipment".to_string(),
    ))
}

/// Drive one tracking socket: snapshot first, then the live feed until
/// either side hangs up.
async fn stream_positions(mut socket: WebSocket, subscription: Subscription) {
    let Subscription {
        latest,
        mut receiver,
    } = subscription;

    if let Some(update) = latest {
        if send_update(&mut socket, &update).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            published = receiver.recv() => match published {
                Ok(update) => {
                    if send_update(&mut socket, &update).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!(missed, "tracking subscriber lagged, resuming from the live edge");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Ping(payload))) => {
                    if socket.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                // Inbound frames carry nothing; this is a push feed.
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }
}

async fn send_update(socket: &mut WebSocket, update: &PositionUpdate) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(update).map_err(axum::Error::new)?;
    socket.send(Message::Text(payload)).await
}
