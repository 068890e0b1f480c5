//! # The Approval Gate
//!
//! Every shipment status change flows through this module: an actor
//! [`submit`]s a typed request, and the authorizing hub's manager
//! [`decide`]s it. The per-kind behavior comes from the static
//! transition-rule table in `hubnet-state`; this module owns the
//! cross-store orchestration around it.
//!
//! ## Atomicity
//!
//! `submit` validates against the latest committed shipment state and
//! inserts the request; the duplicate-pending-print guard runs under a
//! single requests-store write guard. `decide` acquires write guards in
//! the fixed order requests → shipments → actors and performs every
//! check before the first mutation, so a failed decision leaves all
//! three stores untouched and a concurrent second decision observes the
//! first one's committed request status.
//!
//! Between a submit's shipment read and its request insert the shipment
//! may move on; such stale requests are admitted and fail Conflict at
//! decision time instead.

use serde::Serialize;
use utoipa::ToSchema;

use hubnet_core::{ActorId, HubId, RequestId, ShipmentId, Timestamp};
use hubnet_state::{
    CounterCredit, HubSide, HubVisit, RequestKind, RequestStatus, Shipment, ShipmentRequest,
    SubmitterRule,
};

use crate::error::AppError;
use crate::state::AppState;

/// The result of a decision: the decided request and the shipment as
/// committed, for response rendering and logging.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DecisionOutcome {
    /// The request, now carrying its terminal status and audit fields.
    pub request: ShipmentRequest,
    /// The shipment after all approved side effects.
    pub shipment: Shipment,
}

/// Submit an approval request of `kind` against a shipment.
///
/// Validates the submitting actor, the shipment's current status, the
/// per-kind submitter rule, and barcode equality where the kind demands
/// one. The admitted request starts in `Pending Approval` and waits for
/// the authorizing hub's manager.
pub fn submit(
    state: &AppState,
    shipment_id: &ShipmentId,
    actor_id: &ActorId,
    kind: RequestKind,
    barcode: Option<u64>,
) -> Result<ShipmentRequest, AppError> {
    let shipment = state
        .shipments
        .get(shipment_id.as_uuid())?
        .ok_or_else(|| AppError::NotFound(format!("shipment {shipment_id} not found")))?;

    if !state.actors.contains(actor_id.as_uuid())? {
        return Err(AppError::NotFound(format!("actor {actor_id} not found")));
    }

    if shipment.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "shipment {} is {}; it accepts no further requests",
            shipment.id, shipment.status
        )));
    }

    let rule = kind.rule();
    if shipment.status != rule.required_status {
        return Err(AppError::Conflict(format!(
            "a {kind} request requires status {}, shipment {} is {}",
            rule.required_status, shipment.id, shipment.status
        )));
    }

    let permitted = match rule.submitter {
        SubmitterRule::Shipper => &shipment.shipper == actor_id,
        SubmitterRule::AnyActor => true,
        SubmitterRule::AssignedTransporter => shipment.transporter.as_ref() == Some(actor_id),
        SubmitterRule::Receiver => &shipment.receiver == actor_id,
    };
    if !permitted {
        return Err(AppError::Forbidden(format!(
            "actor {actor_id} may not submit a {kind} request for shipment {}",
            shipment.id
        )));
    }

    if rule.needs_barcode {
        match barcode {
            None => {
                return Err(AppError::Validation(format!(
                    "a barcode value is required for {kind} requests"
                )))
            }
            Some(code) if code != shipment.unique_code => {
                return Err(AppError::Validation(format!(
                    "barcode {code} does not match the waybill of shipment {}",
                    shipment.id
                )))
            }
            Some(_) => {}
        }
    }

    let request = ShipmentRequest::new(shipment.id.clone(), actor_id.clone(), kind, barcode);

    if kind == RequestKind::Print {
        // Scan-then-insert under one write guard: two racing print
        // submissions cannot both pass the pending check.
        state
            .requests
            .insert_if(*request.id.as_uuid(), request.clone(), |map| {
                let duplicate = map.values().any(|r| {
                    r.shipment == request.shipment
                        && r.kind == RequestKind::Print
                        && r.status == RequestStatus::PendingApproval
                });
                if duplicate {
                    Err(AppError::Conflict(format!(
                        "a print request is already pending for shipment {}",
                        request.shipment
                    )))
                } else {
                    Ok(())
                }
            })??;
    } else {
        state
            .requests
            .insert(*request.id.as_uuid(), request.clone())?;
    }

    tracing::info!(
        shipment = %request.shipment,
        request = %request.id,
        kind = %kind,
        actor = %actor_id,
        "approval request submitted"
    );
    Ok(request)
}

/// Decide a pending request: approve and apply every side effect its
/// rule names, or reject.
///
/// Only the manager of the authorizing hub may decide; the admin role
/// grants no exemption from hub scope. A request whose shipment has
/// since turned terminal, or (for approvals) has moved past the rule's
/// required status, fails Conflict and stays pending.
pub fn decide(
    state: &AppState,
    request_id: &RequestId,
    manager_id: &ActorId,
    approve: bool,
    notes: Option<String>,
) -> Result<DecisionOutcome, AppError> {
    let manager = state
        .actors
        .get(manager_id.as_uuid())?
        .ok_or_else(|| AppError::NotFound(format!("actor {manager_id} not found")))?;

    // The authorization inputs are all immutable after creation (route
    // hubs, request kind, the manager's affiliation), so they are read
    // outside the commit guards.
    let peeked = state
        .requests
        .get(request_id.as_uuid())?
        .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;
    let rule = peeked.kind.rule();

    let route = state
        .shipments
        .get(peeked.shipment.as_uuid())?
        .ok_or_else(|| AppError::NotFound(format!("shipment {} not found", peeked.shipment)))?;
    let authorizing_hub = match rule.authorizing {
        HubSide::Origin => route.from_hub.clone(),
        HubSide::Destination => route.to_hub.clone(),
    };
    if manager.managed_hub() != Some(&authorizing_hub) {
        return Err(AppError::Forbidden(format!(
            "only the manager of hub {authorizing_hub} may decide {} requests for shipment {}",
            peeked.kind, peeked.shipment
        )));
    }

    let visit_position = match rule.visit {
        Some(HubSide::Origin) => state.hubs.get(route.from_hub.as_uuid())?.map(|h| h.position),
        Some(HubSide::Destination) => state.hubs.get(route.to_hub.as_uuid())?.map(|h| h.position),
        None => None,
    };

    // Commit phase. Guards are acquired in the fixed requests →
    // shipments → actors order; every remaining check runs before the
    // first mutation so a failure commits nothing.
    let mut requests = state.requests.lock_write()?;
    let request = requests
        .get_mut(request_id.as_uuid())
        .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;
    if request.status.is_decided() {
        return Err(AppError::Conflict(format!(
            "request {} is already {}",
            request.id, request.status
        )));
    }

    let mut shipments = state.shipments.lock_write()?;
    let shipment = shipments.get_mut(request.shipment.as_uuid()).ok_or_else(|| {
        AppError::Internal(format!(
            "shipment {} missing for request {}",
            request.shipment, request.id
        ))
    })?;
    if shipment.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "shipment {} is {}; request {} is stale",
            shipment.id, shipment.status, request.id
        )));
    }

    let now = Timestamp::now();

    if approve {
        if shipment.status != rule.required_status {
            return Err(AppError::Conflict(format!(
                "shipment {} moved to {}; request {} is stale",
                shipment.id, shipment.status, request.id
            )));
        }

        // Resolve the credited party and hold the actors guard before
        // any mutation; a vanished payee aborts the whole decision.
        let payee: Option<(ActorId, CounterCredit, f64)> = match rule.credit {
            None => None,
            Some(CounterCredit::Shipper) => Some((
                shipment.shipper.clone(),
                CounterCredit::Shipper,
                shipment.amount,
            )),
            Some(CounterCredit::Transporter) => {
                let transporter = shipment.transporter.clone().ok_or_else(|| {
                    AppError::Conflict(format!(
                        "shipment {} has no assigned transporter to credit",
                        shipment.id
                    ))
                })?;
                Some((
                    transporter,
                    CounterCredit::Transporter,
                    shipment.transporter_amount,
                ))
            }
            Some(CounterCredit::Receiver) => Some((
                shipment.receiver.clone(),
                CounterCredit::Receiver,
                shipment.amount,
            )),
        };
        let mut actors = match &payee {
            Some(_) => Some(state.actors.lock_write()?),
            None => None,
        };
        if let (Some(guard), Some((payee_id, _, _))) = (&actors, &payee) {
            if !guard.contains_key(payee_id.as_uuid()) {
                return Err(AppError::NotFound(format!("actor {payee_id} not found")));
            }
        }

        if request.kind == RequestKind::Pickup {
            shipment.transporter = Some(request.actor.clone());
        }
        if let Some(target) = rule.approved_status {
            shipment.advance(target, now)?;
        }
        if let Some(side) = rule.visit {
            let hub = match side {
                HubSide::Origin => shipment.from_hub.clone(),
                HubSide::Destination => shipment.to_hub.clone(),
            };
            shipment.record_visit(HubVisit {
                hub,
                actor: request.actor.clone(),
                kind: request.kind,
                at: now,
                notes,
                position: visit_position,
            });
        }
        if let (Some(guard), Some((payee_id, credit, amount))) = (&mut actors, &payee) {
            if let Some(actor) = guard.get_mut(payee_id.as_uuid()) {
                actor.counters.apply(*credit, *amount);
            }
        }
        request.mark_approved(manager_id.clone(), now)?;
    } else {
        if let Some(target) = rule.rejected_status {
            // A rejected print cancels the shipment. On a stale print
            // (shipment already picked up) the cancel edge no longer
            // exists and this fails Conflict before any mutation.
            shipment.advance(target, now)?;
        }
        request.mark_rejected(manager_id.clone(), now)?;
    }

    let outcome = DecisionOutcome {
        request: request.clone(),
        shipment: shipment.clone(),
    };
    drop(shipments);
    drop(requests);

    tracing::info!(
        shipment = %outcome.shipment.id,
        request = %outcome.request.id,
        kind = %outcome.request.kind,
        manager = %manager_id,
        approved = approve,
        status = %outcome.shipment.status,
        "request decided"
    );
    Ok(outcome)
}

/// List pending requests, oldest first.
///
/// With a hub scope, only requests whose authorizing hub matches are
/// returned; this is the queue a hub manager works through.
pub fn pending_queue(
    state: &AppState,
    hub: Option<&HubId>,
) -> Result<Vec<ShipmentRequest>, AppError> {
    let mut pending = state
        .requests
        .filter(|r| r.status == RequestStatus::PendingApproval)?;

    if let Some(hub) = hub {
        let mut scoped = Vec::with_capacity(pending.len());
        for request in pending {
            let Some(shipment) = state.shipments.get(request.shipment.as_uuid())? else {
                continue;
            };
            let authorizing = match request.kind.rule().authorizing {
                HubSide::Origin => &shipment.from_hub,
                HubSide::Destination => &shipment.to_hub,
            };
            if authorizing == hub {
                scoped.push(request);
            }
        }
        pending = scoped;
    }

    pending.sort_by_key(|r| r.created_at);
    Ok(pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubnet_core::GeoPoint;
    use hubnet_state::{Actor, ActorRole, Hub, ShipmentStatus};

    struct Network {
        state: AppState,
        origin: Hub,
        destination: Hub,
        shipper: Actor,
        transporter: Actor,
        receiver: Actor,
        origin_manager: Actor,
        destination_manager: Actor,
    }

    fn seeded_network() -> Network {
        let state = AppState::new();

        let origin = Hub::new(
            "Karachi Central".to_string(),
            "KHI-01",
            GeoPoint::new(24.8607, 67.0011).unwrap(),
        );
        let destination = Hub::new(
            "Lahore North".to_string(),
            "LHE-02",
            GeoPoint::new(31.5204, 74.3587).unwrap(),
        );
        state
            .hubs
            .insert(*origin.id.as_uuid(), origin.clone())
            .unwrap();
        state
            .hubs
            .insert(*destination.id.as_uuid(), destination.clone())
            .unwrap();

        let shipper = Actor::new("Asad Traders".to_string(), ActorRole::User, None).unwrap();
        let transporter = Actor::new("Bilal Courier".to_string(), ActorRole::User, None).unwrap();
        let receiver = Actor::new("Chenab Retail".to_string(), ActorRole::User, None).unwrap();
        let origin_manager = Actor::new(
            "KHI gate desk".to_string(),
            ActorRole::HubManager,
            Some(origin.id.clone()),
        )
        .unwrap();
        let destination_manager = Actor::new(
            "LHE gate desk".to_string(),
            ActorRole::HubManager,
            Some(destination.id.clone()),
        )
        .unwrap();
        for actor in [
            &shipper,
            &transporter,
            &receiver,
            &origin_manager,
            &destination_manager,
        ] {
            state
                .actors
                .insert(*actor.id.as_uuid(), (*actor).clone())
                .unwrap();
        }

        Network {
            state,
            origin,
            destination,
            shipper,
            transporter,
            receiver,
            origin_manager,
            destination_manager,
        }
    }

    /// Insert a Pending shipment the way the create route does.
    fn post_shipment(net: &Network) -> Shipment {
        let distance = net.origin.position.distance_km(&net.destination.position);
        let quote = net.state.config.pricing.quote(12.5, distance).unwrap();
        let now = Timestamp::now();
        let shipment = Shipment {
            id: ShipmentId::new(),
            unique_code: net.state.barcodes.next(),
            from_hub: net.origin.id.clone(),
            to_hub: net.destination.id.clone(),
            shipper: net.shipper.id.clone(),
            receiver: net.receiver.id.clone(),
            transporter: None,
            name: "ceramic tiles".to_string(),
            description: "two crates, fragile".to_string(),
            weight_kg: 12.5,
            measurement: "kg".to_string(),
            amount: quote.amount,
            transporter_amount: quote.transporter_amount,
            status: ShipmentStatus::Pending,
            visits: Vec::new(),
            live: None,
            created_at: now,
            updated_at: now,
        };
        net.state
            .shipments
            .insert(*shipment.id.as_uuid(), shipment.clone())
            .unwrap();
        shipment
    }

    /// Put a shipment directly into a given state, bypassing the gate.
    fn force(
        net: &Network,
        id: &ShipmentId,
        status: ShipmentStatus,
        transporter: Option<ActorId>,
    ) {
        net.state
            .shipments
            .update(id.as_uuid(), |s| {
                s.status = status;
                s.transporter = transporter;
            })
            .unwrap()
            .unwrap();
    }

    fn counters_of(net: &Network, actor: &Actor) -> hubnet_state::ActorCounters {
        net.state
            .actors
            .get(actor.id.as_uuid())
            .unwrap()
            .unwrap()
            .counters
    }

    // -- submit ---------------------------------------------------------------

    #[test]
    fn submit_print_by_shipper_is_admitted_pending() {
        let net = seeded_network();
        let shipment = post_shipment(&net);

        let request = submit(
            &net.state,
            &shipment.id,
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap();

        assert_eq!(request.status, RequestStatus::PendingApproval);
        assert!(!request.is_accepted);
        let stored = net
            .state
            .requests
            .get(request.id.as_uuid())
            .unwrap()
            .unwrap();
        assert_eq!(stored, request);
    }

    #[test]
    fn submit_unknown_shipment_is_not_found() {
        let net = seeded_network();
        let err = submit(
            &net.state,
            &ShipmentId::new(),
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn submit_unknown_actor_is_not_found() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        let err = submit(
            &net.state,
            &shipment.id,
            &ActorId::new(),
            RequestKind::Pickup,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn submit_print_by_receiver_is_forbidden() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        let err = submit(
            &net.state,
            &shipment.id,
            &net.receiver.id,
            RequestKind::Print,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn submit_second_pending_print_conflicts() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        submit(
            &net.state,
            &shipment.id,
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap();

        let err = submit(
            &net.state,
            &shipment.id,
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(net.state.requests.len().unwrap(), 1);
    }

    #[test]
    fn print_can_be_resubmitted_once_the_first_is_decided() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        let first = submit(
            &net.state,
            &shipment.id,
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap();
        decide(&net.state, &first.id, &net.origin_manager.id, true, None).unwrap();

        // Approval leaves the shipment Pending, so another print passes
        // both the status check and the single-pending guard.
        submit(
            &net.state,
            &shipment.id,
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap();
    }

    #[test]
    fn submit_in_wrong_status_conflicts() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        force(
            &net,
            &shipment.id,
            ShipmentStatus::Assigned,
            Some(net.transporter.id.clone()),
        );

        let err = submit(
            &net.state,
            &shipment.id,
            &net.transporter.id,
            RequestKind::Pickup,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn submit_against_terminal_shipment_conflicts() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        force(&net, &shipment.id, ShipmentStatus::Canceled, None);

        let err = submit(
            &net.state,
            &shipment.id,
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn submit_scan_demands_the_matching_barcode() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        force(
            &net,
            &shipment.id,
            ShipmentStatus::Assigned,
            Some(net.transporter.id.clone()),
        );

        let missing = submit(
            &net.state,
            &shipment.id,
            &net.transporter.id,
            RequestKind::Scan,
            None,
        )
        .unwrap_err();
        assert!(matches!(missing, AppError::Validation(_)));

        let wrong = submit(
            &net.state,
            &shipment.id,
            &net.transporter.id,
            RequestKind::Scan,
            Some(shipment.unique_code + 1),
        )
        .unwrap_err();
        assert!(matches!(wrong, AppError::Validation(_)));

        let request = submit(
            &net.state,
            &shipment.id,
            &net.transporter.id,
            RequestKind::Scan,
            Some(shipment.unique_code),
        )
        .unwrap();
        assert_eq!(request.barcode, Some(shipment.unique_code));
    }

    #[test]
    fn submit_scan_by_anyone_but_the_assigned_transporter_is_forbidden() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        force(
            &net,
            &shipment.id,
            ShipmentStatus::Assigned,
            Some(net.transporter.id.clone()),
        );

        let err = submit(
            &net.state,
            &shipment.id,
            &net.shipper.id,
            RequestKind::Scan,
            Some(shipment.unique_code),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    // -- decide: authorization ------------------------------------------------

    #[test]
    fn decide_by_the_wrong_hubs_manager_is_forbidden() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        let print = submit(
            &net.state,
            &shipment.id,
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap();

        // Print authorizes the origin hub; the destination manager is out of scope.
        let err = decide(
            &net.state,
            &print.id,
            &net.destination_manager.id,
            true,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let stored = net.state.requests.get(print.id.as_uuid()).unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::PendingApproval);
    }

    #[test]
    fn admin_gets_no_exemption_from_hub_scope() {
        let net = seeded_network();
        let admin = Actor::new("ops root".to_string(), ActorRole::Admin, None).unwrap();
        net.state
            .actors
            .insert(*admin.id.as_uuid(), admin.clone())
            .unwrap();

        let shipment = post_shipment(&net);
        let print = submit(
            &net.state,
            &shipment.id,
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap();

        let err = decide(&net.state, &print.id, &admin.id, true, None).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn decide_unknown_request_is_not_found() {
        let net = seeded_network();
        let err = decide(
            &net.state,
            &RequestId::new(),
            &net.origin_manager.id,
            true,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn decide_by_unknown_actor_is_not_found() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        let print = submit(
            &net.state,
            &shipment.id,
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap();
        let err = decide(&net.state, &print.id, &ActorId::new(), true, None).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    // -- decide: side effects -------------------------------------------------

    #[test]
    fn approved_print_credits_the_shipper_and_leaves_status_alone() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        let print = submit(
            &net.state,
            &shipment.id,
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap();

        let outcome = decide(&net.state, &print.id, &net.origin_manager.id, true, None).unwrap();

        assert_eq!(outcome.request.status, RequestStatus::Approved);
        assert!(outcome.request.is_accepted);
        assert_eq!(outcome.request.decided_by, Some(net.origin_manager.id.clone()));
        assert_eq!(outcome.shipment.status, ShipmentStatus::Pending);

        let counters = counters_of(&net, &net.shipper);
        assert_eq!(counters.products_shipped, 1);
        assert_eq!(counters.amount_shipped, shipment.amount);
        assert_eq!(counters.products_received, 0);
    }

    #[test]
    fn rejected_print_cancels_the_shipment() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        let print = submit(
            &net.state,
            &shipment.id,
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap();

        let outcome = decide(&net.state, &print.id, &net.origin_manager.id, false, None).unwrap();

        assert_eq!(outcome.request.status, RequestStatus::Rejected);
        assert!(!outcome.request.is_accepted);
        assert_eq!(outcome.shipment.status, ShipmentStatus::Canceled);

        // No counters move on rejection.
        assert_eq!(counters_of(&net, &net.shipper).products_shipped, 0);
    }

    #[test]
    fn rejected_pickup_leaves_the_shipment_untouched() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        let pickup = submit(
            &net.state,
            &shipment.id,
            &net.transporter.id,
            RequestKind::Pickup,
            None,
        )
        .unwrap();

        let outcome = decide(&net.state, &pickup.id, &net.origin_manager.id, false, None).unwrap();

        assert_eq!(outcome.request.status, RequestStatus::Rejected);
        assert_eq!(outcome.shipment.status, ShipmentStatus::Pending);
        assert!(outcome.shipment.transporter.is_none());
    }

    #[test]
    fn approved_pickup_assigns_the_submitting_transporter() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        let pickup = submit(
            &net.state,
            &shipment.id,
            &net.transporter.id,
            RequestKind::Pickup,
            None,
        )
        .unwrap();

        let outcome = decide(&net.state, &pickup.id, &net.origin_manager.id, true, None).unwrap();

        assert_eq!(outcome.shipment.status, ShipmentStatus::Assigned);
        assert_eq!(
            outcome.shipment.transporter,
            Some(net.transporter.id.clone())
        );
        // Pickup credits nobody.
        assert_eq!(counters_of(&net, &net.transporter).products_transported, 0);
    }

    #[test]
    fn approved_scan_appends_the_origin_visit_and_credits_the_transporter() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        force(
            &net,
            &shipment.id,
            ShipmentStatus::Assigned,
            Some(net.transporter.id.clone()),
        );
        let scan = submit(
            &net.state,
            &shipment.id,
            &net.transporter.id,
            RequestKind::Scan,
            Some(shipment.unique_code),
        )
        .unwrap();

        let outcome = decide(
            &net.state,
            &scan.id,
            &net.origin_manager.id,
            true,
            Some("left dock 3".to_string()),
        )
        .unwrap();

        assert_eq!(outcome.shipment.status, ShipmentStatus::OnTheWay);
        assert_eq!(outcome.shipment.visits.len(), 1);
        let visit = &outcome.shipment.visits[0];
        assert_eq!(visit.hub, net.origin.id);
        assert_eq!(visit.actor, net.transporter.id);
        assert_eq!(visit.kind, RequestKind::Scan);
        assert_eq!(visit.notes.as_deref(), Some("left dock 3"));
        assert_eq!(visit.position, Some(net.origin.position));

        let counters = counters_of(&net, &net.transporter);
        assert_eq!(counters.products_transported, 1);
        assert_eq!(counters.amount_transported, shipment.transporter_amount);
    }

    #[test]
    fn second_decision_on_the_same_request_conflicts() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        let pickup = submit(
            &net.state,
            &shipment.id,
            &net.transporter.id,
            RequestKind::Pickup,
            None,
        )
        .unwrap();

        decide(&net.state, &pickup.id, &net.origin_manager.id, true, None).unwrap();
        let err = decide(&net.state, &pickup.id, &net.origin_manager.id, false, None).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The first decision stands.
        let stored = net
            .state
            .requests
            .get(pickup.id.as_uuid())
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, RequestStatus::Approved);
    }

    #[test]
    fn stale_pickup_fails_at_decision_time_and_stays_recorded() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        let first = submit(
            &net.state,
            &shipment.id,
            &net.transporter.id,
            RequestKind::Pickup,
            None,
        )
        .unwrap();
        let rival = Actor::new("Dadu Freight".to_string(), ActorRole::User, None).unwrap();
        net.state
            .actors
            .insert(*rival.id.as_uuid(), rival.clone())
            .unwrap();
        let second = submit(
            &net.state,
            &shipment.id,
            &rival.id,
            RequestKind::Pickup,
            None,
        )
        .unwrap();

        decide(&net.state, &first.id, &net.origin_manager.id, true, None).unwrap();

        // The rival's request was admitted while the shipment was still
        // Pending; by decision time it is stale.
        let err = decide(&net.state, &second.id, &net.origin_manager.id, true, None).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = net
            .state
            .requests
            .get(second.id.as_uuid())
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, RequestStatus::PendingApproval);
        let committed = net
            .state
            .shipments
            .get(shipment.id.as_uuid())
            .unwrap()
            .unwrap();
        assert_eq!(committed.transporter, Some(net.transporter.id.clone()));
    }

    #[test]
    fn racing_decisions_produce_exactly_one_winner() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        let pickup = submit(
            &net.state,
            &shipment.id,
            &net.transporter.id,
            RequestKind::Pickup,
            None,
        )
        .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let state = net.state.clone();
            let request = pickup.id.clone();
            let manager = net.origin_manager.id.clone();
            handles.push(std::thread::spawn(move || {
                decide(&state, &request, &manager, true, None).is_ok()
            }));
        }
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1, "exactly one racing decision may commit");

        let committed = net
            .state
            .shipments
            .get(shipment.id.as_uuid())
            .unwrap()
            .unwrap();
        assert_eq!(committed.status, ShipmentStatus::Assigned);
    }

    // -- the whole lifecycle --------------------------------------------------

    #[test]
    fn full_lifecycle_from_print_to_received() {
        let net = seeded_network();
        let shipment = post_shipment(&net);
        let code = shipment.unique_code;

        let print = submit(
            &net.state,
            &shipment.id,
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap();
        decide(&net.state, &print.id, &net.origin_manager.id, true, None).unwrap();

        let pickup = submit(
            &net.state,
            &shipment.id,
            &net.transporter.id,
            RequestKind::Pickup,
            None,
        )
        .unwrap();
        let outcome = decide(&net.state, &pickup.id, &net.origin_manager.id, true, None).unwrap();
        assert_eq!(outcome.shipment.status, ShipmentStatus::Assigned);

        let scan = submit(
            &net.state,
            &shipment.id,
            &net.transporter.id,
            RequestKind::Scan,
            Some(code),
        )
        .unwrap();
        let outcome = decide(&net.state, &scan.id, &net.origin_manager.id, true, None).unwrap();
        assert_eq!(outcome.shipment.status, ShipmentStatus::OnTheWay);

        let delivery = submit(
            &net.state,
            &shipment.id,
            &net.transporter.id,
            RequestKind::Delivery,
            None,
        )
        .unwrap();
        let outcome = decide(
            &net.state,
            &delivery.id,
            &net.destination_manager.id,
            true,
            None,
        )
        .unwrap();
        assert_eq!(outcome.shipment.status, ShipmentStatus::Reached);

        let receive = submit(
            &net.state,
            &shipment.id,
            &net.receiver.id,
            RequestKind::Receive,
            None,
        )
        .unwrap();
        let outcome = decide(
            &net.state,
            &receive.id,
            &net.destination_manager.id,
            true,
            None,
        )
        .unwrap();
        assert_eq!(outcome.shipment.status, ShipmentStatus::PendingReceiptApproval);

        let receive_scan = submit(
            &net.state,
            &shipment.id,
            &net.receiver.id,
            RequestKind::ReceiveScan,
            Some(code),
        )
        .unwrap();
        let outcome = decide(
            &net.state,
            &receive_scan.id,
            &net.destination_manager.id,
            true,
            None,
        )
        .unwrap();
        assert_eq!(outcome.shipment.status, ShipmentStatus::Received);

        // Counters: shipper 1 shipment, transporter both legs, receiver 1 receipt.
        let shipper = counters_of(&net, &net.shipper);
        assert_eq!(shipper.products_shipped, 1);
        assert_eq!(shipper.amount_shipped, shipment.amount);
        let transporter = counters_of(&net, &net.transporter);
        assert_eq!(transporter.products_transported, 2);
        assert_eq!(
            transporter.amount_transported,
            2.0 * shipment.transporter_amount
        );
        let receiver = counters_of(&net, &net.receiver);
        assert_eq!(receiver.products_received, 1);
        assert_eq!(receiver.amount_received, shipment.amount);

        // Visit history: out of the origin, into the destination.
        assert_eq!(outcome.shipment.visits.len(), 2);
        assert_eq!(outcome.shipment.visits[0].hub, net.origin.id);
        assert_eq!(outcome.shipment.visits[1].hub, net.destination.id);

        // Terminal: nothing further is accepted.
        let err = submit(
            &net.state,
            &shipment.id,
            &net.receiver.id,
            RequestKind::Receive,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    // -- pending queue --------------------------------------------------------

    #[test]
    fn pending_queue_scopes_by_authorizing_hub() {
        let net = seeded_network();
        let first = post_shipment(&net);
        let second = post_shipment(&net);
        force(
            &net,
            &second.id,
            ShipmentStatus::OnTheWay,
            Some(net.transporter.id.clone()),
        );

        let print = submit(
            &net.state,
            &first.id,
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap();
        let delivery = submit(
            &net.state,
            &second.id,
            &net.transporter.id,
            RequestKind::Delivery,
            None,
        )
        .unwrap();

        let origin_queue = pending_queue(&net.state, Some(&net.origin.id)).unwrap();
        assert_eq!(origin_queue.len(), 1);
        assert_eq!(origin_queue[0].id, print.id);

        let destination_queue = pending_queue(&net.state, Some(&net.destination.id)).unwrap();
        assert_eq!(destination_queue.len(), 1);
        assert_eq!(destination_queue[0].id, delivery.id);

        let all = pending_queue(&net.state, None).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn pending_queue_is_oldest_first_and_drops_decided_requests() {
        let net = seeded_network();
        let shipment = post_shipment(&net);

        let print = submit(
            &net.state,
            &shipment.id,
            &net.shipper.id,
            RequestKind::Print,
            None,
        )
        .unwrap();
        let pickup = submit(
            &net.state,
            &shipment.id,
            &net.transporter.id,
            RequestKind::Pickup,
            None,
        )
        .unwrap();

        let queue = pending_queue(&net.state, Some(&net.origin.id)).unwrap();
        assert_eq!(queue.len(), 2);
        assert!(queue[0].created_at <= queue[1].created_at);

        decide(&net.state, &print.id, &net.origin_manager.id, true, None).unwrap();
        let queue = pending_queue(&net.state, Some(&net.origin.id)).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, pickup.id);
    }
}
