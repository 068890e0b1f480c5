//! # Shipment Lifecycle State Machine
//!
//! A shipment moves hub-to-hub along a fixed forward path, with a single
//! cancellation branch available before pickup:
//!
//! ```text
//! Pending ──(pickup approved)──▶ Assigned ──(scan approved)──▶ On the way
//!    │                                                             │
//!    │ (print rejected)                              (delivery approved)
//!    ▼                                                             ▼
//! Canceled [terminal]                                           Reached
//!                                                                  │
//!                                                   (receive approved)
//!                                                                  ▼
//!                            Received ◀──(receive-scan approved)── Pending
//!                           [terminal]                     Receipt Approval
//! ```
//!
//! Every edge is driven by exactly one approved request; no code path
//! writes a status outside this graph. [`Shipment::advance`] is the only
//! mutator of `status` and rejects off-graph targets at runtime.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use hubnet_core::{ActorId, GeoPoint, HubId, ShipmentId, Timestamp};

use crate::request::RequestKind;

/// Runtime shipment status.
///
/// Wire names are the human-facing strings printed on waybills and shown
/// in tracking UIs, spaces included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ShipmentStatus {
    /// Created, barcode issued, awaiting print approval and pickup.
    #[serde(rename = "Pending")]
    Pending,
    /// A transporter has been assigned by an approved pickup.
    #[serde(rename = "Assigned")]
    Assigned,
    /// Scanned out of the origin hub and in transit.
    #[serde(rename = "On the way")]
    OnTheWay,
    /// Arrived at the destination hub.
    #[serde(rename = "Reached")]
    Reached,
    /// Receiver has claimed the parcel; awaiting the receipt scan.
    #[serde(rename = "Pending Receipt Approval")]
    PendingReceiptApproval,
    /// Handed over to the receiver. Terminal.
    #[serde(rename = "Received")]
    Received,
    /// Canceled before entering circulation. Terminal.
    #[serde(rename = "Canceled")]
    Canceled,
}

impl ShipmentStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Assigned => "Assigned",
            Self::OnTheWay => "On the way",
            Self::Reached => "Reached",
            Self::PendingReceiptApproval => "Pending Receipt Approval",
            Self::Received => "Received",
            Self::Canceled => "Canceled",
        }
    }

    /// Convert a canonical status name to a `ShipmentStatus`.
    ///
    /// Returns `None` for any other input.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Pending" => Some(Self::Pending),
            "Assigned" => Some(Self::Assigned),
            "On the way" => Some(Self::OnTheWay),
            "Reached" => Some(Self::Reached),
            "Pending Receipt Approval" => Some(Self::PendingReceiptApproval),
            "Received" => Some(Self::Received),
            "Canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Whether this is a terminal status. Terminal shipments accept no
    /// further requests of any kind.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Received | Self::Canceled)
    }

    /// Whether a shipment in this status must carry an assigned
    /// transporter. `transporter` is `Some` on a shipment if and only
    /// if its status satisfies this predicate.
    pub fn holds_transporter(&self) -> bool {
        matches!(
            self,
            Self::Assigned
                | Self::OnTheWay
                | Self::Reached
                | Self::PendingReceiptApproval
                | Self::Received
        )
    }

    /// Return the set of valid target statuses from this status.
    pub fn valid_transitions(&self) -> &'static [ShipmentStatus] {
        match self {
            Self::Pending => &[Self::Assigned, Self::Canceled],
            Self::Assigned => &[Self::OnTheWay],
            Self::OnTheWay => &[Self::Reached],
            Self::Reached => &[Self::PendingReceiptApproval],
            Self::PendingReceiptApproval => &[Self::Received],
            Self::Received => &[],
            Self::Canceled => &[],
        }
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error during shipment state operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    /// The requested edge does not exist in the lifecycle graph.
    #[error("invalid shipment transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: ShipmentStatus,
        /// Attempted target status.
        to: ShipmentStatus,
    },
    /// The target status requires an assigned transporter.
    #[error("transition to {to} requires an assigned transporter")]
    TransporterRequired {
        /// Attempted target status.
        to: ShipmentStatus,
    },
}

/// One entry in a shipment's location history: the shipment passed
/// through a hub under some approved action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HubVisit {
    /// The hub where the event took place.
    pub hub: HubId,
    /// The actor whose approved request produced the event.
    pub actor: ActorId,
    /// Which kind of action produced the event.
    pub kind: RequestKind,
    /// When the event was recorded.
    pub at: Timestamp,
    /// Free-form operator notes, if any.
    pub notes: Option<String>,
    /// The hub's coordinates at recording time, when known.
    pub position: Option<GeoPoint>,
}

/// The latest known live position of a shipment, reported by its
/// assigned transporter. Overwritten on every accepted report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LivePosition {
    /// Reported coordinates.
    #[serde(flatten)]
    pub point: GeoPoint,
    /// When the report was accepted.
    pub recorded_at: Timestamp,
    /// The transporter that reported the position.
    pub transporter: ActorId,
}

/// A parcel moving through the hub network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Shipment {
    /// Unique shipment identifier.
    pub id: ShipmentId,
    /// The barcode value printed on the waybill. Dense, monotone,
    /// never zero, never reused across live shipments.
    pub unique_code: u64,
    /// Origin hub. Immutable after creation.
    pub from_hub: HubId,
    /// Destination hub. Immutable after creation.
    pub to_hub: HubId,
    /// The actor who created the shipment.
    pub shipper: ActorId,
    /// The actor expected to take delivery.
    pub receiver: ActorId,
    /// The assigned transporter, absent until a pickup is approved.
    pub transporter: Option<ActorId>,
    /// Package name.
    pub name: String,
    /// Package description.
    pub description: String,
    /// Package weight in kilograms.
    pub weight_kg: f64,
    /// Measurement unit or dimension code supplied by the shipper.
    pub measurement: String,
    /// Total shipper-facing price, fixed at creation.
    pub amount: f64,
    /// The transporter's cut of `amount`, fixed at creation.
    pub transporter_amount: f64,
    /// Current lifecycle status.
    pub status: ShipmentStatus,
    /// Append-only hub visit history; insertion order is authoritative.
    pub visits: Vec<HubVisit>,
    /// Latest known live position, if any has been reported.
    pub live: Option<LivePosition>,
    /// When the shipment was created.
    pub created_at: Timestamp,
    /// When the shipment was last mutated.
    pub updated_at: Timestamp,
}

impl Shipment {
    /// Move the shipment to `to`, validating the edge against the
    /// lifecycle graph and the transporter invariant.
    pub fn advance(&mut self, to: ShipmentStatus, now: Timestamp) -> Result<(), TransitionError> {
        if !self.status.valid_transitions().contains(&to) {
            return Err(TransitionError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        if to.holds_transporter() && self.transporter.is_none() {
            return Err(TransitionError::TransporterRequired { to });
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Append a hub visit to the location history.
    pub fn record_visit(&mut self, visit: HubVisit) {
        self.updated_at = visit.at;
        self.visits.push(visit);
    }

    /// Overwrite the live position with a new accepted report.
    pub fn record_position(&mut self, position: LivePosition) {
        self.updated_at = position.recorded_at;
        self.live = Some(position);
    }

    /// Whether `actor` is a party to this shipment (shipper, receiver,
    /// or currently assigned transporter).
    pub fn is_party(&self, actor: &ActorId) -> bool {
        &self.shipper == actor
            || &self.receiver == actor
            || self.transporter.as_ref() == Some(actor)
    }
}
