//! # Approval Requests and the Transition-Rule Table
//!
//! Every shipment status change is proposed as a [`ShipmentRequest`] of
//! one closed [`RequestKind`] and applied only when a hub manager
//! approves it. The per-kind behavior (which hub authorizes, who may
//! submit, what status results, which counters are credited) is a
//! static table ([`RequestKind::rule`]) rather than scattered
//! conditionals, so adding or auditing a kind means reading one row.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use hubnet_core::{ActorId, RequestId, ShipmentId, Timestamp};

use crate::shipment::ShipmentStatus;

/// The closed set of approvable action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RequestKind {
    /// Print the waybill at the origin hub; gates entry into circulation.
    #[serde(rename = "print")]
    Print,
    /// A courier volunteers to move the parcel.
    #[serde(rename = "pickup")]
    Pickup,
    /// Barcode scan out of the origin hub.
    #[serde(rename = "scan")]
    Scan,
    /// Arrival hand-off at the destination hub.
    #[serde(rename = "delivery")]
    Delivery,
    /// The receiver claims the parcel.
    #[serde(rename = "receive")]
    Receive,
    /// Barcode scan confirming physical receipt.
    #[serde(rename = "receive-scan")]
    ReceiveScan,
}

/// Which of the shipment's two route hubs a rule refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HubSide {
    /// The shipment's `from_hub`.
    Origin,
    /// The shipment's `to_hub`.
    Destination,
}

/// Which party's cumulative counters an approval credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CounterCredit {
    /// Credit the shipper's shipped counters with the full amount.
    Shipper,
    /// Credit the transporter's transported counters with the
    /// transporter's cut.
    Transporter,
    /// Credit the receiver's received counters with the full amount.
    Receiver,
}

/// Who is allowed to submit a request of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitterRule {
    /// Only the shipment's shipper.
    Shipper,
    /// Any actor; pickup is open to every courier in the network.
    AnyActor,
    /// Only the currently assigned transporter.
    AssignedTransporter,
    /// Only the shipment's receiver.
    Receiver,
}

/// One row of the transition-rule table: everything the approval gate
/// needs to know about a request kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionRule {
    /// Which route hub's manager may decide this request.
    pub authorizing: HubSide,
    /// Who may submit it.
    pub submitter: SubmitterRule,
    /// The shipment status required at submission time.
    pub required_status: ShipmentStatus,
    /// Whether submission must present the shipment's barcode value.
    pub needs_barcode: bool,
    /// Status applied on approval; `None` leaves the status unchanged.
    pub approved_status: Option<ShipmentStatus>,
    /// Status applied on rejection; `None` leaves the status unchanged.
    pub rejected_status: Option<ShipmentStatus>,
    /// Hub side appended to the visit history on approval, if any.
    pub visit: Option<HubSide>,
    /// Counters credited on approval, if any.
    pub credit: Option<CounterCredit>,
}

impl RequestKind {
    /// The canonical string name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Pickup => "pickup",
            Self::Scan => "scan",
            Self::Delivery => "delivery",
            Self::Receive => "receive",
            Self::ReceiveScan => "receive-scan",
        }
    }

    /// Convert a canonical kind name to a `RequestKind`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "print" => Some(Self::Print),
            "pickup" => Some(Self::Pickup),
            "scan" => Some(Self::Scan),
            "delivery" => Some(Self::Delivery),
            "receive" => Some(Self::Receive),
            "receive-scan" => Some(Self::ReceiveScan),
            _ => None,
        }
    }

    /// Look up this kind's row in the transition-rule table.
    pub fn rule(&self) -> TransitionRule {
        match self {
            Self::Print => TransitionRule {
                authorizing: HubSide::Origin,
                submitter: SubmitterRule::Shipper,
                required_status: ShipmentStatus::Pending,
                needs_barcode: false,
                approved_status: None,
                rejected_status: Some(ShipmentStatus::Canceled),
                visit: None,
                credit: Some(CounterCredit::Shipper),
            },
            Self::Pickup => TransitionRule {
                authorizing: HubSide::Origin,
                submitter: SubmitterRule::AnyActor,
                required_status: ShipmentStatus::Pending,
                needs_barcode: false,
                approved_status: Some(ShipmentStatus::Assigned),
                rejected_status: None,
                visit: None,
                credit: None,
            },
            Self::Scan => TransitionRule {
                authorizing: HubSide::Origin,
                submitter: SubmitterRule::AssignedTransporter,
                required_status: ShipmentStatus::Assigned,
                needs_barcode: true,
                approved_status: Some(ShipmentStatus::OnTheWay),
                rejected_status: None,
                visit: Some(HubSide::Origin),
                credit: Some(CounterCredit::Transporter),
            },
            Self::Delivery => TransitionRule {
                authorizing: HubSide::Destination,
                submitter: SubmitterRule::AssignedTransporter,
                required_status: ShipmentStatus::OnTheWay,
                needs_barcode: false,
                approved_status: Some(ShipmentStatus::Reached),
                rejected_status: None,
                visit: Some(HubSide::Destination),
                credit: Some(CounterCredit::Transporter),
            },
            Self::Receive => TransitionRule {
                authorizing: HubSide::Destination,
                submitter: SubmitterRule::Receiver,
                required_status: ShipmentStatus::Reached,
                needs_barcode: false,
                approved_status: Some(ShipmentStatus::PendingReceiptApproval),
                rejected_status: None,
                visit: None,
                credit: None,
            },
            Self::ReceiveScan => TransitionRule {
                authorizing: HubSide::Destination,
                submitter: SubmitterRule::Receiver,
                required_status: ShipmentStatus::PendingReceiptApproval,
                needs_barcode: true,
                approved_status: Some(ShipmentStatus::Received),
                rejected_status: None,
                visit: None,
                credit: Some(CounterCredit::Receiver),
            },
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Approval status of a request. Initial state is always
/// `Pending Approval`; the approval gate moves it exactly once to one
/// of the two decided states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RequestStatus {
    /// Awaiting a hub manager's decision.
    #[serde(rename = "Pending Approval")]
    PendingApproval,
    /// Approved; side effects have been applied.
    #[serde(rename = "Approved")]
    Approved,
    /// Rejected; shipment left unchanged except for a rejected print,
    /// which cancels the shipment.
    #[serde(rename = "Rejected")]
    Rejected,
}

impl RequestStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "Pending Approval",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    /// Whether a decision has already been recorded.
    pub fn is_decided(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error during request state operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecisionError {
    /// The request already carries a terminal decision.
    #[error("request already decided: {0}")]
    AlreadyDecided(RequestStatus),
}

/// An approval-pending action raised against a shipment.
///
/// Requests are never deleted; decided requests remain in the queue as
/// the audit trail of who moved a shipment, when, and on whose
/// authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShipmentRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// The shipment this request targets.
    pub shipment: ShipmentId,
    /// The actor who submitted the request.
    pub actor: ActorId,
    /// The action kind.
    pub kind: RequestKind,
    /// Barcode value presented at submission, for kinds that demand one.
    pub barcode: Option<u64>,
    /// Approval status.
    pub status: RequestStatus,
    /// Redundant convenience flag, true exactly when `status` is
    /// `Approved`; consulted by downstream listing queries.
    pub is_accepted: bool,
    /// The manager who decided the request, once decided.
    pub decided_by: Option<ActorId>,
    /// When the request was submitted.
    pub created_at: Timestamp,
    /// When the request was decided, once decided.
    pub decided_at: Option<Timestamp>,
}

impl ShipmentRequest {
    /// Create a new pending request.
    pub fn new(
        shipment: ShipmentId,
        actor: ActorId,
        kind: RequestKind,
        barcode: Option<u64>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            shipment,
            actor,
            kind,
            barcode,
            status: RequestStatus::PendingApproval,
            is_accepted: false,
            decided_by: None,
            created_at: Timestamp::now(),
            decided_at: None,
        }
    }

    /// Record an approval. Fails if the request is already decided.
    pub fn mark_approved(&mut self, by: ActorId, at: Timestamp) -> Result<(), DecisionError> {
        if self.status.is_decided() {
            return Err(DecisionError::AlreadyDecided(self.status));
        }
        self.status = RequestStatus::Approved;
        self.is_accepted = true;
        self.decided_by = Some(by);
        self.decided_at = Some(at);
        Ok(())
    }

    /// Record a rejection. Fails if the request is already decided.
    pub fn mark_rejected(&mut self, by: ActorId, at: Timestamp) -> Result<(), DecisionError> {
        if self.status.is_decided() {
            return Err(DecisionError::AlreadyDecided(self.status));
        }
        self.status = RequestStatus::Rejected;
        self.is_accepted = false;
        self.decided_by = Some(by);
        self.decided_at = Some(at);
        Ok(())
    }
}
