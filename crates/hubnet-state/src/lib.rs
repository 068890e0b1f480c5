//! # hubnet-state: Domain Entities and State Machines
//!
//! The stateful heart of the parcel workflow, free of I/O and async:
//!
//! - **Shipment** (`shipment.rs`): the seven-status lifecycle graph
//!   (`Pending → Assigned → On the way → Reached → Pending Receipt
//!   Approval → Received`, with the `Canceled` branch off `Pending`),
//!   hub-visit history, and the live-position field.
//!
//! - **Request** (`request.rs`): the closed set of approvable action
//!   kinds with the static transition-rule table; each row fixes which
//!   hub authorizes, who may submit, the required status, whether a
//!   barcode must be presented, the resulting status, the visit
//!   appended, and the counters credited.
//!
//! - **Actor** (`actor.rs`): relational shipper/transporter/receiver
//!   capability, fixed `hubManager`/`admin` roles, and the six monotone
//!   cumulative counters.
//!
//! - **Hub** (`hub.rs`): fixed transfer points with unique short codes.
//!
//! ## Design
//!
//! Status enums carry their wire names (`"On the way"`,
//! `"Pending Receipt Approval"`, `"receive-scan"`) via serde renames;
//! there are no string-typed statuses anywhere else. The transition
//! graph lives in exactly one place ([`ShipmentStatus::valid_transitions`])
//! and the per-kind behavior in exactly one other
//! ([`RequestKind::rule`]); the approval gate reads both instead of
//! encoding its own conditionals.

pub mod actor;
pub mod hub;
pub mod request;
pub mod shipment;

// ─── Shipment re-exports ────────────────────────────────────────────

pub use shipment::{HubVisit, LivePosition, Shipment, ShipmentStatus, TransitionError};

// ─── Request re-exports ─────────────────────────────────────────────

pub use request::{
    CounterCredit, DecisionError, HubSide, RequestKind, RequestStatus, ShipmentRequest,
    SubmitterRule, TransitionRule,
};

// ─── Actor re-exports ───────────────────────────────────────────────

pub use actor::{Actor, ActorCounters, ActorError, ActorRole};

// ─── Hub re-exports ─────────────────────────────────────────────────

pub use hub::Hub;
