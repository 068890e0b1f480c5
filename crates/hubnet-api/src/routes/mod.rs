//! # API Route Modules
//!
//! Route modules for the hub network API surface:
//!
//! - `shipments`: Shipment creation and retrieval. Creation prices the
//!   parcel from weight and hub-to-hub distance and issues the waybill
//!   barcode; retrieval is scoped to parties, route-hub managers, and
//!   admins.
//! - `requests`: The approval workflow: submitting requests against a
//!   shipment, the per-hub pending queue, and manager decisions that
//!   drive every lifecycle transition.
//! - `location`: Live-location reporting by the assigned transporter,
//!   the latest-position snapshot, and the WebSocket tracking feed.
//! - `hubs`: Hub seeding, retrieval, and manager assignment.
//! - `actors`: Actor account seeding and retrieval.

pub mod actors;
pub mod hubs;
pub mod location;
pub mod requests;
pub mod shipments;
