#![deny(missing_docs)]

//! # hubnet-core: Domain Vocabulary for the Hubnet Parcel Network
//!
//! Leaf crate shared by every other Hubnet crate. Holds the domain
//! primitives that the shipment workflow is written in terms of:
//!
//! - [`identity`]: UUID newtypes for shipments, requests, actors, hubs.
//! - [`temporal`]: UTC-only [`Timestamp`] with canonical rendering.
//! - [`geo`]: validated [`GeoPoint`] coordinates and great-circle
//!   distance, used for freight pricing and live-position reports.
//! - [`pricing`]: the [`PricingScheme`] that turns weight and distance
//!   into a shipper-facing amount and the transporter's cut.
//! - [`error`]: structured validation failures for the above.
//!
//! This crate has no I/O and no async; it is deliberately boring.

pub mod error;
pub mod geo;
pub mod identity;
pub mod pricing;
pub mod temporal;

pub use error::ValidationError;
pub use geo::GeoPoint;
pub use identity::{ActorId, HubId, RequestId, ShipmentId};
pub use pricing::{PricingScheme, Quote};
pub use temporal::Timestamp;
