//! # Hubs
//!
//! Fixed transfer points. Hubs are reference data seeded by an
//! administrator: name, a unique short code used on waybills and at
//! scan stations, and geocoordinates that feed distance pricing. The
//! assigned manager is the only field that changes after seeding.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use hubnet_core::{ActorId, GeoPoint, HubId, Timestamp};

/// A fixed transfer point in the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Hub {
    /// Unique hub identifier.
    pub id: HubId,
    /// Display name.
    pub name: String,
    /// Unique short code, uppercased at creation.
    pub code: String,
    /// Hub geocoordinates.
    pub position: GeoPoint,
    /// The manager who gates approvals at this hub, once assigned.
    pub manager: Option<ActorId>,
    /// When the hub was seeded.
    pub created_at: Timestamp,
}

impl Hub {
    /// Create a hub. The short code is trimmed and uppercased so that
    /// waybill lookups are case-insensitive.
    pub fn new(name: String, code: &str, position: GeoPoint) -> Self {
        Self {
            id: HubId::new(),
            name,
            code: code.trim().to_uppercase(),
            position,
            manager: None,
            created_at: Timestamp::now(),
        }
    }

    /// Assign or replace the hub's manager.
    pub fn assign_manager(&mut self, manager: ActorId) {
        self.manager = Some(manager);
    }
}
