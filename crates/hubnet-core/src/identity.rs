//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout Hubnet. Each
//! identifier is a distinct type: you cannot pass a [`ShipmentId`]
//! where a [`HubId`] is expected. All four are UUID-backed and always
//! valid by construction.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A unique identifier for a shipment moving through the hub network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct ShipmentId(Uuid);

impl ShipmentId {
    /// Create a new random shipment identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a shipment identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ShipmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unique identifier for an approval request raised against a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new random request identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a request identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unique identifier for an actor: shipper, transporter, receiver,
/// hub manager, or administrator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct ActorId(Uuid);

impl ActorId {
    /// Create a new random actor identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an actor identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unique identifier for a fixed transfer hub.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct HubId(Uuid);

impl HubId {
    /// Create a new random hub identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a hub identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HubId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HubId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
