//! # Actors and Cumulative Counters
//!
//! A single account can be the shipper on one shipment and the receiver
//! on another; shipper/transporter/receiver are relationships to a
//! shipment, not account types. The only fixed roles are `hubManager`
//! (tied to exactly one hub) and `admin`. Each actor carries six
//! monotone counters that only the approval gate increments.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use hubnet_core::{ActorId, HubId, Timestamp};

use crate::request::CounterCredit;

/// Fixed account role.
///
/// The `Ord` derivation respects variant declaration order:
/// `User < HubManager < Admin`. This enables `>=` comparison for
/// role-based access checks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum ActorRole {
    /// Ordinary participant; acts as shipper, transporter, or receiver
    /// depending on which shipment fields reference the account.
    #[serde(rename = "user")]
    User,
    /// Gates approvals for shipments touching the affiliated hub.
    #[serde(rename = "hubManager")]
    HubManager,
    /// Seeds hubs and actor records.
    #[serde(rename = "admin")]
    Admin,
}

impl ActorRole {
    /// The canonical string name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::HubManager => "hubManager",
            Self::Admin => "admin",
        }
    }

    /// Convert a canonical role name to an `ActorRole`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "user" => Some(Self::User),
            "hubManager" => Some(Self::HubManager),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error during actor construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActorError {
    /// Hub managers must name the hub they manage.
    #[error("hub managers must carry a hub affiliation")]
    MissingHubAffiliation,
    /// Only hub managers are affiliated with a hub.
    #[error("role {0} does not carry a hub affiliation")]
    UnexpectedHubAffiliation(ActorRole),
}

/// The six cumulative counters on every actor. Monotonically
/// non-decreasing; written exclusively by the approval gate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct ActorCounters {
    /// Shipments this actor created that entered circulation.
    pub products_shipped: u64,
    /// Total priced amount across those shipments.
    pub amount_shipped: f64,
    /// Approved transport legs (origin scan, destination delivery).
    pub products_transported: u64,
    /// Total transporter cut across those legs.
    pub amount_transported: f64,
    /// Shipments this actor took final receipt of.
    pub products_received: u64,
    /// Total priced amount across those receipts.
    pub amount_received: f64,
}

impl ActorCounters {
    /// Apply one approval's credit: bump the product counter by one and
    /// the amount counter by `amount` for the lane `credit` selects.
    pub fn apply(&mut self, credit: CounterCredit, amount: f64) {
        match credit {
            CounterCredit::Shipper => {
                self.products_shipped += 1;
                self.amount_shipped += amount;
            }
            CounterCredit::Transporter => {
                self.products_transported += 1;
                self.amount_transported += amount;
            }
            CounterCredit::Receiver => {
                self.products_received += 1;
                self.amount_received += amount;
            }
        }
    }
}

/// An account in the parcel network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Actor {
    /// Unique actor identifier.
    pub id: ActorId,
    /// Display name.
    pub name: String,
    /// Fixed role.
    pub role: ActorRole,
    /// The managed hub; present if and only if `role` is `HubManager`.
    pub hub: Option<HubId>,
    /// Cumulative workflow counters.
    pub counters: ActorCounters,
    /// When the record was seeded.
    pub created_at: Timestamp,
}

impl Actor {
    /// Create an actor, enforcing the hub-affiliation invariant.
    pub fn new(name: String, role: ActorRole, hub: Option<HubId>) -> Result<Self, ActorError> {
        match (role, &hub) {
            (ActorRole::HubManager, None) => return Err(ActorError::MissingHubAffiliation),
            (ActorRole::User | ActorRole::Admin, Some(_)) => {
                return Err(ActorError::UnexpectedHubAffiliation(role))
            }
            _ => {}
        }
        Ok(Self {
            id: ActorId::new(),
            name,
            role,
            hub,
            counters: ActorCounters::default(),
            created_at: Timestamp::now(),
        })
    }

    /// The hub this manager gates, if the actor is a hub manager.
    pub fn managed_hub(&self) -> Option<&HubId> {
        match self.role {
            ActorRole::HubManager => self.hub.as_ref(),
            ActorRole::User | ActorRole::Admin => None,
        }
    }
}
