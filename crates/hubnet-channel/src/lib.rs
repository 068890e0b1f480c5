//! # hubnet-channel: Live-Location Publish/Subscribe
//!
//! One addressable topic per shipment id. Assigned transporters publish
//! position reports; any party tracking the shipment subscribes and
//! receives every subsequent report, plus the latest known position
//! immediately on subscribe if one exists.
//!
//! The registry is deliberately dumb: it does not know whether a
//! shipment exists or who is allowed to publish; callers authorize
//! against the shipment ledger before touching the channel. Delivery is
//! at-most-once and best-effort: slow subscribers can lag and miss
//! intermediate positions (the broadcast ring overwrites), and nothing
//! is persisted beyond the latest position per topic.
//!
//! Dropping a [`Subscription`] releases its broadcast slot; the topic
//! itself (one sender plus the latest position) lives for the process
//! lifetime so late subscribers still get a snapshot after delivery.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use hubnet_core::{ActorId, GeoPoint, ShipmentId, Timestamp};

/// Default broadcast ring capacity per topic.
pub const DEFAULT_TOPIC_CAPACITY: usize = 256;

/// One accepted position report, as fanned out to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    /// The shipment the position belongs to.
    pub shipment: ShipmentId,
    /// Reported coordinates.
    #[serde(flatten)]
    pub point: GeoPoint,
    /// When the report was accepted.
    pub recorded_at: Timestamp,
    /// The transporter that reported the position.
    pub transporter: ActorId,
}

/// A live subscription to one shipment's topic.
///
/// `latest` is the last position published before this subscription was
/// opened, if any; `receiver` yields everything published after.
pub struct Subscription {
    /// Snapshot of the latest known position at subscribe time.
    pub latest: Option<PositionUpdate>,
    /// Live feed of subsequent positions.
    pub receiver: broadcast::Receiver<PositionUpdate>,
}

struct Topic {
    sender: broadcast::Sender<PositionUpdate>,
    latest: Option<PositionUpdate>,
}

impl Topic {
    fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            latest: None,
        }
    }
}

/// Registry of per-shipment location topics.
pub struct LocationChannels {
    topics: DashMap<ShipmentId, Topic>,
    capacity: usize,
}

impl LocationChannels {
    /// Create a registry whose topics buffer `capacity` updates.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to a shipment's topic, creating the topic if this is
    /// the first contact. The returned snapshot carries the latest
    /// known position, so a subscriber joining mid-journey starts from
    /// the current position instead of silence.
    pub fn subscribe(&self, shipment: &ShipmentId) -> Subscription {
        let topic = self
            .topics
            .entry(shipment.clone())
            .or_insert_with(|| Topic::new(self.capacity));
        debug!(shipment = %shipment, "location subscription opened");
        Subscription {
            latest: topic.latest.clone(),
            receiver: topic.sender.subscribe(),
        }
    }

    /// Publish an accepted position report: record it as the topic's
    /// latest position and fan it out to current subscribers. Returns
    /// the number of subscribers the update was handed to.
    pub fn publish(&self, update: PositionUpdate) -> usize {
        let shipment = update.shipment.clone();
        let mut topic = self
            .topics
            .entry(shipment.clone())
            .or_insert_with(|| Topic::new(self.capacity));
        topic.latest = Some(update.clone());
        let delivered = if topic.sender.receiver_count() > 0 {
            topic.sender.send(update).unwrap_or(0)
        } else {
            0
        };
        drop(topic);
        debug!(shipment = %shipment, delivered, "position published");
        delivered
    }

    /// The latest known position for a shipment, if any was published.
    pub fn latest(&self, shipment: &ShipmentId) -> Option<PositionUpdate> {
        self.topics
            .get(shipment)
            .and_then(|topic| topic.latest.clone())
    }

    /// Number of live subscribers on a shipment's topic.
    pub fn subscriber_count(&self, shipment: &ShipmentId) -> usize {
        self.topics
            .get(shipment)
            .map(|topic| topic.sender.receiver_count())
            .unwrap_or(0)
    }

    /// Number of topics with at least one publish or subscribe so far.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl Default for LocationChannels {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_CAPACITY)
    }
}

impl std::fmt::Debug for LocationChannels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationChannels")
            .field("topics", &self.topics.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
