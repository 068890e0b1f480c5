//! # Temporal Types
//!
//! UTC-only timestamp type for Hubnet. Parcels cross time zones; every
//! recorded instant (shipment creation, hub visits, approval
//! decisions, live-position reports) is stored in UTC and rendered
//! with second precision and a `Z` suffix. Local time is a presentation
//! concern for clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A UTC timestamp.
///
/// Serializes through chrono as RFC 3339; [`Timestamp::to_canonical_string`]
/// renders the second-precision `Z`-suffixed form used in logs and
/// hub-visit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Access the underlying `chrono::DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as ISO 8601 with `Z` suffix, truncated to seconds.
    pub fn to_canonical_string(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn canonical_string_truncates_to_seconds() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
            + chrono::Duration::milliseconds(589);
        let ts = Timestamp::from_datetime(dt);
        assert_eq!(ts.to_canonical_string(), "2026-03-14T09:26:53Z");
        assert_eq!(ts.to_string(), "2026-03-14T09:26:53Z");
    }

    #[test]
    fn ordering_follows_chronology() {
        let earlier = Timestamp::from_datetime(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let later = Timestamp::from_datetime(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 1).unwrap());
        assert!(earlier < later);
    }

    #[test]
    fn serde_round_trip_preserves_instant() {
        let ts = Timestamp::from_datetime(Utc.with_ymd_and_hms(2026, 6, 30, 23, 59, 59).unwrap());
        let json = serde_json::to_string(&ts).expect("serialize");
        let back: Timestamp = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, ts);
    }
}
