//! # Core Validation Errors
//!
//! Structured validation failures for the core domain values. Every
//! variant names the offending value so callers can surface a precise
//! message without re-deriving context.

use thiserror::Error;

/// A core domain value failed validation at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Latitude must lie within [-90, 90] degrees.
    #[error("latitude {0} is outside the valid range [-90, 90]")]
    LatitudeOutOfRange(f64),

    /// Longitude must lie within [-180, 180] degrees.
    #[error("longitude {0} is outside the valid range [-180, 180]")]
    LongitudeOutOfRange(f64),

    /// Shipment weight must be a positive, finite number of kilograms.
    #[error("weight {0} is not a positive number of kilograms")]
    NonPositiveWeight(f64),
}
