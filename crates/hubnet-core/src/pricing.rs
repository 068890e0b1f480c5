//! # Freight Pricing
//!
//! Shipment pricing is fixed at creation time from two inputs: package
//! weight and the great-circle distance between the origin and
//! destination hubs. The scheme also fixes the transporter's share of
//! the total, which later feeds the transporter's cumulative earnings
//! counters.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Rate table for pricing a shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingScheme {
    /// Charge per kilogram of package weight.
    pub rate_per_kg: f64,
    /// Charge per kilometre of hub-to-hub distance.
    pub rate_per_km: f64,
    /// Fraction of the total amount credited to the transporter, in [0, 1].
    pub transporter_share: f64,
}

impl Default for PricingScheme {
    fn default() -> Self {
        Self {
            rate_per_kg: 5.0,
            rate_per_km: 1.0,
            transporter_share: 0.6,
        }
    }
}

/// The priced result for one shipment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Total shipper-facing price.
    pub amount: f64,
    /// The transporter's cut of [`Quote::amount`].
    pub transporter_amount: f64,
}

impl PricingScheme {
    /// Price a shipment of `weight_kg` moving `distance_km`.
    ///
    /// Weight must be positive and finite; distance comes from
    /// [`crate::geo::GeoPoint::distance_km`] and is always non-negative.
    pub fn quote(&self, weight_kg: f64, distance_km: f64) -> Result<Quote, ValidationError> {
        if !(weight_kg > 0.0) || !weight_kg.is_finite() {
            return Err(ValidationError::NonPositiveWeight(weight_kg));
        }
        let amount = weight_kg * self.rate_per_kg + distance_km * self.rate_per_km;
        Ok(Quote {
            amount,
            transporter_amount: amount * self.transporter_share,
        })
    }
}
