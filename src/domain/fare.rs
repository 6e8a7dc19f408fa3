use serde::Serialize;

use crate::domain::route::{Distance, Fare};

const BASE_SHARE: f64 = 0.7;
const SERVICE_TAX_RATE: f64 = 0.1;

/// Figures shown next to a fare on the admin fare board.
///
/// Each figure is derived from the fare on its own and rounded to whole
/// rupees; they are informational and do not add up to the fare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FareBreakdown {
    pub base_fare: u64,
    /// Absent for a zero-length route.
    pub per_km: Option<u64>,
    pub service_tax: u64,
}

impl FareBreakdown {
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(fare: Fare, distance: Distance) -> Self {
        let amount = fare.amount() as f64;
        let per_km = match distance.km() {
            0 => None,
            km => Some((amount / f64::from(km)).round() as u64),
        };
        Self {
            base_fare: (amount * BASE_SHARE).round() as u64,
            per_km,
            service_tax: (amount * SERVICE_TAX_RATE).round() as u64,
        }
    }
}
