//! Routes served by the rural bus network and the read-only catalog the
//! booking wizard selects from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bundled sample catalog, used when no routes file is configured.
const SAMPLE_ROUTES: &str = include_str!("../../data/routes.json");

#[derive(Error, Debug, PartialEq)]
pub enum RouteError {
    #[error("fare `{0}` contains no amount")]
    MissingAmount(String),
    #[error("fare must be greater than zero")]
    ZeroFare,
    #[error("amount `{0}` is too large")]
    Overflow(String),
    #[error("distance `{0}` is not a number of kilometres")]
    InvalidDistance(String),
    #[error("duplicate route id {0}")]
    DuplicateRoute(u32),
    #[error("invalid route catalog: {0}")]
    Catalog(String),
}

/// A positive amount in whole rupees.
///
/// Display strings such as `₹500` or `₹1,200` are accepted by keeping only the
/// digits, so `Fare` round-trips through the catalog JSON as `"₹500"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fare(u64);

impl Fare {
    /// # Errors
    ///
    /// Returns [`RouteError::ZeroFare`] for a zero amount.
    pub fn new(amount: u64) -> Result<Self, RouteError> {
        if amount == 0 {
            Err(RouteError::ZeroFare)
        } else {
            Ok(Self(amount))
        }
    }

    #[must_use]
    pub fn amount(self) -> u64 {
        self.0
    }

    /// Total for `passengers` travellers on this fare.
    #[must_use]
    pub fn times(self, passengers: u8) -> u64 {
        self.0.saturating_mul(u64::from(passengers))
    }
}

impl FromStr for Fare {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(RouteError::MissingAmount(s.to_string()));
        }
        let amount = digits
            .parse::<u64>()
            .map_err(|_| RouteError::Overflow(s.to_string()))?;
        Self::new(amount)
    }
}

impl TryFrom<String> for Fare {
    type Error = RouteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fare> for String {
    fn from(fare: Fare) -> Self {
        fare.to_string()
    }
}

impl fmt::Display for Fare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}", self.0)
    }
}

/// Route length in whole kilometres, written as `45 km` in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Distance(u32);

impl Distance {
    #[must_use]
    pub fn from_km(km: u32) -> Self {
        Self(km)
    }

    #[must_use]
    pub fn km(self) -> u32 {
        self.0
    }
}

impl FromStr for Distance {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let number = s.trim().trim_end_matches("km").trim();
        number
            .parse::<u32>()
            .map(Self)
            .map_err(|_| RouteError::InvalidDistance(s.to_string()))
    }
}

impl TryFrom<String> for Distance {
    type Error = RouteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Distance> for String {
    fn from(distance: Distance) -> Self {
        distance.to_string()
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} km", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub departure: String,
    pub arrival: String,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: u32,
    pub name: String,
    pub from: String,
    pub to: String,
    pub fare: Fare,
    pub distance: Distance,
    pub schedule: Vec<TimeSlot>,
    #[serde(default)]
    pub stops: Vec<Stop>,
}

impl Route {
    /// A route can only be booked when it has at least one departure.
    #[must_use]
    pub fn is_bookable(&self) -> bool {
        !self.schedule.is_empty()
    }

    #[must_use]
    pub fn departs_at(&self, departure: &str) -> bool {
        self.schedule.iter().any(|slot| slot.departure == departure)
    }

    pub fn departures(&self) -> impl Iterator<Item = &str> {
        self.schedule.iter().map(|slot| slot.departure.as_str())
    }
}

/// The fixed set of routes on offer.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct RouteCatalog {
    routes: Vec<Route>,
}

impl RouteCatalog {
    /// # Errors
    ///
    /// Returns [`RouteError::DuplicateRoute`] when two routes share an id.
    pub fn new(routes: Vec<Route>) -> Result<Self, RouteError> {
        for (i, route) in routes.iter().enumerate() {
            if routes[..i].iter().any(|other| other.id == route.id) {
                return Err(RouteError::DuplicateRoute(route.id));
            }
        }
        Ok(Self { routes })
    }

    /// Parses a JSON array of routes.
    ///
    /// # Errors
    ///
    /// Returns an error when the JSON is malformed or ids repeat.
    pub fn from_json(json: &str) -> Result<Self, RouteError> {
        let routes: Vec<Route> =
            serde_json::from_str(json).map_err(|e| RouteError::Catalog(e.to_string()))?;
        Self::new(routes)
    }

    /// The catalog bundled with the crate.
    ///
    /// # Errors
    ///
    /// Only fails if the bundled JSON is broken.
    pub fn sample() -> Result<Self, RouteError> {
        Self::from_json(SAMPLE_ROUTES)
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Route> {
        self.routes.iter().find(|route| route.id == id)
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
