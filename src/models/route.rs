//! Canonical route model shared by every provider adapter

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Means of transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Flight,
    Train,
    Bus,
}

impl TransportMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TransportMode::Flight => "flight",
            TransportMode::Train => "train",
            TransportMode::Bus => "bus",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flight" | "air" | "plane" => Ok(TransportMode::Flight),
            "train" | "rail" => Ok(TransportMode::Train),
            "bus" | "coach" => Ok(TransportMode::Bus),
            other => Err(format!("unknown transport mode '{other}'")),
        }
    }
}

/// Identifies the adapter that produced a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Mock,
    FlightApi,
    GroundTransport,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Mock => "mock",
            ProviderKind::FlightApi => "flight_api",
            ProviderKind::GroundTransport => "ground_transport",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checked baggage allowance
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Baggage {
    /// Number of checked bags included in the fare
    #[serde(default)]
    pub checked_bags: u32,
    /// Weight limit per checked bag in kg (0 when unknown)
    #[serde(default, alias = "weight_kg")]
    pub per_bag_kg: f64,
}

impl Baggage {
    /// A negative or non-finite weight is stored as 0, i.e. unknown
    #[must_use]
    pub fn new(checked_bags: u32, per_bag_kg: f64) -> Self {
        let per_bag_kg = if per_bag_kg.is_finite() {
            per_bag_kg.max(0.0)
        } else {
            0.0
        };
        Self {
            checked_bags,
            per_bag_kg,
        }
    }

    /// Whether the provider supplied a per-bag weight limit
    #[must_use]
    pub fn has_weight_limit(&self) -> bool {
        self.per_bag_kg > 0.0
    }
}

/// A candidate travel option, normalized from a provider's native schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub origin: String,
    pub destination: String,
    pub mode: TransportMode,
    /// Operator name
    pub carrier: String,
    /// Total fare in EUR
    pub price: f64,
    /// Door-to-door travel time in hours, layovers included
    pub duration_hours: f64,
    /// Number of intermediate stops
    pub connections: u32,
    pub baggage: Baggage,
    pub departure_time: Option<NaiveDateTime>,
    pub arrival_time: Option<NaiveDateTime>,
    /// Intermediate cities, when the provider reports them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub via: Vec<String>,
    /// Adapter that produced this record (audit only, never scored)
    pub provider_source: ProviderKind,
}

impl Route {
    /// Whether this route travels between the given locations
    #[must_use]
    pub fn serves(&self, origin: &str, destination: &str) -> bool {
        same_location(&self.origin, origin) && same_location(&self.destination, destination)
    }

    /// Short label used in logs, e.g. "flight Mock Airlines Stuttgart->Vienna"
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{} {} {}->{}",
            self.mode, self.carrier, self.origin, self.destination
        )
    }
}

/// Case-insensitive location comparison, ignoring surrounding whitespace
#[must_use]
pub fn same_location(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Carrier names compare like locations
#[must_use]
pub fn same_carrier(a: &str, b: &str) -> bool {
    same_location(a, b)
}
