//! Search request model and its validation

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::route::{TransportMode, same_carrier, same_location};
use crate::{Result, TravelOptimizerError};

/// Default number of ranked results handed back to callers
pub const DEFAULT_TOP_N: usize = 5;

/// Relative importance of travel time, cost and convenience (fewer connections)
///
/// Weights need not sum to one; scoring re-normalizes them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub time: f64,
    pub cost: f64,
    pub convenience: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            time: 1.0,
            cost: 1.0,
            convenience: 1.0,
        }
    }
}

impl Weights {
    #[must_use]
    pub fn new(time: f64, cost: f64, convenience: f64) -> Self {
        Self {
            time,
            cost,
            convenience,
        }
    }

    /// Check that every weight is finite and non-negative and at least one is positive
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("time", self.time),
            ("cost", self.cost),
            ("convenience", self.convenience),
        ] {
            if !value.is_finite() {
                return Err(TravelOptimizerError::configuration(format!(
                    "weight_{name} must be a finite number"
                )));
            }
            if value < 0.0 {
                return Err(TravelOptimizerError::configuration(format!(
                    "weight_{name} cannot be negative (got {value})"
                )));
            }
        }

        if self.time + self.cost + self.convenience <= 0.0 {
            return Err(TravelOptimizerError::configuration(
                "At least one of weight_time, weight_cost, weight_convenience must be positive",
            ));
        }

        Ok(())
    }

    /// Weights rescaled to sum to one
    pub fn normalized(&self) -> Result<Weights> {
        self.validate()?;
        let total = self.time + self.cost + self.convenience;
        Ok(Weights {
            time: self.time / total,
            cost: self.cost / total,
            convenience: self.convenience / total,
        })
    }
}

/// Inclusive time-of-day window. A window whose start is after its end wraps midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    #[must_use]
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Window from an optional lower and upper bound; `None` when both are open
    #[must_use]
    pub fn from_bounds(after: Option<NaiveTime>, before: Option<NaiveTime>) -> Option<Self> {
        if after.is_none() && before.is_none() {
            return None;
        }
        Some(Self {
            start: after.unwrap_or(NaiveTime::MIN),
            end: before.unwrap_or_else(|| {
                NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
            }),
        })
    }

    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time <= self.end
        } else {
            time >= self.start || time <= self.end
        }
    }
}

/// Caller-facing search options with sensible defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOptions {
    pub max_connections: Option<u32>,
    pub required_bags: u32,
    pub min_bag_weight_kg: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub max_duration_hours: Option<f64>,
    pub departure_window: Option<TimeWindow>,
    pub arrival_window: Option<TimeWindow>,
    pub modes: Vec<TransportMode>,
    pub preferred_carriers: Vec<String>,
    pub excluded_carriers: Vec<String>,
    pub weight_time: f64,
    pub weight_cost: f64,
    pub weight_convenience: f64,
    pub top_n: Option<usize>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        let weights = Weights::default();
        Self {
            max_connections: None,
            required_bags: 0,
            min_bag_weight_kg: None,
            min_price: None,
            max_price: None,
            max_duration_hours: None,
            departure_window: None,
            arrival_window: None,
            modes: Vec::new(),
            preferred_carriers: Vec::new(),
            excluded_carriers: Vec::new(),
            weight_time: weights.time,
            weight_cost: weights.cost,
            weight_convenience: weights.convenience,
            top_n: Some(DEFAULT_TOP_N),
        }
    }
}

/// A validated search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    /// Upper bound on connections; `None` is unbounded
    pub max_connections: Option<u32>,
    pub required_bags: u32,
    pub min_bag_weight_kg: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub max_duration_hours: Option<f64>,
    pub departure_window: Option<TimeWindow>,
    pub arrival_window: Option<TimeWindow>,
    /// Allowed modes; empty allows every mode
    pub modes: Vec<TransportMode>,
    /// Carriers a route must use; empty allows every carrier
    pub preferred_carriers: Vec<String>,
    pub excluded_carriers: Vec<String>,
    pub weights: Weights,
    /// Result limit; `None` returns the full ranking
    pub top_n: Option<usize>,
}

impl Query {
    /// Minimal query with default options
    pub fn new(origin: &str, destination: &str, date: &str) -> Result<Self> {
        Self::from_options(origin, destination, date, &PlanOptions::default())
    }

    /// Build and validate a query from caller options
    pub fn from_options(
        origin: &str,
        destination: &str,
        date: &str,
        options: &PlanOptions,
    ) -> Result<Self> {
        let query = Self {
            origin: origin.trim().to_string(),
            destination: destination.trim().to_string(),
            date: parse_date(date)?,
            max_connections: options.max_connections,
            required_bags: options.required_bags,
            min_bag_weight_kg: options.min_bag_weight_kg,
            min_price: options.min_price,
            max_price: options.max_price,
            max_duration_hours: options.max_duration_hours,
            departure_window: options.departure_window,
            arrival_window: options.arrival_window,
            modes: options.modes.clone(),
            preferred_carriers: options.preferred_carriers.clone(),
            excluded_carriers: options.excluded_carriers.clone(),
            weights: Weights::new(
                options.weight_time,
                options.weight_cost,
                options.weight_convenience,
            ),
            top_n: options.top_n,
        };
        query.validate()?;
        Ok(query)
    }

    /// Same query with different weights
    #[must_use]
    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    /// Reject requests that cannot be planned
    pub fn validate(&self) -> Result<()> {
        if self.origin.trim().is_empty() {
            return Err(TravelOptimizerError::configuration("Origin cannot be empty"));
        }
        if self.destination.trim().is_empty() {
            return Err(TravelOptimizerError::configuration(
                "Destination cannot be empty",
            ));
        }
        if same_location(&self.origin, &self.destination) {
            return Err(TravelOptimizerError::configuration(format!(
                "Origin and destination are both '{}'",
                self.origin
            )));
        }

        self.weights.validate()?;

        validate_positive("max_price", self.max_price)?;
        validate_positive("max_duration_hours", self.max_duration_hours)?;
        validate_positive("min_bag_weight_kg", self.min_bag_weight_kg)?;

        if let Some(min) = self.min_price {
            if !min.is_finite() || min < 0.0 {
                return Err(TravelOptimizerError::configuration(format!(
                    "min_price must be a non-negative number (got {min})"
                )));
            }
            if self.max_price.is_some_and(|max| min >= max) {
                return Err(TravelOptimizerError::configuration(
                    "min_price must be below max_price",
                ));
            }
        }

        if let Some(carrier) = self
            .preferred_carriers
            .iter()
            .find(|p| self.excluded_carriers.iter().any(|e| same_carrier(p, e)))
        {
            return Err(TravelOptimizerError::configuration(format!(
                "Carrier '{carrier}' cannot be both preferred and excluded"
            )));
        }

        if self.top_n == Some(0) {
            return Err(TravelOptimizerError::configuration(
                "top_n must be at least 1",
            ));
        }

        Ok(())
    }

    /// Whether the mode allow-list admits this mode
    #[must_use]
    pub fn allows_mode(&self, mode: TransportMode) -> bool {
        self.modes.is_empty() || self.modes.contains(&mode)
    }

    /// Whether the carrier is on the preferred list, or no list is set
    #[must_use]
    pub fn prefers_carrier(&self, carrier: &str) -> bool {
        self.preferred_carriers.is_empty()
            || self
                .preferred_carriers
                .iter()
                .any(|preferred| same_carrier(preferred, carrier))
    }

    #[must_use]
    pub fn excludes_carrier(&self, carrier: &str) -> bool {
        self.excluded_carriers
            .iter()
            .any(|excluded| same_carrier(excluded, carrier))
    }
}

fn validate_positive(name: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(TravelOptimizerError::configuration(
            format!("{name} must be a positive number (got {v})"),
        )),
        _ => Ok(()),
    }
}

/// Parse a `YYYY-MM-DD` travel date
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|e| {
        TravelOptimizerError::configuration(format!(
            "Invalid date '{date}', expected YYYY-MM-DD: {e}"
        ))
    })
}
