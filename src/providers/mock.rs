//! Mock Provider
//!
//! Serves routes from a sample dataset: either a JSON file configured by the
//! user or the dataset bundled into the binary. Lookups are deterministic,
//! ignore the travel date and never fail.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{RouteProvider, parse_timestamp};
use crate::models::{Baggage, ProviderKind, Route, TransportMode, same_location};

const BUNDLED_DATASET: &str = include_str!("../../data/sample_routes.json");

/// One record of the sample dataset. Field names follow the dataset files,
/// so a few older spellings are accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
struct SampleRecord {
    origin: Option<String>,
    destination: Option<String>,
    mode: Option<String>,
    #[serde(alias = "airline", alias = "operator")]
    carrier: Option<String>,
    #[serde(alias = "price_eur")]
    price: Option<f64>,
    #[serde(alias = "total_hours", alias = "duration_hours")]
    duration: Option<f64>,
    connections: Option<u32>,
    baggage: Option<Baggage>,
    departure_time: Option<String>,
    arrival_time: Option<String>,
    #[serde(default)]
    via: Vec<String>,
}

pub struct MockProvider {
    records: Vec<SampleRecord>,
}

impl MockProvider {
    /// Provider backed by the bundled dataset
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: bundled_records(),
        }
    }

    /// Provider backed by a dataset file, falling back to the bundled one
    /// when the file cannot be read or parsed
    #[must_use]
    pub fn load(data_path: Option<&Path>) -> Self {
        let Some(path) = data_path else {
            return Self::new();
        };

        match read_dataset(path) {
            Ok(records) => {
                debug!(
                    "Loaded {} sample routes from {}",
                    records.len(),
                    path.display()
                );
                Self { records }
            }
            Err(e) => {
                warn!(
                    "Failed to load sample routes from {}: {:#}. Using bundled dataset",
                    path.display(),
                    e
                );
                Self::new()
            }
        }
    }

    /// Provider backed by an in-memory JSON dataset; invalid JSON yields an empty dataset
    #[must_use]
    pub fn from_json(json: &str) -> Self {
        let records = parse_dataset(json).unwrap_or_else(|e| {
            warn!("Invalid sample dataset: {:#}", e);
            Vec::new()
        });
        Self { records }
    }

    /// Number of records in the dataset, valid or not
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RouteProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mock
    }

    async fn fetch(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> super::error::Result<Vec<Route>> {
        let routes: Vec<Route> = self
            .records
            .iter()
            .filter(|record| {
                matches!(
                    (&record.origin, &record.destination),
                    (Some(o), Some(d)) if same_location(o, origin) && same_location(d, destination)
                )
            })
            .filter_map(|record| normalize(record, date))
            .collect();

        debug!(
            "Mock provider found {} routes for {} -> {}",
            routes.len(),
            origin,
            destination
        );
        Ok(routes)
    }
}

fn bundled_records() -> Vec<SampleRecord> {
    parse_dataset(BUNDLED_DATASET).unwrap_or_else(|e| {
        warn!("Bundled sample dataset is invalid: {:#}", e);
        Vec::new()
    })
}

fn read_dataset(path: &Path) -> Result<Vec<SampleRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_dataset(&content)
}

/// Parse a dataset record by record, so one malformed entry does not discard the rest
fn parse_dataset(json: &str) -> Result<Vec<SampleRecord>> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(json).context("Sample dataset must be a JSON array")?;

    Ok(values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping sample record {}: {}", index, e);
                None
            }
        })
        .collect())
}

fn normalize(record: &SampleRecord, date: NaiveDate) -> Option<Route> {
    let (Some(origin), Some(destination)) = (&record.origin, &record.destination) else {
        return None;
    };

    let Some(mode) = record.mode.as_deref() else {
        warn!("Skipping sample route {} -> {}: missing mode", origin, destination);
        return None;
    };
    let mode = match mode.parse::<TransportMode>() {
        Ok(mode) => mode,
        Err(e) => {
            warn!("Skipping sample route {} -> {}: {}", origin, destination, e);
            return None;
        }
    };

    let price = match record.price {
        Some(price) if price.is_finite() && price >= 0.0 => price,
        other => {
            warn!(
                "Skipping sample route {} -> {}: invalid price {:?}",
                origin, destination, other
            );
            return None;
        }
    };
    let duration_hours = match record.duration {
        Some(hours) if hours.is_finite() && hours > 0.0 => hours,
        other => {
            warn!(
                "Skipping sample route {} -> {}: invalid duration {:?}",
                origin, destination, other
            );
            return None;
        }
    };

    let departure_time = record
        .departure_time
        .as_deref()
        .and_then(|value| parse_timestamp(value, date));
    let mut arrival_time = record
        .arrival_time
        .as_deref()
        .and_then(|value| parse_timestamp(value, date));

    // Time-of-day arrivals before the departure land on the next day
    if let (Some(departure), Some(arrival)) = (departure_time, arrival_time) {
        if arrival < departure {
            arrival_time = Some(arrival + Duration::days(1));
        }
    }

    Some(Route {
        origin: origin.clone(),
        destination: destination.clone(),
        mode,
        carrier: record
            .carrier
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        price,
        duration_hours,
        connections: record.connections.unwrap_or(0),
        baggage: record
            .baggage
            .map(|b| Baggage::new(b.checked_bags, b.per_bag_kg))
            .unwrap_or_default(),
        departure_time,
        arrival_time,
        via: record.via.clone(),
        provider_source: ProviderKind::Mock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
    }

    #[tokio::test]
    async fn test_bundled_dataset_has_reference_routes() {
        let provider = MockProvider::new();
        let routes = provider.fetch("Stuttgart", "Vienna", date()).await.unwrap();

        let flight = routes
            .iter()
            .find(|r| r.mode == TransportMode::Flight && r.connections == 0)
            .unwrap();
        assert_eq!(flight.price, 180.0);
        assert_eq!(flight.duration_hours, 1.25);
        assert_eq!(flight.baggage, Baggage::new(2, 23.0));

        let train = routes.iter().find(|r| r.mode == TransportMode::Train).unwrap();
        assert_eq!(train.price, 120.0);
        assert_eq!(train.connections, 1);
        assert_eq!(train.baggage, Baggage::new(3, 30.0));

        assert!(routes.iter().all(|r| r.provider_source == ProviderKind::Mock));
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive_and_ignores_date() {
        let provider = MockProvider::new();
        let a = provider.fetch("stuttgart", "VIENNA", date()).await.unwrap();
        let b = provider
            .fetch("Stuttgart", "Vienna", NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())
            .await
            .unwrap();
        assert!(!a.is_empty());
        assert_eq!(a.len(), b.len());
    }

    #[tokio::test]
    async fn test_unknown_pair_returns_empty() {
        let provider = MockProvider::new();
        let routes = provider.fetch("Oslo", "Lisbon", date()).await.unwrap();
        assert!(routes.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_fetches_are_identical() {
        let provider = MockProvider::new();
        let first = provider.fetch("Stuttgart", "Vienna", date()).await.unwrap();
        let second = provider.fetch("Stuttgart", "Vienna", date()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_legacy_field_names_and_missing_optionals() {
        let provider = MockProvider::from_json(
            r#"[{"mode": "train", "airline": "Old Rail", "origin": "A", "destination": "B",
                 "price_eur": 50, "total_hours": 3.5}]"#,
        );
        let routes = provider.fetch("A", "B", date()).await.unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].carrier, "Old Rail");
        assert_eq!(routes[0].price, 50.0);
        assert_eq!(routes[0].duration_hours, 3.5);
        assert_eq!(routes[0].connections, 0);
        assert_eq!(routes[0].baggage, Baggage::default());
    }

    #[tokio::test]
    async fn test_invalid_records_are_skipped() {
        let provider = MockProvider::from_json(
            r#"[
                {"mode": "flight", "origin": "A", "destination": "B", "duration": 2},
                {"mode": "ferry", "origin": "A", "destination": "B", "price": 10, "duration": 2},
                {"mode": "bus", "origin": "A", "destination": "B", "price": -5, "duration": 2},
                {"mode": "bus", "origin": "A", "destination": "B", "price": 5, "duration": 0},
                {"mode": "bus", "origin": "A", "destination": "B", "price": "cheap", "duration": 2},
                {"mode": "bus", "origin": "A", "destination": "B", "price": 20, "duration": 4}
            ]"#,
        );
        assert_eq!(provider.len(), 5);

        let routes = provider.fetch("A", "B", date()).await.unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].price, 20.0);
    }

    #[tokio::test]
    async fn test_negative_bag_weight_is_unknown() {
        let provider = MockProvider::from_json(
            r#"[{"mode": "bus", "origin": "A", "destination": "B", "price": 10, "duration": 2,
                 "baggage": {"checked_bags": 1, "per_bag_kg": -20}}]"#,
        );
        let routes = provider.fetch("A", "B", date()).await.unwrap();
        assert_eq!(routes[0].baggage, Baggage::new(1, 0.0));
        assert!(!routes[0].baggage.has_weight_limit());
    }

    #[tokio::test]
    async fn test_overnight_arrival_rolls_to_next_day() {
        let provider = MockProvider::from_json(
            r#"[{"mode": "bus", "origin": "A", "destination": "B", "price": 40, "duration": 14,
                 "departure_time": "21:30", "arrival_time": "11:30"}]"#,
        );
        let routes = provider.fetch("A", "B", date()).await.unwrap();
        let arrival = routes[0].arrival_time.unwrap();
        assert_eq!(arrival.date(), date().succ_opt().unwrap());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"mode": "bus", "origin": "X", "destination": "Y", "price": 9, "duration": 1}}]"#
        )
        .unwrap();

        let provider = MockProvider::load(Some(file.path()));
        let routes = provider.fetch("X", "Y", date()).await.unwrap();
        assert_eq!(routes.len(), 1);
    }

    #[test]
    fn test_missing_file_falls_back_to_bundled() {
        let provider = MockProvider::load(Some(Path::new("/nonexistent/routes.json")));
        assert_eq!(provider.len(), MockProvider::new().len());
        assert!(!provider.is_empty());
    }

    #[test]
    fn test_invalid_json_yields_empty_dataset() {
        assert!(MockProvider::from_json("not json").is_empty());
    }
}
