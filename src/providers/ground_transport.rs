//! Ground Transport Provider
//!
//! Train and bus journeys from an Omio-style search API authenticated with an
//! API key header. Prices arrive in cents and durations in minutes.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::error::{ProviderError, Result};
use super::{RouteProvider, http_client, parse_timestamp};
use crate::config::GroundTransportConfig;
use crate::models::{Baggage, ProviderKind, Route, TransportMode};

const PROVIDER_NAME: &str = "ground_transport";
const JOURNEYS_PATH: &str = "/v1/journeys";
const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Deserialize)]
struct JourneysResponse {
    #[serde(default)]
    journeys: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Journey {
    mode: Option<String>,
    operator: Option<String>,
    price_cents: Option<i64>,
    duration_minutes: Option<i64>,
    changes: Option<u32>,
    luggage: Option<Luggage>,
    departure: Option<String>,
    arrival: Option<String>,
    #[serde(default)]
    via: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Luggage {
    pieces: Option<u32>,
    max_weight_kg: Option<f64>,
}

pub struct GroundTransportProvider {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

impl GroundTransportProvider {
    /// Create a client; fails with `NotConfigured` when no API key is set
    pub fn new(config: &GroundTransportConfig) -> Result<Self> {
        let Some(api_key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            return Err(ProviderError::NotConfigured(
                "ground_transport requires api_key".to_string(),
            ));
        };

        Ok(Self {
            client: http_client(config.timeout_seconds, config.max_retries)?,
            api_key: api_key.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RouteProvider for GroundTransportProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GroundTransport
    }

    #[instrument(skip(self), fields(provider = PROVIDER_NAME))]
    async fn fetch(&self, origin: &str, destination: &str, date: NaiveDate) -> Result<Vec<Route>> {
        let url = format!(
            "{}{}?from={}&to={}&date={}&passengers=1",
            self.base_url,
            JOURNEYS_PATH,
            urlencoding::encode(origin.trim()),
            urlencoding::encode(destination.trim()),
            date.format("%Y-%m-%d")
        );

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::from_status(
                PROVIDER_NAME,
                status.as_u16(),
                &text,
            ));
        }

        let response: JourneysResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Parse(format!("Invalid journeys response: {e}")))?;

        let routes: Vec<Route> = response
            .journeys
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value::<Journey>(value) {
                Ok(journey) => normalize_journey(&journey, origin, destination, date),
                Err(e) => {
                    warn!("Skipping malformed journey {}: {}", index, e);
                    None
                }
            })
            .collect();

        info!(
            "Ground transport returned {} routes for {} -> {}",
            routes.len(),
            origin,
            destination
        );
        Ok(routes)
    }
}

fn normalize_journey(
    journey: &Journey,
    origin: &str,
    destination: &str,
    date: NaiveDate,
) -> Option<Route> {
    let mode = match journey.mode.as_deref().map(str::parse::<TransportMode>) {
        Some(Ok(TransportMode::Flight)) => {
            warn!("Skipping journey with unexpected mode 'flight'");
            return None;
        }
        Some(Ok(mode)) => mode,
        Some(Err(e)) => {
            warn!("Skipping journey: {}", e);
            return None;
        }
        None => {
            warn!("Skipping journey without mode");
            return None;
        }
    };

    let Some(price_cents) = journey.price_cents.filter(|cents| *cents >= 0) else {
        warn!("Skipping {} journey without a valid price", mode);
        return None;
    };
    let Some(duration_minutes) = journey.duration_minutes.filter(|minutes| *minutes > 0) else {
        warn!("Skipping {} journey without a valid duration", mode);
        return None;
    };

    let baggage = journey
        .luggage
        .as_ref()
        .map(|luggage| {
            Baggage::new(
                luggage.pieces.unwrap_or(0),
                luggage.max_weight_kg.unwrap_or(0.0),
            )
        })
        .unwrap_or_default();

    Some(Route {
        origin: origin.trim().to_string(),
        destination: destination.trim().to_string(),
        mode,
        carrier: journey
            .operator
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        price: price_cents as f64 / 100.0,
        duration_hours: duration_minutes as f64 / 60.0,
        connections: journey.changes.unwrap_or(0),
        baggage,
        departure_time: journey
            .departure
            .as_deref()
            .and_then(|value| parse_timestamp(value, date)),
        arrival_time: journey
            .arrival
            .as_deref()
            .and_then(|value| parse_timestamp(value, date)),
        via: journey.via.clone(),
        provider_source: ProviderKind::GroundTransport,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> GroundTransportConfig {
        GroundTransportConfig {
            api_key: Some("ground-key".to_string()),
            base_url: base_url.to_string(),
            timeout_seconds: 5,
            max_retries: 0,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
    }

    #[test]
    fn test_missing_key_not_configured() {
        let mut cfg = config("http://localhost");
        cfg.api_key = Some("  ".to_string());
        assert!(matches!(
            GroundTransportProvider::new(&cfg),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_normalizes_journeys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JOURNEYS_PATH))
            .and(query_param("from", "Stuttgart"))
            .and(query_param("to", "Vienna"))
            .and(query_param("date", "2025-10-01"))
            .and(header(API_KEY_HEADER, "ground-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "journeys": [
                    {
                        "mode": "TRAIN",
                        "operator": "ÖBB",
                        "price_cents": 11990,
                        "duration_minutes": 435,
                        "changes": 1,
                        "luggage": {"pieces": 3, "max_weight_kg": 30},
                        "departure": "2025-10-01T06:12:00+02:00",
                        "arrival": "2025-10-01T13:27:00+02:00",
                        "via": ["Munich"]
                    },
                    {
                        "mode": "COACH",
                        "operator": "FlixBus",
                        "price_cents": 3999,
                        "duration_minutes": 840
                    },
                    {"mode": "FERRY", "price_cents": 100, "duration_minutes": 60},
                    {"mode": "BUS", "duration_minutes": 60},
                    {"mode": "BUS", "price_cents": "free"}
                ]
            })))
            .mount(&server)
            .await;

        let provider = GroundTransportProvider::new(&config(&server.uri())).unwrap();
        let routes = provider.fetch("Stuttgart", "Vienna", date()).await.unwrap();

        assert_eq!(routes.len(), 2);

        let train = &routes[0];
        assert_eq!(train.mode, TransportMode::Train);
        assert_eq!(train.carrier, "ÖBB");
        assert!((train.price - 119.90).abs() < 1e-9);
        assert!((train.duration_hours - 7.25).abs() < 1e-9);
        assert_eq!(train.connections, 1);
        assert_eq!(train.baggage, Baggage::new(3, 30.0));
        assert_eq!(train.via, vec!["Munich".to_string()]);
        assert_eq!(
            train.departure_time.unwrap().format("%H:%M").to_string(),
            "06:12"
        );
        assert_eq!(train.provider_source, ProviderKind::GroundTransport);

        let bus = &routes[1];
        assert_eq!(bus.mode, TransportMode::Bus);
        assert_eq!(bus.connections, 0);
        assert_eq!(bus.baggage, Baggage::default());
        assert!(bus.departure_time.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JOURNEYS_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = GroundTransportProvider::new(&config(&server.uri())).unwrap();
        let err = provider.fetch("Berlin", "Paris", date()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JOURNEYS_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let provider = GroundTransportProvider::new(&config(&server.uri())).unwrap();
        let err = provider.fetch("Berlin", "Paris", date()).await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::Api {
                status: 503,
                message: "maintenance".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_city_names_are_url_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JOURNEYS_PATH))
            .and(query_param("from", "Frankfurt am Main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"journeys": []})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GroundTransportProvider::new(&config(&server.uri())).unwrap();
        let routes = provider
            .fetch("Frankfurt am Main", "Berlin", date())
            .await
            .unwrap();
        assert!(routes.is_empty());
    }
}
