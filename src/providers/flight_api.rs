//! Flight API Provider
//!
//! Amadeus-style flight search. Authenticates with OAuth2 client credentials,
//! caches the access token until shortly before it expires, then queries
//! flight offers and normalizes them into routes.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::error::{ProviderError, Result};
use super::{RouteProvider, http_client, parse_timestamp};
use crate::config::FlightApiConfig;
use crate::models::{Baggage, ProviderKind, Route, TransportMode};

const PROVIDER_NAME: &str = "flight_api";
const TOKEN_PATH: &str = "/v1/security/oauth2/token";
const OFFERS_PATH: &str = "/v2/shopping/flight-offers";
/// Tokens are refreshed this long before the server-side expiry
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(300);
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 1799;
const DEFAULT_CHECKED_BAGS: u32 = 1;
const DEFAULT_BAG_WEIGHT_KG: f64 = 23.0;

/// Airport codes for the cities the flight search understands by name
const CITY_AIRPORTS: &[(&str, &str)] = &[
    ("stuttgart", "STR"),
    ("ulm", "FMM"),
    ("vienna", "VIE"),
    ("berlin", "BER"),
    ("munich", "MUC"),
    ("frankfurt", "FRA"),
    ("hamburg", "HAM"),
    ("cologne", "CGN"),
    ("dusseldorf", "DUS"),
    ("düsseldorf", "DUS"),
    ("paris", "CDG"),
    ("london", "LHR"),
    ("amsterdam", "AMS"),
    ("zurich", "ZRH"),
    ("milan", "MXP"),
    ("rome", "FCO"),
    ("madrid", "MAD"),
    ("barcelona", "BCN"),
];

/// Resolve a city name or a three-letter airport code to an airport code
#[must_use]
pub fn airport_code(location: &str) -> Option<String> {
    let location = location.trim();
    let needle = location.to_lowercase();
    if let Some((_, code)) = CITY_AIRPORTS.iter().find(|(city, _)| *city == needle) {
        return Some((*code).to_string());
    }

    if location.len() == 3 && location.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(location.to_ascii_uppercase());
    }
    None
}

struct AccessToken {
    value: String,
    refresh_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
    #[serde(default)]
    dictionaries: Dictionaries,
}

#[derive(Debug, Default, Deserialize)]
struct Dictionaries {
    #[serde(default)]
    carriers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlightOffer {
    price: OfferPrice,
    itineraries: Vec<Itinerary>,
    #[serde(default)]
    traveler_pricings: Vec<TravelerPricing>,
    #[serde(default)]
    validating_airline_codes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferPrice {
    total: Option<String>,
    grand_total: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Itinerary {
    duration: Option<String>,
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Segment {
    departure: SegmentEndpoint,
    arrival: SegmentEndpoint,
    carrier_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentEndpoint {
    iata_code: Option<String>,
    at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TravelerPricing {
    #[serde(default)]
    fare_details_by_segment: Vec<FareDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FareDetail {
    included_checked_bags: Option<CheckedBags>,
}

#[derive(Debug, Deserialize)]
struct CheckedBags {
    quantity: Option<u32>,
    weight: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    code: Option<serde_json::Value>,
    title: Option<String>,
    detail: Option<String>,
}

/// Flight search client
pub struct FlightApiProvider {
    client: ClientWithMiddleware,
    api_key: String,
    api_secret: String,
    base_url: String,
    max_offers: u32,
    token: Mutex<Option<AccessToken>>,
}

impl FlightApiProvider {
    /// Create a client; fails with `NotConfigured` when credentials are missing
    pub fn new(config: &FlightApiConfig) -> Result<Self> {
        let (Some(api_key), Some(api_secret)) = (
            config.api_key.as_deref().filter(|k| !k.trim().is_empty()),
            config.api_secret.as_deref().filter(|s| !s.trim().is_empty()),
        ) else {
            return Err(ProviderError::NotConfigured(
                "flight_api requires api_key and api_secret".to_string(),
            ));
        };

        Ok(Self {
            client: http_client(config.timeout_seconds, config.max_retries)?,
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_offers: config.max_offers,
            token: Mutex::new(None),
        })
    }

    /// Return a cached token or request a new one
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        debug!("Requesting new flight API access token");
        let body = format!(
            "grant_type=client_credentials&client_id={}&client_secret={}",
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&self.api_secret)
        );
        let response = self
            .client
            .post(format!("{}{}", self.base_url, TOKEN_PATH))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(match status.as_u16() {
                400 | 401 | 403 => ProviderError::Authentication(format!(
                    "Token request rejected: {}",
                    api_error_message(&text)
                )),
                code => ProviderError::from_status(PROVIDER_NAME, code, &api_error_message(&text)),
            });
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Parse(format!("Invalid token response: {e}")))?;
        let lifetime =
            Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));

        *cached = Some(AccessToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        });
        Ok(token.access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Query flight offers between two airports
    async fn search_offers(
        &self,
        origin_code: &str,
        destination_code: &str,
        date: NaiveDate,
    ) -> Result<OffersResponse> {
        let token = self.access_token().await?;
        let url = format!(
            "{}{}?originLocationCode={}&destinationLocationCode={}&departureDate={}&adults=1&max={}&currencyCode=EUR",
            self.base_url,
            OFFERS_PATH,
            urlencoding::encode(origin_code),
            urlencoding::encode(destination_code),
            date.format("%Y-%m-%d"),
            self.max_offers
        );

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            if status.as_u16() == 401 {
                self.invalidate_token().await;
            }
            return Err(ProviderError::from_status(
                PROVIDER_NAME,
                status.as_u16(),
                &api_error_message(&text),
            ));
        }

        serde_json::from_str(&text)
            .map_err(|e| ProviderError::Parse(format!("Invalid flight offers response: {e}")))
    }
}

#[async_trait]
impl RouteProvider for FlightApiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::FlightApi
    }

    #[instrument(skip(self), fields(provider = PROVIDER_NAME))]
    async fn fetch(&self, origin: &str, destination: &str, date: NaiveDate) -> Result<Vec<Route>> {
        let (Some(origin_code), Some(destination_code)) =
            (airport_code(origin), airport_code(destination))
        else {
            warn!(
                "No airport code known for {} -> {}, skipping flight search",
                origin, destination
            );
            return Ok(Vec::new());
        };

        let response = self
            .search_offers(&origin_code, &destination_code, date)
            .await?;

        let routes: Vec<Route> = response
            .data
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| {
                match serde_json::from_value::<FlightOffer>(value) {
                    Ok(offer) => {
                        normalize_offer(&offer, origin, destination, date, &response.dictionaries)
                    }
                    Err(e) => {
                        warn!("Skipping malformed flight offer {}: {}", index, e);
                        None
                    }
                }
            })
            .collect();

        info!(
            "Flight API returned {} routes for {} -> {}",
            routes.len(),
            origin_code,
            destination_code
        );
        Ok(routes)
    }
}

fn normalize_offer(
    offer: &FlightOffer,
    origin: &str,
    destination: &str,
    date: NaiveDate,
    dictionaries: &Dictionaries,
) -> Option<Route> {
    let price = offer
        .price
        .total
        .as_deref()
        .or(offer.price.grand_total.as_deref())
        .and_then(|p| p.trim().parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p >= 0.0);
    let Some(price) = price else {
        warn!("Skipping flight offer without a valid price");
        return None;
    };

    let Some(itinerary) = offer.itineraries.first() else {
        warn!("Skipping flight offer without itineraries");
        return None;
    };
    let (Some(first), Some(last)) = (itinerary.segments.first(), itinerary.segments.last()) else {
        warn!("Skipping flight offer without segments");
        return None;
    };

    let departure_time = first
        .departure
        .at
        .as_deref()
        .and_then(|at| parse_timestamp(at, date));
    let arrival_time = last
        .arrival
        .at
        .as_deref()
        .and_then(|at| parse_timestamp(at, date));

    let duration_hours = itinerary
        .duration
        .as_deref()
        .and_then(parse_iso_duration)
        .or_else(|| match (departure_time, arrival_time) {
            (Some(dep), Some(arr)) if arr > dep => {
                Some((arr - dep).num_minutes() as f64 / 60.0)
            }
            _ => None,
        })
        .filter(|hours| *hours > 0.0);
    let Some(duration_hours) = duration_hours else {
        warn!("Skipping flight offer without a usable duration");
        return None;
    };

    let carrier_code = first
        .carrier_code
        .clone()
        .or_else(|| offer.validating_airline_codes.first().cloned());
    let carrier = match carrier_code {
        Some(code) => dictionaries
            .carriers
            .get(&code)
            .cloned()
            .unwrap_or(code),
        None => "Unknown".to_string(),
    };

    let stops = itinerary.segments.len() - 1;
    let via = itinerary.segments[..stops]
        .iter()
        .filter_map(|segment| segment.arrival.iata_code.clone())
        .collect();

    Some(Route {
        origin: origin.trim().to_string(),
        destination: destination.trim().to_string(),
        mode: TransportMode::Flight,
        carrier,
        price,
        duration_hours,
        connections: u32::try_from(stops).unwrap_or(u32::MAX),
        baggage: checked_baggage(offer),
        departure_time,
        arrival_time,
        via,
        provider_source: ProviderKind::FlightApi,
    })
}

/// Included checked bags of the first fare segment; a bare weight allowance counts as one bag
fn checked_baggage(offer: &FlightOffer) -> Baggage {
    let bags = offer
        .traveler_pricings
        .first()
        .and_then(|pricing| pricing.fare_details_by_segment.first())
        .and_then(|detail| detail.included_checked_bags.as_ref());

    match bags {
        Some(bags) => Baggage::new(
            bags.quantity.unwrap_or(DEFAULT_CHECKED_BAGS),
            bags.weight.unwrap_or(DEFAULT_BAG_WEIGHT_KG),
        ),
        None => Baggage::new(DEFAULT_CHECKED_BAGS, DEFAULT_BAG_WEIGHT_KG),
    }
}

/// Hours in an ISO 8601 duration such as `PT2H10M` or `P1DT3H`
fn parse_iso_duration(value: &str) -> Option<f64> {
    let rest = value.trim().strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, t),
        None => (rest, ""),
    };

    let mut hours = 0.0;
    let mut parsed_any = false;
    for (part, units) in [
        (date_part, &[('D', 24.0)][..]),
        (time_part, &[('H', 1.0), ('M', 1.0 / 60.0), ('S', 1.0 / 3600.0)][..]),
    ] {
        let mut number = String::new();
        for c in part.chars() {
            if c.is_ascii_digit() || c == '.' {
                number.push(c);
                continue;
            }
            let factor = units.iter().find(|(unit, _)| *unit == c)?.1;
            hours += number.parse::<f64>().ok()? * factor;
            number.clear();
            parsed_any = true;
        }
        if !number.is_empty() {
            return None;
        }
    }

    parsed_any.then_some(hours)
}

/// Best human-readable message from an API error body
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .and_then(|response| response.errors.into_iter().next())
        .map(|error| {
            let text = error
                .detail
                .or(error.title)
                .unwrap_or_else(|| "unknown error".to_string());
            match error.code {
                Some(code) => format!("[{code}] {text}"),
                None => text,
            }
        })
        .unwrap_or_else(|| body.to_string())
}
