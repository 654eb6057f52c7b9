//! Provider adapters
//!
//! Each adapter translates one upstream data source into canonical [`Route`]s:
//! - Mock: bundled sample dataset, always available, never fails
//! - Flight API: Amadeus-style flight offers with OAuth2 client credentials
//! - Ground transport: Omio-style train and bus search

pub mod error;
pub mod flight_api;
pub mod ground_transport;
pub mod mock;
pub mod registry;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::models::{ProviderKind, Route};

pub use error::ProviderError;
pub use flight_api::FlightApiProvider;
pub use ground_transport::GroundTransportProvider;
pub use mock::MockProvider;
pub use registry::ProviderRegistry;

/// The single capability the pipeline needs from a data source
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Which adapter this is
    fn kind(&self) -> ProviderKind;

    /// Fetch and normalize every route the provider offers for the trip
    async fn fetch(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> error::Result<Vec<Route>>;
}

const USER_AGENT: &str = concat!("travel-optimizer/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by the remote adapters: per-request timeout plus
/// exponential-backoff retries on transient failures
pub(crate) fn http_client(
    timeout_seconds: u64,
    max_retries: u32,
) -> error::Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(USER_AGENT)
        .build()?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Parse a provider timestamp into local wall-clock time.
///
/// Accepts RFC 3339, ISO 8601 without offset (with or without seconds) and a
/// bare `HH:MM` time of day, which is placed on `date`.
pub(crate) fn parse_timestamp(value: &str, date: NaiveDate) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    ["%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
        .map(|time| date.and_time(time))
}
