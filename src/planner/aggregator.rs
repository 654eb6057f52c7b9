//! Aggregator
//!
//! Fans a query out to every registered provider concurrently. Each call is
//! bounded by its own timeout; a failed or timed-out provider contributes no
//! routes and is recorded in the provider reports instead of failing the run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AggregatorConfig;
use crate::models::{ProviderKind, Query, Route};
use crate::providers::{ProviderError, RouteProvider};

pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(30);

/// How one provider call ended
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    Succeeded { routes: usize },
    Failed { error: ProviderError },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReport {
    pub provider: ProviderKind,
    pub outcome: ProviderOutcome,
    pub elapsed_ms: u64,
}

impl ProviderReport {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, ProviderOutcome::Succeeded { .. })
    }
}

/// A provider error as surfaced to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: ProviderKind,
    pub message: String,
}

/// Routes from every successful provider, concatenated in registry order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub routes: Vec<Route>,
    pub reports: Vec<ProviderReport>,
}

impl Aggregation {
    /// Providers that returned at least one route
    #[must_use]
    pub fn contributors(&self) -> Vec<ProviderKind> {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, ProviderOutcome::Succeeded { routes } if routes > 0))
            .map(|r| r.provider)
            .collect()
    }

    #[must_use]
    pub fn failures(&self) -> Vec<ProviderFailure> {
        self.reports
            .iter()
            .filter_map(|r| match &r.outcome {
                ProviderOutcome::Failed { error } => Some(ProviderFailure {
                    provider: r.provider,
                    message: error.to_string(),
                }),
                ProviderOutcome::Succeeded { .. } => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    timeout: Duration,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_ADAPTER_TIMEOUT)
    }
}

impl Aggregator {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[must_use]
    pub fn from_config(config: &AggregatorConfig) -> Self {
        Self::new(Duration::from_secs(config.adapter_timeout_seconds))
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query every adapter for the trip and collect what succeeds
    pub async fn aggregate(
        &self,
        query: &Query,
        adapters: &[Arc<dyn RouteProvider>],
    ) -> Aggregation {
        let calls = adapters.iter().map(|adapter| self.call(adapter.as_ref(), query));
        let results = join_all(calls).await;

        let mut aggregation = Aggregation::default();
        for (provider, result, elapsed_ms) in results {
            let outcome = match result {
                Ok(routes) => {
                    info!(
                        "Provider {} returned {} routes in {}ms",
                        provider,
                        routes.len(),
                        elapsed_ms
                    );
                    let count = routes.len();
                    aggregation.routes.extend(routes);
                    ProviderOutcome::Succeeded { routes: count }
                }
                Err(error) => {
                    warn!("Provider {} failed after {}ms: {}", provider, elapsed_ms, error);
                    ProviderOutcome::Failed { error }
                }
            };
            aggregation.reports.push(ProviderReport {
                provider,
                outcome,
                elapsed_ms,
            });
        }

        info!(
            "Collected {} routes from {} providers",
            aggregation.routes.len(),
            adapters.len()
        );
        aggregation
    }

    async fn call(
        &self,
        adapter: &dyn RouteProvider,
        query: &Query,
    ) -> (ProviderKind, Result<Vec<Route>, ProviderError>, u64) {
        let started = Instant::now();
        let result = tokio::time::timeout(
            self.timeout,
            adapter.fetch(&query.origin, &query.destination, query.date),
        )
        .await
        .unwrap_or(Err(ProviderError::Timeout(self.timeout)));

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        (adapter.kind(), result, elapsed_ms)
    }
}
