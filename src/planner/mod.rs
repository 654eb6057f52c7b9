//! Route planning pipeline
//!
//! Sequences the stages in a fixed order, each consuming the full output of
//! the previous one:
//! - Aggregator: concurrent fan-out to the registered providers
//! - Filter: hard constraints from the query
//! - Scoring: weighted ranking with deterministic tie-breaks

pub mod aggregator;
pub mod filter;
pub mod scoring;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::Result;
use crate::config::OptimizerConfig;
use crate::models::{PlanOptions, ProviderKind, Query, RankedResult, Route, Weights};
use crate::providers::ProviderRegistry;

pub use aggregator::{Aggregation, Aggregator, ProviderFailure, ProviderOutcome, ProviderReport};
pub use filter::{Constraint, DroppedRoute, FilterOutcome, FilterReport, Violation};

/// What happened during a plan, enough to explain an empty result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub providers_queried: Vec<ProviderKind>,
    /// Providers that returned at least one route
    pub providers_contributed: Vec<ProviderKind>,
    pub provider_errors: Vec<ProviderFailure>,
    pub routes_collected: usize,
    pub routes_dropped: usize,
    pub drops_by_constraint: BTreeMap<Constraint, usize>,
    /// Candidates scored, before the result limit
    pub routes_ranked: usize,
}

impl PlanMetadata {
    /// Human explanation of why a plan ranked nothing; `None` when it ranked something
    #[must_use]
    pub fn diagnosis(&self) -> Option<String> {
        if self.routes_ranked > 0 {
            return None;
        }

        if self.routes_collected == 0 {
            if !self.provider_errors.is_empty()
                && self.provider_errors.len() == self.providers_queried.len()
            {
                let errors = self
                    .provider_errors
                    .iter()
                    .map(|f| format!("{} ({})", f.provider, f.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Some(format!("All providers failed: {errors}"));
            }

            let mut message = "No provider offered routes for this trip".to_string();
            if !self.provider_errors.is_empty() {
                let failed = self
                    .provider_errors
                    .iter()
                    .map(|f| f.provider.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                message.push_str(&format!(" ({failed} failed)"));
            }
            return Some(message);
        }

        let mut constraints: Vec<(Constraint, usize)> = self
            .drops_by_constraint
            .iter()
            .map(|(constraint, count)| (*constraint, *count))
            .collect();
        constraints.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let breakdown = constraints
            .iter()
            .map(|(constraint, count)| format!("{constraint} ({count})"))
            .collect::<Vec<_>>()
            .join(", ");

        Some(format!(
            "All {} routes were excluded by constraints: {}",
            self.routes_collected, breakdown
        ))
    }
}

/// Ranked routes plus the filtered candidates they were ranked from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub results: Vec<RankedResult>,
    /// Routes that passed the filter, in aggregation order
    pub candidates: Vec<Route>,
    pub metadata: PlanMetadata,
}

impl PlanResult {
    #[must_use]
    pub fn best(&self) -> Option<&RankedResult> {
        self.results.first()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Runs the aggregation, filter and scoring stages for a query
#[derive(Clone)]
pub struct RoutePlanner {
    registry: ProviderRegistry,
    aggregator: Aggregator,
}

impl RoutePlanner {
    #[must_use]
    pub fn new(registry: ProviderRegistry, aggregator: Aggregator) -> Self {
        Self {
            registry,
            aggregator,
        }
    }

    #[must_use]
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self::new(
            ProviderRegistry::from_config(&config.providers),
            Aggregator::from_config(&config.aggregator),
        )
    }

    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Validate the request, then plan it
    pub async fn plan_best_routes(
        &self,
        origin: &str,
        destination: &str,
        date: &str,
        options: &PlanOptions,
    ) -> Result<PlanResult> {
        let query = Query::from_options(origin, destination, date, options)?;
        self.plan(&query).await
    }

    /// Aggregate, filter and score. Fails only on an invalid query, and
    /// always before any provider is called.
    #[instrument(skip(self, query), fields(origin = %query.origin, destination = %query.destination, date = %query.date))]
    pub async fn plan(&self, query: &Query) -> Result<PlanResult> {
        query.validate()?;

        let aggregation = self
            .aggregator
            .aggregate(query, self.registry.providers())
            .await;

        let outcome = filter::apply(&aggregation.routes, query);
        let report = outcome.report();

        let mut results = scoring::score(&outcome.kept, query)?;
        let routes_ranked = results.len();
        truncate(&mut results, query.top_n);

        let metadata = PlanMetadata {
            providers_queried: aggregation.reports.iter().map(|r| r.provider).collect(),
            providers_contributed: aggregation.contributors(),
            provider_errors: aggregation.failures(),
            routes_collected: aggregation.routes.len(),
            routes_dropped: report.dropped,
            drops_by_constraint: report.drops_by_constraint,
            routes_ranked,
        };

        info!(
            "Plan complete: {} collected, {} dropped, {} ranked, {} returned",
            metadata.routes_collected,
            metadata.routes_dropped,
            metadata.routes_ranked,
            results.len()
        );

        Ok(PlanResult {
            results,
            candidates: outcome.kept,
            metadata,
        })
    }

    /// Re-rank an existing plan's candidates with different weights, without
    /// fetching again
    pub fn rescore(plan: &PlanResult, weights: Weights, top_n: Option<usize>) -> Result<PlanResult> {
        let mut results = scoring::score_with_weights(&plan.candidates, &weights)?;
        truncate(&mut results, top_n);

        Ok(PlanResult {
            results,
            candidates: plan.candidates.clone(),
            metadata: plan.metadata.clone(),
        })
    }
}

fn truncate(results: &mut Vec<RankedResult>, top_n: Option<usize>) {
    if let Some(limit) = top_n {
        results.truncate(limit);
    }
}
