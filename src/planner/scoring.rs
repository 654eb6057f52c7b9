//! Scoring Stage
//!
//! Ranks candidates by a weighted sum of per-metric goodness values:
//! - price drives the cost weight
//! - duration drives the time weight
//! - connections drive the convenience weight
//!
//! Each metric is min-max scaled over the candidate set and inverted so that
//! the lowest raw value scores 1. A metric on which every candidate ties
//! contributes a neutral 0.5.

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::Result;
use crate::models::{Query, RankedResult, Route, ScoreBreakdown, Weights};

const NEUTRAL_GOODNESS: f64 = 0.5;
/// Scores are compared at this many steps per unit, so sums that differ only
/// by floating-point rounding count as equal
const SCORE_RESOLUTION: f64 = 1e9;

/// Observed range of one metric across the candidates
#[derive(Debug, Clone, Copy)]
struct MetricRange {
    min: f64,
    max: f64,
}

impl MetricRange {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        values.fold(None, |range, value| match range {
            None => Some(Self {
                min: value,
                max: value,
            }),
            Some(r) => Some(Self {
                min: r.min.min(value),
                max: r.max.max(value),
            }),
        })
    }

    /// 1 for the lowest value, 0 for the highest
    fn goodness(&self, value: f64) -> f64 {
        if self.max == self.min {
            return NEUTRAL_GOODNESS;
        }
        1.0 - (value - self.min) / (self.max - self.min)
    }
}

/// Score and rank routes with the query's weights
pub fn score(routes: &[Route], query: &Query) -> Result<Vec<RankedResult>> {
    score_with_weights(routes, &query.weights)
}

/// Score and rank routes, best first, with 1-based ranks.
///
/// Equal scores fall back to lower price, then shorter duration, then fewer
/// connections, then input order.
pub fn score_with_weights(routes: &[Route], weights: &Weights) -> Result<Vec<RankedResult>> {
    let weights = weights.normalized()?;

    let (Some(price), Some(duration), Some(connections)) = (
        MetricRange::of(routes.iter().map(|r| r.price)),
        MetricRange::of(routes.iter().map(|r| r.duration_hours)),
        MetricRange::of(routes.iter().map(|r| f64::from(r.connections))),
    ) else {
        debug!("No candidates to score");
        return Ok(Vec::new());
    };

    let mut scored: Vec<(usize, &Route, ScoreBreakdown, f64)> = routes
        .iter()
        .enumerate()
        .map(|(index, route)| {
            let breakdown = ScoreBreakdown {
                price: price.goodness(route.price),
                duration: duration.goodness(route.duration_hours),
                connections: connections.goodness(f64::from(route.connections)),
            };
            let score = weights.cost * breakdown.price
                + weights.time * breakdown.duration
                + weights.convenience * breakdown.connections;
            (index, route, breakdown, score)
        })
        .collect();

    scored.sort_by(|a, b| rank_order((a.0, a.1, a.3), (b.0, b.1, b.3)));

    let ranked: Vec<RankedResult> = scored
        .into_iter()
        .enumerate()
        .map(|(position, (_, route, breakdown, score))| RankedResult {
            route: route.clone(),
            score,
            rank: position + 1,
            breakdown,
        })
        .collect();

    info!("Scored {} routes", ranked.len());
    Ok(ranked)
}

fn rank_order(a: (usize, &Route, f64), b: (usize, &Route, f64)) -> Ordering {
    let (a_index, a_route, a_score) = a;
    let (b_index, b_route, b_score) = b;

    score_key(b_score)
        .cmp(&score_key(a_score))
        .then_with(|| a_route.price.total_cmp(&b_route.price))
        .then_with(|| a_route.duration_hours.total_cmp(&b_route.duration_hours))
        .then_with(|| a_route.connections.cmp(&b_route.connections))
        .then_with(|| a_index.cmp(&b_index))
}

fn score_key(score: f64) -> i64 {
    (score * SCORE_RESOLUTION).round() as i64
}
