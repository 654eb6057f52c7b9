//! Scored and ranked route

use serde::{Deserialize, Serialize};

use super::route::Route;

/// Per-metric goodness values in [0, 1], where 1 is best among the candidates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub price: f64,
    pub duration: f64,
    pub connections: f64,
}

/// A route with its composite score and 1-based rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub route: Route,
    pub score: f64,
    pub rank: usize,
    pub breakdown: ScoreBreakdown,
}
