//! Data models for the travel optimizer
//!
//! This module contains the core domain models organized by concern:
//! - Route: a normalized candidate itinerary from one provider
//! - Query: a validated search request with hard constraints and weights
//! - Ranked: a scored route with its position in the final ranking

pub mod query;
pub mod ranked;
pub mod route;

// Re-export all public types for convenient access
pub use query::{DEFAULT_TOP_N, PlanOptions, Query, TimeWindow, Weights, parse_date};
pub use ranked::{RankedResult, ScoreBreakdown};
pub use route::{Baggage, ProviderKind, Route, TransportMode, same_carrier, same_location};
