//! Travel optimizer - multi-provider route search and ranking
//!
//! This library collects flight, train and bus options from several
//! providers, drops the ones that violate hard constraints and ranks the rest
//! by a weighted score over price, travel time and number of connections.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod planner;
pub mod providers;
pub mod summary;

// Re-export core types for public API
pub use config::OptimizerConfig;
pub use error::TravelOptimizerError;
pub use models::{
    Baggage, PlanOptions, ProviderKind, Query, RankedResult, Route, TimeWindow, TransportMode,
    Weights,
};
pub use planner::{PlanMetadata, PlanResult, RoutePlanner};
pub use providers::{ProviderError, ProviderRegistry, RouteProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TravelOptimizerError>;
