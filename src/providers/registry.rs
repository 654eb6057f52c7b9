use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{
    FlightApiProvider, GroundTransportProvider, MockProvider, ProviderError, RouteProvider,
};
use crate::config::ProvidersConfig;
use crate::models::ProviderKind;

/// The fixed, ordered set of adapters a planner queries
///
/// Built once from configuration at startup; the pipeline never looks at the
/// environment itself.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn RouteProvider>>,
}

impl ProviderRegistry {
    /// Register mock, flight API and ground transport adapters, in that order,
    /// for every one that is enabled and configured. Falls back to the mock
    /// adapter when nothing else is available.
    #[must_use]
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let mut providers: Vec<Arc<dyn RouteProvider>> = Vec::new();

        if config.mock.enabled {
            providers.push(Arc::new(MockProvider::load(config.mock.data_path.as_deref())));
        }

        match FlightApiProvider::new(&config.flight_api) {
            Ok(provider) => providers.push(Arc::new(provider)),
            Err(ProviderError::NotConfigured(reason)) => debug!("Flight API disabled: {}", reason),
            Err(e) => warn!("Flight API unavailable: {}", e),
        }

        match GroundTransportProvider::new(&config.ground_transport) {
            Ok(provider) => providers.push(Arc::new(provider)),
            Err(ProviderError::NotConfigured(reason)) => {
                debug!("Ground transport disabled: {}", reason);
            }
            Err(e) => warn!("Ground transport unavailable: {}", e),
        }

        if providers.is_empty() {
            warn!("No route providers configured, falling back to mock data");
            providers.push(Arc::new(MockProvider::load(config.mock.data_path.as_deref())));
        }

        let registry = Self { providers };
        info!("Registered route providers: {:?}", registry.kinds());
        registry
    }

    /// Registry with an explicit adapter list, queried in the given order
    #[must_use]
    pub fn with_providers(providers: Vec<Arc<dyn RouteProvider>>) -> Self {
        Self { providers }
    }

    #[must_use]
    pub fn providers(&self) -> &[Arc<dyn RouteProvider>] {
        &self.providers
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
