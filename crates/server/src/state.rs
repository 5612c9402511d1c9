//! Shared state across all handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use sessionctl_config::Settings;
use sessionctl_lifecycle::LifecycleEngine;
use sessionctl_orchestrator::OrchestratorClient;
use sessionctl_registry::SessionRegistry;
use sessionctl_store::StoreClient;
use std::sync::Arc;

use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn StoreClient>,
    pub registry: Arc<SessionRegistry>,
    pub orchestrator: Arc<dyn OrchestratorClient>,
    pub lifecycle: Arc<LifecycleEngine>,
    pub rate_limiter: Arc<RateLimiter>,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn StoreClient>,
        orchestrator: Arc<dyn OrchestratorClient>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new(store.clone(), settings.session_ttl_secs));
        let profile = settings.profile.to_profile();
        let lifecycle = Arc::new(LifecycleEngine::new(
            registry.clone(),
            orchestrator.clone(),
            profile,
            settings.pod.image.clone(),
            settings.pod.port,
        ));
        let rate_limiter = Arc::new(RateLimiter::new(store.clone(), settings.rate_limit.clone()));
        Self {
            settings: Arc::new(settings),
            store,
            registry,
            orchestrator,
            lifecycle,
            rate_limiter,
            metrics_handle,
        }
    }
}
