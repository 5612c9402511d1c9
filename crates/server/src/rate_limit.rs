//! Sliding-window rate limiting keyed by `(caller_ip, endpoint)`.
//!
//! State lives entirely in the store: `incr(rate:{ip}:{endpoint})`, with the
//! window's TTL set only on the first increment so the counter resets `W`
//! seconds after the first call in a window, not on every call.

use sessionctl_config::{RateLimitBudget, RateLimitConfig};
use sessionctl_core::{naming, ControlPlaneError};
use sessionctl_store::StoreClient;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Create,
    Wake,
    Sleep,
    Scale,
    Delete,
    Chat,
    Status,
}

impl Endpoint {
    fn name(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Wake => "wake",
            Self::Sleep => "sleep",
            Self::Scale => "scale",
            Self::Delete => "delete",
            Self::Chat => "chat",
            Self::Status => "status",
        }
    }

    fn budget(&self, config: &RateLimitConfig) -> RateLimitBudget {
        match self {
            Self::Create => config.create,
            Self::Wake => config.wake,
            Self::Sleep => config.sleep,
            Self::Scale => config.scale,
            Self::Delete => config.delete,
            Self::Chat => config.chat,
            Self::Status => config.status,
        }
    }
}

pub struct RateLimiter {
    store: Arc<dyn StoreClient>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn StoreClient>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Increments the counter for `(caller_ip, endpoint)`; rejects with
    /// `RateLimited` if the post-increment value exceeds the endpoint's
    /// budget.
    pub async fn check(&self, caller_ip: &str, endpoint: Endpoint) -> Result<(), ControlPlaneError> {
        let budget = endpoint.budget(&self.config);
        let key = naming::rate_key(caller_ip, endpoint.name());
        let count = self.store.incr(&key).await?;
        if count == 1 {
            self.store.expire(&key, budget.window_secs).await?;
        }
        if count > budget.limit as i64 {
            return Err(ControlPlaneError::RateLimited { retry_after_secs: budget.window_secs });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionctl_store::FakeStoreClient;

    #[tokio::test]
    async fn fourth_call_within_window_is_rejected() {
        let store = Arc::new(FakeStoreClient::new());
        let mut config = RateLimitConfig::default();
        config.create = RateLimitBudget { limit: 3, window_secs: 60 };
        let limiter = RateLimiter::new(store, config);

        for _ in 0..3 {
            limiter.check("1.2.3.4", Endpoint::Create).await.unwrap();
        }
        let err = limiter.check("1.2.3.4", Endpoint::Create).await.unwrap_err();
        match err {
            ControlPlaneError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 60),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn different_ips_have_independent_budgets() {
        let store = Arc::new(FakeStoreClient::new());
        let mut config = RateLimitConfig::default();
        config.create = RateLimitBudget { limit: 1, window_secs: 60 };
        let limiter = RateLimiter::new(store, config);

        limiter.check("1.1.1.1", Endpoint::Create).await.unwrap();
        limiter.check("2.2.2.2", Endpoint::Create).await.unwrap();
    }
}
