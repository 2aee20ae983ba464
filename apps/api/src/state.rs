use std::sync::Arc;

use crate::config::Config;
use crate::executor::TimeoutExecutor;
use crate::llm_client::ProviderHandle;
use crate::rate_limit::RateLimiter;

/// Shared application state injected into all route handlers via Axum extractors.
/// Built once in `main`; everything inside lives for the process lifetime.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Per-client counters. The only mutable state shared across requests.
    pub limiter: Arc<RateLimiter>,
    /// Generator client, built on first use.
    pub provider: Arc<ProviderHandle>,
    pub executor: TimeoutExecutor,
}

impl AppState {
    pub fn new(config: Config, provider: ProviderHandle) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::new(config.rate_limit_tiers.clone())),
            provider: Arc::new(provider),
            executor: TimeoutExecutor::new(config.provider_pool_size),
            config,
        }
    }
}
