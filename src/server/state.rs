//! Shared application state for the control-plane handlers.

use std::sync::Arc;

use crate::common::AppConfig;
use crate::server::ratelimit::{RateLimiter, RATE_WINDOW};
use crate::transfer::OfferRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<OfferRegistry>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let limiter = RateLimiter::new(config.max_uploads_per_minute, RATE_WINDOW);
        Self {
            config: Arc::new(config),
            registry: OfferRegistry::new(),
            limiter: Arc::new(limiter),
        }
    }

    /// State with an injected limiter, for tests that shrink the window.
    pub fn with_limiter(config: AppConfig, limiter: RateLimiter) -> Self {
        Self {
            config: Arc::new(config),
            registry: OfferRegistry::new(),
            limiter: Arc::new(limiter),
        }
    }
}
