//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::relay::RelayHub;
use crate::util::rate_limit::JoinRateLimiter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: Arc<RelayHub>,
    pub join_limiter: JoinRateLimiter,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Initialize relay hub (Arc for sharing across cloned AppState)
        let hub = Arc::new(RelayHub::new(config.relay_mode));

        let join_limiter = JoinRateLimiter::new(config.join_rate_limit);

        Self {
            config,
            hub,
            join_limiter,
        }
    }
}
