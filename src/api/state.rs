//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::api_key::ApiKeyService;
use crate::infrastructure::rate_limit::RateLimiter;
use crate::infrastructure::request_log::RequestLogService;

/// Application state containing the shared services
#[derive(Clone)]
pub struct AppState {
    pub api_keys: Arc<ApiKeyService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub request_logs: Arc<RequestLogService>,
}

impl AppState {
    /// Create new application state with provided services
    pub fn new(
        api_keys: Arc<ApiKeyService>,
        rate_limiter: Arc<RateLimiter>,
        request_logs: Arc<RequestLogService>,
    ) -> Self {
        Self {
            api_keys,
            rate_limiter,
            request_logs,
        }
    }
}
