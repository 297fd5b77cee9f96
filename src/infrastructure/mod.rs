//! Infrastructure layer - concrete implementations of the domain
//! contracts: crypto, storage backends, the rate limiter and logging.

pub mod api_key;
pub mod logging;
pub mod rate_limit;
pub mod request_log;
