//! Rate limiting infrastructure
//!
//! Fixed-window limiter plus the pluggable counter stores behind it.

mod limiter;
mod store;

pub use limiter::{RateLimitClasses, RateLimiter};
pub use store::{CounterStore, InMemoryCounterStore, RedisCounterStore};
