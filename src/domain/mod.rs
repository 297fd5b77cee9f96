//! Domain layer - Core business logic and entities

pub mod api_key;
pub mod error;
pub mod rate_limit;
pub mod request_log;

pub use api_key::{
    ApiKey, ApiKeyId, ApiKeyRecord, ApiKeyRepository, ApiKeyStatus, ApiKeyValidationError, Scope,
    ScopeParseError, ScopePolicy, ScopeSet,
};
pub use error::DomainError;
pub use rate_limit::{CallerIdentity, LimiterClass, RateLimitDecision, RateLimitQuota};
pub use request_log::{RequestLogEntry, RequestLogFilter, RequestLogRecord, RequestLogRepository};
