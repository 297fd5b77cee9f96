//! API middleware components

pub mod auth;
pub mod rate_limit;
pub mod request_log;
pub mod security;

pub use auth::{bearer_token, resolve_identity, ApiKeyContext, OptionalApiKey, RequireApiKey};
pub use rate_limit::{admin_rate_limit, caller_identity, client_ip, public_rate_limit};
pub use request_log::request_log_middleware;
pub use security::security_headers_middleware;
