//! Rate limiting domain types
//!
//! Quotas are fixed-window: each limiter class allows `max_requests` per
//! `window` for a given caller identity, and the counter resets when the
//! window rolls over.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::api_key::ApiKeyId;

/// Limiter classes with independently configured quotas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimiterClass {
    /// Admin API endpoints
    Admin,
    /// Public API endpoints called with an API key
    ApiKey,
    /// Public API endpoints called without a key (IP-attributed)
    Public,
}

impl LimiterClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::ApiKey => "api_key",
            Self::Public => "public",
        }
    }
}

impl std::fmt::Display for LimiterClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Quota for one limiter class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitQuota {
    /// Maximum requests allowed within one window
    pub max_requests: u64,
    /// Fixed window length in seconds
    pub window_secs: u64,
}

impl RateLimitQuota {
    pub fn new(max_requests: u64, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// The entity a request is attributed to for rate limiting and logging
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallerIdentity {
    /// A verified API key
    Key(ApiKeyId),
    /// The source IP, when no key was presented
    Ip(String),
}

impl CallerIdentity {
    /// The key id, when this identity is a verified key
    pub fn key_id(&self) -> Option<&ApiKeyId> {
        match self {
            Self::Key(id) => Some(id),
            Self::Ip(_) => None,
        }
    }
}

impl std::fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key(id) => write!(f, "key:{}", id),
            Self::Ip(ip) => write!(f, "ip:{}", ip),
        }
    }
}

/// Outcome of a rate limit check
///
/// Rejection is a normal, expected outcome surfaced to the caller as a
/// distinguishable signal, not a failure of the limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request is allowed; `remaining` requests are left in this window
    Allowed { remaining: u64 },
    /// Request exceeds the quota; retry once the window rolls over
    Rejected { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Allowed { .. } => None,
            Self::Rejected { retry_after } => Some(*retry_after),
        }
    }
}
