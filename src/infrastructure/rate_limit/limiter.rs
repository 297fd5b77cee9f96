//! Fixed-window rate limiter

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::domain::rate_limit::{
    CallerIdentity, LimiterClass, RateLimitDecision, RateLimitQuota,
};

use super::store::CounterStore;

/// Quotas for every limiter class
#[derive(Debug, Clone, Copy)]
pub struct RateLimitClasses {
    pub admin: RateLimitQuota,
    pub api_key: RateLimitQuota,
    pub public: RateLimitQuota,
}

impl RateLimitClasses {
    pub fn quota(&self, class: LimiterClass) -> RateLimitQuota {
        match class {
            LimiterClass::Admin => self.admin,
            LimiterClass::ApiKey => self.api_key,
            LimiterClass::Public => self.public,
        }
    }
}

impl Default for RateLimitClasses {
    fn default() -> Self {
        Self {
            admin: RateLimitQuota::new(30, 60),
            api_key: RateLimitQuota::new(100, 60),
            public: RateLimitQuota::new(60, 60),
        }
    }
}

/// Fixed-window rate limiter over an injected counter store.
///
/// Counters are keyed by (class, identity, window index); the store's
/// atomic increment makes the increment-and-compare safe under concurrent
/// requests from the same identity.
#[derive(Debug)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    classes: RateLimitClasses,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, classes: RateLimitClasses) -> Self {
        Self { store, classes }
    }

    /// The quota configured for a class
    pub fn quota(&self, class: LimiterClass) -> RateLimitQuota {
        self.classes.quota(class)
    }

    /// Check (and count) one request from `identity` against its class
    /// quota.
    ///
    /// A store failure degrades to allow with a warning: the limiter is a
    /// quota signal, not a security boundary, and must never turn into a
    /// server error.
    pub async fn check(
        &self,
        identity: &CallerIdentity,
        class: LimiterClass,
    ) -> RateLimitDecision {
        let now_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        self.check_at(identity, class, now_secs).await
    }

    async fn check_at(
        &self,
        identity: &CallerIdentity,
        class: LimiterClass,
        now_secs: u64,
    ) -> RateLimitDecision {
        let quota = self.classes.quota(class);
        let window_secs = quota.window_secs.max(1);
        let window_index = now_secs / window_secs;

        let key = format!("ratelimit:{}:{}:{}", class, identity, window_index);

        // Counters must survive until their window closes even when first
        // touched late in the window.
        let ttl = Duration::from_secs(window_secs * 2);

        match self.store.increment(&key, ttl).await {
            Ok(count) if count <= quota.max_requests => RateLimitDecision::Allowed {
                remaining: quota.max_requests - count,
            },
            Ok(_) => RateLimitDecision::Rejected {
                retry_after: Duration::from_secs(window_secs - (now_secs % window_secs)),
            },
            Err(e) => {
                warn!(
                    class = %class,
                    identity = %identity,
                    error = %e,
                    "Counter store unavailable; allowing request"
                );
                RateLimitDecision::Allowed { remaining: 0 }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::ApiKeyId;
    use crate::infrastructure::rate_limit::InMemoryCounterStore;
    use async_trait::async_trait;
    use crate::domain::DomainError;

    fn limiter_with(classes: RateLimitClasses) -> RateLimiter {
        RateLimiter::new(Arc::new(InMemoryCounterStore::new()), classes)
    }

    fn small_public_quota() -> RateLimitClasses {
        RateLimitClasses {
            public: RateLimitQuota::new(3, 60),
            ..RateLimitClasses::default()
        }
    }

    fn ip(addr: &str) -> CallerIdentity {
        CallerIdentity::Ip(addr.to_string())
    }

    #[tokio::test]
    async fn test_allows_up_to_max_then_rejects() {
        let limiter = limiter_with(small_public_quota());
        let identity = ip("203.0.113.7");
        let now = 1_700_000_000;

        for expected_remaining in [2, 1, 0] {
            let decision = limiter
                .check_at(&identity, LimiterClass::Public, now)
                .await;
            assert_eq!(
                decision,
                RateLimitDecision::Allowed {
                    remaining: expected_remaining
                }
            );
        }

        let decision = limiter
            .check_at(&identity, LimiterClass::Public, now)
            .await;
        assert!(!decision.is_allowed());

        let retry_after = decision.retry_after().unwrap();
        assert!(retry_after.as_secs() > 0);
        assert!(retry_after.as_secs() <= 60);
    }

    #[tokio::test]
    async fn test_other_identity_unaffected() {
        let limiter = limiter_with(small_public_quota());
        let now = 1_700_000_000;
        let exhausted = ip("203.0.113.7");
        let other = ip("198.51.100.4");

        for _ in 0..4 {
            limiter.check_at(&exhausted, LimiterClass::Public, now).await;
        }

        assert!(!limiter
            .check_at(&exhausted, LimiterClass::Public, now)
            .await
            .is_allowed());
        assert!(limiter
            .check_at(&other, LimiterClass::Public, now)
            .await
            .is_allowed());
    }

    #[tokio::test]
    async fn test_window_rollover_resets_counter() {
        let limiter = limiter_with(small_public_quota());
        let identity = ip("203.0.113.7");
        let now = 1_700_000_000;

        for _ in 0..3 {
            assert!(limiter
                .check_at(&identity, LimiterClass::Public, now)
                .await
                .is_allowed());
        }
        assert!(!limiter
            .check_at(&identity, LimiterClass::Public, now + 1)
            .await
            .is_allowed());

        // Next fixed window: the counter starts fresh.
        assert!(limiter
            .check_at(&identity, LimiterClass::Public, now + 60)
            .await
            .is_allowed());
    }

    #[tokio::test]
    async fn test_classes_count_independently() {
        let classes = RateLimitClasses {
            admin: RateLimitQuota::new(1, 60),
            ..RateLimitClasses::default()
        };
        let limiter = limiter_with(classes);
        let identity = CallerIdentity::Key(ApiKeyId::new("ci-bot").unwrap());
        let now = 1_700_000_000;

        assert!(limiter
            .check_at(&identity, LimiterClass::Admin, now)
            .await
            .is_allowed());
        assert!(!limiter
            .check_at(&identity, LimiterClass::Admin, now)
            .await
            .is_allowed());

        // The same identity still has quota in the api_key class.
        assert!(limiter
            .check_at(&identity, LimiterClass::ApiKey, now)
            .await
            .is_allowed());
    }

    #[tokio::test]
    async fn test_retry_after_tracks_window_remainder() {
        let limiter = limiter_with(small_public_quota());
        let identity = ip("203.0.113.7");
        // 45 seconds into a 60-second window.
        let now = 1_700_000_000 - (1_700_000_000 % 60) + 45;

        for _ in 0..3 {
            limiter.check_at(&identity, LimiterClass::Public, now).await;
        }

        let decision = limiter
            .check_at(&identity, LimiterClass::Public, now)
            .await;
        assert_eq!(decision.retry_after(), Some(Duration::from_secs(15)));
    }

    #[derive(Debug)]
    struct FailingStore;

    #[async_trait]
    impl CounterStore for FailingStore {
        async fn increment(&self, _key: &str, _ttl: Duration) -> Result<u64, DomainError> {
            Err(DomainError::storage("store is down"))
        }
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_allow() {
        let limiter = RateLimiter::new(Arc::new(FailingStore), RateLimitClasses::default());
        let decision = limiter.check(&ip("203.0.113.7"), LimiterClass::Public).await;

        assert!(decision.is_allowed());
    }
}
