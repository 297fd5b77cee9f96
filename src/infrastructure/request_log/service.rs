//! Request log service
//!
//! Owns the audit-log repository: detached emission for the logging
//! wrapper, plus the query and retention operations used by the admin
//! API.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::request_log::{RequestLogEntry, RequestLogFilter, RequestLogRepository};
use crate::domain::DomainError;

/// Service over the request audit log
#[derive(Debug)]
pub struct RequestLogService {
    repository: Arc<dyn RequestLogRepository>,
}

impl RequestLogService {
    pub fn new(repository: Arc<dyn RequestLogRepository>) -> Self {
        Self { repository }
    }

    /// Emit one entry without blocking the caller.
    ///
    /// The write runs on a detached task: the response path never waits
    /// for it, cancellation of the request does not cancel it, and a
    /// failure is logged locally and swallowed. There are no retries.
    pub fn emit(&self, entry: RequestLogEntry) {
        let repository = self.repository.clone();

        tokio::spawn(async move {
            if let Err(e) = repository.record(entry).await {
                warn!(error = %e, "Failed to persist request log entry");
            }
        });
    }

    /// List the most recent entries, newest first
    pub async fn list(
        &self,
        filter: &RequestLogFilter,
        limit: usize,
    ) -> Result<Vec<RequestLogEntry>, DomainError> {
        self.repository.list(filter, limit).await
    }

    /// Count all stored entries
    pub async fn count(&self) -> Result<usize, DomainError> {
        self.repository.count().await
    }

    /// Delete entries older than the cutoff; returns how many were removed
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        self.repository.delete_older_than(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::request_log::InMemoryRequestLogRepository;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn entry(endpoint: &str) -> RequestLogEntry {
        RequestLogEntry::new(endpoint, "GET", 200, 3, "127.0.0.1")
    }

    async fn wait_for_count(service: &RequestLogService, expected: usize) {
        for _ in 0..100 {
            if service.count().await.unwrap() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("log entries were not persisted in time");
    }

    #[tokio::test]
    async fn test_emit_persists_entry() {
        let service = RequestLogService::new(Arc::new(InMemoryRequestLogRepository::new()));

        service.emit(entry("/health"));
        wait_for_count(&service, 1).await;

        let listed = service
            .list(&RequestLogFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(listed[0].endpoint(), "/health");
    }

    /// A sink that parks until released, for asserting non-blocking
    /// emission.
    #[derive(Debug)]
    struct SlowRepository {
        release: Arc<tokio::sync::Notify>,
        recorded: AtomicUsize,
    }

    #[async_trait]
    impl RequestLogRepository for SlowRepository {
        async fn record(&self, _entry: RequestLogEntry) -> Result<(), DomainError> {
            self.release.notified().await;
            self.recorded.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn list(
            &self,
            _filter: &RequestLogFilter,
            _limit: usize,
        ) -> Result<Vec<RequestLogEntry>, DomainError> {
            Ok(Vec::new())
        }

        async fn count(&self) -> Result<usize, DomainError> {
            Ok(self.recorded.load(Ordering::SeqCst))
        }

        async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_emit_does_not_block_on_a_slow_sink() {
        let release = Arc::new(tokio::sync::Notify::new());
        let repository = Arc::new(SlowRepository {
            release: release.clone(),
            recorded: AtomicUsize::new(0),
        });
        let service = RequestLogService::new(repository.clone());

        // Returns immediately even though the sink is parked.
        service.emit(entry("/slow"));
        assert_eq!(repository.recorded.load(Ordering::SeqCst), 0);

        // Once released, the detached write completes on its own.
        release.notify_one();
        for _ in 0..100 {
            if repository.recorded.load(Ordering::SeqCst) == 1 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("detached write never completed");
    }

    #[derive(Debug)]
    struct FailingRepository;

    #[async_trait]
    impl RequestLogRepository for FailingRepository {
        async fn record(&self, _entry: RequestLogEntry) -> Result<(), DomainError> {
            Err(DomainError::storage("sink is down"))
        }

        async fn list(
            &self,
            _filter: &RequestLogFilter,
            _limit: usize,
        ) -> Result<Vec<RequestLogEntry>, DomainError> {
            Ok(Vec::new())
        }

        async fn count(&self) -> Result<usize, DomainError> {
            Ok(0)
        }

        async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_emit_swallows_sink_failures() {
        let service = RequestLogService::new(Arc::new(FailingRepository));

        // Must not panic or surface the failure anywhere.
        service.emit(entry("/doomed"));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let service = RequestLogService::new(Arc::new(InMemoryRequestLogRepository::new()));

        service.emit(entry("/a"));
        service.emit(entry("/b"));
        wait_for_count(&service, 2).await;

        let removed = service
            .purge_older_than(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(service.count().await.unwrap(), 0);
    }
}
