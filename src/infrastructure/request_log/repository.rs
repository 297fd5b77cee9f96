//! In-memory request log repository

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::request_log::{RequestLogEntry, RequestLogFilter, RequestLogRepository};
use crate::domain::DomainError;

/// In-memory implementation of `RequestLogRepository`.
///
/// Entries are held newest-last; listing reverses so callers see newest
/// first like the PostgreSQL implementation.
#[derive(Debug, Default)]
pub struct InMemoryRequestLogRepository {
    entries: Arc<RwLock<Vec<RequestLogEntry>>>,
}

impl InMemoryRequestLogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(entry: &RequestLogEntry, filter: &RequestLogFilter) -> bool {
    if let Some(key_id) = &filter.api_key_id {
        if entry.api_key_id() != Some(key_id) {
            return false;
        }
    }

    if filter.server_errors_only && !entry.is_server_error() {
        return false;
    }

    true
}

#[async_trait]
impl RequestLogRepository for InMemoryRequestLogRepository {
    async fn record(&self, entry: RequestLogEntry) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        Ok(())
    }

    async fn list(
        &self,
        filter: &RequestLogFilter,
        limit: usize,
    ) -> Result<Vec<RequestLogEntry>, DomainError> {
        let entries = self.entries.read().await;

        Ok(entries
            .iter()
            .rev()
            .filter(|entry| matches(entry, filter))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.entries.read().await.len())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|entry| entry.created_at() >= cutoff);
        Ok((before - entries.len()) as u64)
    }
}
