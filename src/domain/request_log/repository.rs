//! Request log repository trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use super::entity::RequestLogEntry;
use crate::domain::api_key::ApiKeyId;
use crate::domain::DomainError;

/// Filter for listing request log entries
#[derive(Debug, Clone, Default)]
pub struct RequestLogFilter {
    /// Only entries attributed to this API key
    pub api_key_id: Option<ApiKeyId>,
    /// Only entries with a server-error status
    pub server_errors_only: bool,
}

/// Repository trait for the request audit log.
///
/// Entries are append-only; the only destructive operation is the
/// retention sweep.
#[async_trait]
pub trait RequestLogRepository: Send + Sync + Debug {
    /// Persist one entry
    async fn record(&self, entry: RequestLogEntry) -> Result<(), DomainError>;

    /// List the most recent entries matching the filter, newest first
    async fn list(
        &self,
        filter: &RequestLogFilter,
        limit: usize,
    ) -> Result<Vec<RequestLogEntry>, DomainError>;

    /// Count all stored entries
    async fn count(&self) -> Result<usize, DomainError>;

    /// Delete entries older than the cutoff; returns how many were removed
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError>;
}
