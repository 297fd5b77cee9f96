//! API Key repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{ApiKey, ApiKeyId, ApiKeyStatus};
use crate::domain::DomainError;

/// Repository trait for API key storage
#[async_trait]
pub trait ApiKeyRepository: Send + Sync + Debug {
    /// Get an API key by its ID
    async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError>;

    /// Get an API key by the deterministic digest of its secret.
    ///
    /// This is the indexed half of verification; callers must still verify
    /// the presented secret against the stored salted hash.
    async fn get_by_lookup_digest(&self, digest: &str) -> Result<Option<ApiKey>, DomainError>;

    /// Create a new API key
    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError>;

    /// Update an existing API key
    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError>;

    /// Delete an API key
    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError>;

    /// List all API keys (optionally filtered by status)
    async fn list(&self, status: Option<ApiKeyStatus>) -> Result<Vec<ApiKey>, DomainError>;

    /// Count API keys (optionally filtered by status)
    async fn count(&self, status: Option<ApiKeyStatus>) -> Result<usize, DomainError>;

    /// Check if an API key ID exists
    async fn exists(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        Ok(self.get(id).await?.is_some())
    }

    /// Stamp `last_used_at` for a key. Best-effort from callers; a failure
    /// here must never fail the request being verified.
    async fn record_usage(&self, id: &ApiKeyId) -> Result<(), DomainError>;
}
