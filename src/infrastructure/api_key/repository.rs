//! In-memory API key repository

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyRepository, ApiKeyStatus};
use crate::domain::DomainError;

/// In-memory implementation of `ApiKeyRepository`.
///
/// The development and test default; production uses the PostgreSQL
/// implementation.
#[derive(Debug, Default)]
pub struct InMemoryApiKeyRepository {
    keys: Arc<RwLock<HashMap<String, ApiKey>>>,
}

impl InMemoryApiKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        let keys = self.keys.read().await;
        Ok(keys.get(id.as_str()).cloned())
    }

    async fn get_by_lookup_digest(&self, digest: &str) -> Result<Option<ApiKey>, DomainError> {
        let keys = self.keys.read().await;
        Ok(keys.values().find(|k| k.lookup_digest() == digest).cloned())
    }

    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        let mut keys = self.keys.write().await;
        let id = api_key.id().as_str().to_string();

        if keys.contains_key(&id) {
            return Err(DomainError::conflict(format!(
                "API key with ID '{}' already exists",
                id
            )));
        }

        keys.insert(id, api_key.clone());
        Ok(api_key)
    }

    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError> {
        let mut keys = self.keys.write().await;
        let id = api_key.id().as_str().to_string();

        if !keys.contains_key(&id) {
            return Err(DomainError::not_found(format!("API key '{}' not found", id)));
        }

        keys.insert(id, api_key.clone());
        Ok(api_key.clone())
    }

    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        let mut keys = self.keys.write().await;
        Ok(keys.remove(id.as_str()).is_some())
    }

    async fn list(&self, status: Option<ApiKeyStatus>) -> Result<Vec<ApiKey>, DomainError> {
        let keys = self.keys.read().await;

        let mut result: Vec<ApiKey> = keys
            .values()
            .filter(|k| status.is_none_or(|s| k.status() == s))
            .cloned()
            .collect();

        result.sort_by(|a, b| a.id().as_str().cmp(b.id().as_str()));
        Ok(result)
    }

    async fn count(&self, status: Option<ApiKeyStatus>) -> Result<usize, DomainError> {
        let keys = self.keys.read().await;

        Ok(keys
            .values()
            .filter(|k| status.is_none_or(|s| k.status() == s))
            .count())
    }

    async fn record_usage(&self, id: &ApiKeyId) -> Result<(), DomainError> {
        let mut keys = self.keys.write().await;

        match keys.get_mut(id.as_str()) {
            Some(key) => {
                key.record_usage();
                Ok(())
            }
            None => Err(DomainError::not_found(format!("API key '{}' not found", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::ScopeSet;

    fn create_test_key(id: &str) -> ApiKey {
        let key_id = ApiKeyId::new(id).unwrap();
        ApiKey::new(
            key_id,
            format!("Key {}", id),
            "hash",
            format!("digest-{}", id),
            "sg_test_",
        )
        .with_scopes(ScopeSet::parse(["public.*"]).unwrap())
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryApiKeyRepository::new();
        let key = create_test_key("key-1");

        repo.create(key.clone()).await.unwrap();

        let retrieved = repo.get(key.id()).await.unwrap();
        assert!(retrieved.is_some());
    }

    #[tokio::test]
    async fn test_create_duplicate() {
        let repo = InMemoryApiKeyRepository::new();
        repo.create(create_test_key("key-1")).await.unwrap();

        let result = repo.create(create_test_key("key-1")).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_get_by_lookup_digest() {
        let repo = InMemoryApiKeyRepository::new();
        repo.create(create_test_key("key-1")).await.unwrap();
        repo.create(create_test_key("key-2")).await.unwrap();

        let found = repo.get_by_lookup_digest("digest-key-2").await.unwrap();
        assert_eq!(found.unwrap().id().as_str(), "key-2");

        let missing = repo.get_by_lookup_digest("digest-nope").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_update() {
        let repo = InMemoryApiKeyRepository::new();
        let mut key = create_test_key("key-1");

        repo.create(key.clone()).await.unwrap();

        key.set_name("Renamed");
        repo.update(&key).await.unwrap();

        let retrieved = repo.get(key.id()).await.unwrap().unwrap();
        assert_eq!(retrieved.name(), "Renamed");
    }

    #[tokio::test]
    async fn test_update_missing() {
        let repo = InMemoryApiKeyRepository::new();
        let key = create_test_key("key-1");

        let result = repo.update(&key).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryApiKeyRepository::new();
        let key = create_test_key("key-1");

        repo.create(key.clone()).await.unwrap();

        assert!(repo.delete(key.id()).await.unwrap());
        assert!(!repo.delete(key.id()).await.unwrap());
        assert!(repo.get(key.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_sorted_and_filtered() {
        let repo = InMemoryApiKeyRepository::new();

        let mut frozen = create_test_key("key-b");
        frozen.freeze();

        repo.create(create_test_key("key-c")).await.unwrap();
        repo.create(frozen).await.unwrap();
        repo.create(create_test_key("key-a")).await.unwrap();

        let all = repo.list(None).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|k| k.id().as_str()).collect();
        assert_eq!(ids, vec!["key-a", "key-b", "key-c"]);

        let active = repo.list(Some(ApiKeyStatus::Active)).await.unwrap();
        assert_eq!(active.len(), 2);

        assert_eq!(repo.count(Some(ApiKeyStatus::Frozen)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_usage() {
        let repo = InMemoryApiKeyRepository::new();
        let key = create_test_key("key-1");

        repo.create(key.clone()).await.unwrap();
        repo.record_usage(key.id()).await.unwrap();

        let retrieved = repo.get(key.id()).await.unwrap().unwrap();
        assert!(retrieved.last_used_at().is_some());
    }
}
