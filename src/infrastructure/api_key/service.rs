//! API Key service
//!
//! High-level operations for API key management and request verification.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyRepository, ApiKeyStatus, ScopeSet};
use crate::domain::DomainError;

use super::generator::SecretGenerator;

/// Parameters for creating a new API key
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub id: ApiKeyId,
    pub name: String,
    pub description: Option<String>,
    pub scopes: ScopeSet,
    pub expires_at: Option<DateTime<Utc>>,
    pub owner_user_id: Option<String>,
}

impl NewApiKey {
    pub fn new(id: ApiKeyId, name: impl Into<String>, scopes: ScopeSet) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            scopes,
            expires_at: None,
            owner_user_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_expiration(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_owner(mut self, owner_user_id: impl Into<String>) -> Self {
        self.owner_user_id = Some(owner_user_id.into());
        self
    }
}

/// Result of creating a new API key
#[derive(Debug)]
pub struct CreatedApiKey {
    /// The API key entity (without the secret)
    pub api_key: ApiKey,
    /// The full secret (only returned once)
    pub secret: String,
}

/// API Key service
#[derive(Debug)]
pub struct ApiKeyService {
    repository: Arc<dyn ApiKeyRepository>,
    generator: SecretGenerator,
}

impl ApiKeyService {
    /// Create a new API key service
    pub fn new(repository: Arc<dyn ApiKeyRepository>) -> Self {
        Self {
            repository,
            generator: SecretGenerator::live(),
        }
    }

    /// Create with a custom secret generator
    pub fn with_generator(mut self, generator: SecretGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Create a new API key with a freshly generated secret
    pub async fn create(&self, params: NewApiKey) -> Result<CreatedApiKey, DomainError> {
        info!(key_id = %params.id, name = %params.name, "Creating API key");

        let generated = self.generator.generate()?;

        let mut api_key = ApiKey::new(
            params.id.clone(),
            &params.name,
            &generated.hash,
            &generated.lookup_digest,
            &generated.prefix,
        )
        .with_scopes(params.scopes);

        if let Some(description) = params.description {
            api_key = api_key.with_description(description);
        }
        if let Some(expires_at) = params.expires_at {
            api_key = api_key.with_expiration(expires_at);
        }
        if let Some(owner) = params.owner_user_id {
            api_key = api_key.with_owner(owner);
        }

        let created = self.repository.create(api_key).await?;

        info!(key_id = %params.id, "API key created");

        Ok(CreatedApiKey {
            api_key: created,
            secret: generated.secret,
        })
    }

    /// Create an API key with a known secret.
    ///
    /// Used for the bootstrap key provided via the environment and for
    /// deterministic keys in integration tests.
    pub async fn create_with_secret(
        &self,
        id: ApiKeyId,
        name: impl Into<String>,
        secret: &str,
        scopes: ScopeSet,
    ) -> Result<CreatedApiKey, DomainError> {
        let name = name.into();
        info!(key_id = %id, name = %name, "Creating API key with known secret");

        let generated = self.generator.from_secret(secret)?;

        let api_key = ApiKey::new(
            id.clone(),
            &name,
            &generated.hash,
            &generated.lookup_digest,
            &generated.prefix,
        )
        .with_scopes(scopes);

        let created = self.repository.create(api_key).await?;

        Ok(CreatedApiKey {
            api_key: created,
            secret: generated.secret,
        })
    }

    /// Verify a presented secret and resolve the key it belongs to.
    ///
    /// Returns `None` for every failure: missing record, wrong secret,
    /// revoked/frozen/expired key, or a storage error (which is logged and
    /// treated as unauthenticated so callers can fall back to other auth).
    /// The caller learns nothing about which case occurred.
    pub async fn verify(&self, presented: &str) -> Option<ApiKey> {
        let digest = SecretGenerator::lookup_digest(presented);

        let candidate = match self.repository.get_by_lookup_digest(&digest).await {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(error = %e, "API key lookup failed; treating request as unauthenticated");
                None
            }
        };

        let Some(key) = candidate else {
            // Equalize timing with the verified path.
            SecretGenerator::verify_dummy(presented);
            return None;
        };

        if !SecretGenerator::verify_secret(presented, key.secret_hash()) {
            debug!(key_id = %key.id(), "API key secret verification failed");
            return None;
        }

        if !key.is_valid() {
            debug!(key_id = %key.id(), status = ?key.status(), "API key is not usable");
            return None;
        }

        // Fire-and-forget usage stamp; never blocks or fails the request.
        let repository = self.repository.clone();
        let key_id = key.id().clone();
        tokio::spawn(async move {
            if let Err(e) = repository.record_usage(&key_id).await {
                warn!(key_id = %key_id, error = %e, "Failed to record API key usage");
            }
        });

        Some(key)
    }

    /// Get an API key by ID
    pub async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        self.repository.get(id).await
    }

    /// List all API keys (optionally filtered by status)
    pub async fn list(&self, status: Option<ApiKeyStatus>) -> Result<Vec<ApiKey>, DomainError> {
        self.repository.list(status).await
    }

    /// Count API keys
    pub async fn count(&self, status: Option<ApiKeyStatus>) -> Result<usize, DomainError> {
        self.repository.count(status).await
    }

    /// Check whether an API key ID exists
    pub async fn exists(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        self.repository.exists(id).await
    }

    /// Replace the scopes granted to a key
    pub async fn update_scopes(
        &self,
        id: &ApiKeyId,
        scopes: ScopeSet,
    ) -> Result<ApiKey, DomainError> {
        info!(key_id = %id, "Updating API key scopes");

        let mut key = self.require(id).await?;
        key.set_scopes(scopes);
        self.repository.update(&key).await
    }

    /// Update a key's expiration
    pub async fn update_expiration(
        &self,
        id: &ApiKeyId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ApiKey, DomainError> {
        info!(key_id = %id, "Updating API key expiration");

        let mut key = self.require(id).await?;
        key.set_expiration(expires_at);
        self.repository.update(&key).await
    }

    /// Freeze an API key
    pub async fn freeze(&self, id: &ApiKeyId) -> Result<ApiKey, DomainError> {
        info!(key_id = %id, "Freezing API key");

        let mut key = self.require(id).await?;

        if key.status() != ApiKeyStatus::Active {
            return Err(DomainError::validation("Only active keys can be frozen"));
        }

        key.freeze();
        self.repository.update(&key).await
    }

    /// Thaw a frozen API key
    pub async fn unfreeze(&self, id: &ApiKeyId) -> Result<ApiKey, DomainError> {
        info!(key_id = %id, "Unfreezing API key");

        let mut key = self.require(id).await?;

        if key.status() != ApiKeyStatus::Frozen {
            return Err(DomainError::validation("Only frozen keys can be unfrozen"));
        }

        key.unfreeze();
        self.repository.update(&key).await
    }

    /// Revoke an API key. Revocation is terminal; the row is kept so
    /// request-log references stay resolvable.
    pub async fn revoke(&self, id: &ApiKeyId) -> Result<ApiKey, DomainError> {
        info!(key_id = %id, "Revoking API key");

        let mut key = self.require(id).await?;
        key.revoke();
        self.repository.update(&key).await
    }

    /// Hard-delete an API key
    pub async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        info!(key_id = %id, "Deleting API key");
        self.repository.delete(id).await
    }

    async fn require(&self, id: &ApiKeyId) -> Result<ApiKey, DomainError> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("API key '{}' not found", id)))
    }
}
