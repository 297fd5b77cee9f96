//! API Key entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::permission::ScopeSet;
use super::validation::{validate_api_key_id, ApiKeyValidationError};

/// API Key identifier - alphanumeric + hyphens, max 50 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKeyId(String);

impl ApiKeyId {
    /// Create a new ApiKeyId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, ApiKeyValidationError> {
        let id = id.into();
        validate_api_key_id(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ApiKeyId {
    type Error = ApiKeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApiKeyId> for String {
    fn from(id: ApiKeyId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ApiKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of an API key
///
/// Frozen keys can be thawed; revocation is terminal. Retired keys stay in
/// storage under these flags so request-log rows keep resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyStatus {
    /// Key is active and can be used
    #[default]
    Active,
    /// Key is temporarily frozen
    Frozen,
    /// Key has been revoked and can never be used again
    Revoked,
}

impl ApiKeyStatus {
    /// Check if the key is usable
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Frozen => "frozen",
            Self::Revoked => "revoked",
        }
    }

    /// Parse a stored status string
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "frozen" => Some(Self::Frozen),
            "revoked" => Some(Self::Revoked),
            _ => None,
        }
    }
}

/// API Key entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    /// Unique identifier for the key
    id: ApiKeyId,
    /// Display name for the key
    name: String,
    /// Description of the key's purpose
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// Salted Argon2 hash of the secret (PHC string).
    /// Stored in the database but never exposed in API responses
    /// (separate DTOs are used).
    secret_hash: String,
    /// Deterministic digest of the secret, used only for indexed lookup.
    /// Authorization always re-verifies against `secret_hash`.
    lookup_digest: String,
    /// Non-sensitive key prefix shown to operators for identification
    key_prefix: String,
    /// Scopes granted to this key
    scopes: ScopeSet,
    /// User that owns this key, when it was created on behalf of one
    #[serde(skip_serializing_if = "Option::is_none")]
    owner_user_id: Option<String>,
    /// Current status of the key
    status: ApiKeyStatus,
    /// Expiration timestamp (None = never expires)
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    /// Last time the key was successfully verified (best-effort)
    #[serde(skip_serializing_if = "Option::is_none")]
    last_used_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Last update timestamp
    updated_at: DateTime<Utc>,
}

impl ApiKey {
    /// Create a new API key
    pub fn new(
        id: ApiKeyId,
        name: impl Into<String>,
        secret_hash: impl Into<String>,
        lookup_digest: impl Into<String>,
        key_prefix: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            name: name.into(),
            description: None,
            secret_hash: secret_hash.into(),
            lookup_digest: lookup_digest.into(),
            key_prefix: key_prefix.into(),
            scopes: ScopeSet::new(),
            owner_user_id: None,
            status: ApiKeyStatus::Active,
            expires_at: None,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set granted scopes
    pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
        self.scopes = scopes;
        self
    }

    /// Set the owning user
    pub fn with_owner(mut self, owner_user_id: impl Into<String>) -> Self {
        self.owner_user_id = Some(owner_user_id.into());
        self
    }

    /// Set expiration
    pub fn with_expiration(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    // Getters

    pub fn id(&self) -> &ApiKeyId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn secret_hash(&self) -> &str {
        &self.secret_hash
    }

    pub fn lookup_digest(&self) -> &str {
        &self.lookup_digest
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    pub fn owner_user_id(&self) -> Option<&str> {
        self.owner_user_id.as_deref()
    }

    pub fn status(&self) -> ApiKeyStatus {
        self.status
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // Status checks

    /// Check if the key may authorize requests right now.
    ///
    /// A revoked, frozen or expired key must never authorize a request,
    /// regardless of its scopes.
    pub fn is_valid(&self) -> bool {
        self.status.is_usable() && !self.is_expired()
    }

    /// Check if the key has expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }

    // Mutators

    /// Update the name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    /// Update the description
    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.touch();
    }

    /// Replace the granted scopes
    pub fn set_scopes(&mut self, scopes: ScopeSet) {
        self.scopes = scopes;
        self.touch();
    }

    /// Update expiration
    pub fn set_expiration(&mut self, expires_at: Option<DateTime<Utc>>) {
        self.expires_at = expires_at;
        self.touch();
    }

    /// Record a successful verification
    pub fn record_usage(&mut self) {
        self.last_used_at = Some(Utc::now());
    }

    /// Freeze the key
    pub fn freeze(&mut self) {
        if self.status == ApiKeyStatus::Active {
            self.status = ApiKeyStatus::Frozen;
            self.touch();
        }
    }

    /// Thaw a frozen key
    pub fn unfreeze(&mut self) {
        if self.status == ApiKeyStatus::Frozen {
            self.status = ApiKeyStatus::Active;
            self.touch();
        }
    }

    /// Revoke the key. Revocation is terminal.
    pub fn revoke(&mut self) {
        self.status = ApiKeyStatus::Revoked;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Raw field set used by repositories to rehydrate a stored key
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub id: ApiKeyId,
    pub name: String,
    pub description: Option<String>,
    pub secret_hash: String,
    pub lookup_digest: String,
    pub key_prefix: String,
    pub scopes: ScopeSet,
    pub owner_user_id: Option<String>,
    pub status: ApiKeyStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ApiKeyRecord> for ApiKey {
    fn from(record: ApiKeyRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            secret_hash: record.secret_hash,
            lookup_digest: record.lookup_digest,
            key_prefix: record.key_prefix,
            scopes: record.scopes,
            owner_user_id: record.owner_user_id,
            status: record.status,
            expires_at: record.expires_at,
            last_used_at: record.last_used_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::ScopeSet;

    fn create_test_api_key(id: &str, name: &str) -> ApiKey {
        let key_id = ApiKeyId::new(id).unwrap();
        ApiKey::new(key_id, name, "hashed-secret", "digest", "sg_test_abc12345")
    }

    #[test]
    fn test_api_key_id_valid() {
        let id = ApiKeyId::new("my-api-key-1").unwrap();
        assert_eq!(id.as_str(), "my-api-key-1");
    }

    #[test]
    fn test_api_key_id_invalid() {
        assert!(ApiKeyId::new("").is_err());
        assert!(ApiKeyId::new("my_key").is_err());
        assert!(ApiKeyId::new("-key").is_err());
    }

    #[test]
    fn test_api_key_status() {
        assert!(ApiKeyStatus::Active.is_usable());
        assert!(!ApiKeyStatus::Frozen.is_usable());
        assert!(!ApiKeyStatus::Revoked.is_usable());
    }

    #[test]
    fn test_api_key_status_roundtrip() {
        for status in [
            ApiKeyStatus::Active,
            ApiKeyStatus::Frozen,
            ApiKeyStatus::Revoked,
        ] {
            assert_eq!(ApiKeyStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ApiKeyStatus::parse("suspended"), None);
    }

    #[test]
    fn test_api_key_creation() {
        let key = create_test_api_key("ci-bot", "CI Bot")
            .with_description("Continuous integration key")
            .with_scopes(ScopeSet::parse(["public.*"]).unwrap());

        assert_eq!(key.name(), "CI Bot");
        assert_eq!(key.description(), Some("Continuous integration key"));
        assert_eq!(key.key_prefix(), "sg_test_abc12345");
        assert!(key.is_valid());
        assert!(!key.is_expired());
        assert!(key.scopes().matches("public.watch.read"));
    }

    #[test]
    fn test_api_key_expiration() {
        let past = Utc::now() - chrono::Duration::hours(1);
        let key = create_test_api_key("ci-bot", "CI Bot").with_expiration(past);

        assert!(key.is_expired());
        assert!(!key.is_valid());
    }

    #[test]
    fn test_api_key_future_expiration_still_valid() {
        let future = Utc::now() + chrono::Duration::hours(1);
        let key = create_test_api_key("ci-bot", "CI Bot").with_expiration(future);

        assert!(!key.is_expired());
        assert!(key.is_valid());
    }

    #[test]
    fn test_api_key_status_changes() {
        let mut key = create_test_api_key("ci-bot", "CI Bot");

        assert!(key.is_valid());

        key.freeze();
        assert!(!key.is_valid());
        assert_eq!(key.status(), ApiKeyStatus::Frozen);

        key.unfreeze();
        assert!(key.is_valid());
        assert_eq!(key.status(), ApiKeyStatus::Active);

        key.revoke();
        assert!(!key.is_valid());
        assert_eq!(key.status(), ApiKeyStatus::Revoked);

        // A revoked key cannot be thawed back to life
        key.unfreeze();
        assert_eq!(key.status(), ApiKeyStatus::Revoked);
    }

    #[test]
    fn test_freeze_only_applies_to_active_keys() {
        let mut key = create_test_api_key("ci-bot", "CI Bot");
        key.revoke();
        key.freeze();
        assert_eq!(key.status(), ApiKeyStatus::Revoked);
    }

    #[test]
    fn test_api_key_record_usage() {
        let mut key = create_test_api_key("ci-bot", "CI Bot");

        assert!(key.last_used_at().is_none());

        key.record_usage();
        assert!(key.last_used_at().is_some());
    }

    #[test]
    fn test_api_key_owner() {
        let key = create_test_api_key("personal", "Personal key").with_owner("user-42");
        assert_eq!(key.owner_user_id(), Some("user-42"));
    }

    #[test]
    fn test_record_roundtrip() {
        let key = create_test_api_key("ci-bot", "CI Bot")
            .with_scopes(ScopeSet::parse(["admin.*"]).unwrap());

        let record = ApiKeyRecord {
            id: key.id().clone(),
            name: key.name().to_string(),
            description: key.description().map(String::from),
            secret_hash: key.secret_hash().to_string(),
            lookup_digest: key.lookup_digest().to_string(),
            key_prefix: key.key_prefix().to_string(),
            scopes: key.scopes().clone(),
            owner_user_id: None,
            status: key.status(),
            expires_at: key.expires_at(),
            last_used_at: key.last_used_at(),
            created_at: key.created_at(),
            updated_at: key.updated_at(),
        };

        let restored = ApiKey::from(record);
        assert_eq!(restored.id(), key.id());
        assert_eq!(restored.secret_hash(), key.secret_hash());
        assert!(restored.scopes().matches("admin.keys.read"));
    }
}
