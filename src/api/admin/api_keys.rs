//! API key management admin endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::middleware::RequireApiKey;
use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyStatus, ScopeSet};
use crate::infrastructure::api_key::NewApiKey;

const SCOPE_KEYS_READ: &str = "admin.keys.read";
const SCOPE_KEYS_WRITE: &str = "admin.keys.write";

/// Request to create a new API key
#[derive(Debug, Clone, Deserialize)]
pub struct CreateApiKeyRequest {
    /// Explicit key ID; generated when omitted
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub owner_user_id: Option<String>,
}

/// Request to update an API key
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateApiKeyRequest {
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// API key response for the admin API (never includes the secret)
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub key_prefix: String,
    pub scopes: Vec<String>,
    pub owner_user_id: Option<String>,
    pub status: String,
    pub last_used_at: Option<String>,
    pub expires_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// API key response with the secret (only on creation)
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyWithSecretResponse {
    #[serde(flatten)]
    pub api_key: ApiKeyResponse,
    pub secret: String,
}

/// List API keys response
#[derive(Debug, Clone, Serialize)]
pub struct ListApiKeysResponse {
    pub api_keys: Vec<ApiKeyResponse>,
    pub total: usize,
}

/// Query parameters for listing keys
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListApiKeysQuery {
    #[serde(default)]
    pub status: Option<String>,
}

impl From<&ApiKey> for ApiKeyResponse {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id().as_str().to_string(),
            name: key.name().to_string(),
            description: key.description().map(String::from),
            key_prefix: key.key_prefix().to_string(),
            scopes: key.scopes().iter().map(|s| s.as_str().to_string()).collect(),
            owner_user_id: key.owner_user_id().map(String::from),
            status: key.status().as_str().to_string(),
            last_used_at: key.last_used_at().map(|dt| dt.to_rfc3339()),
            expires_at: key.expires_at().map(|dt| dt.to_rfc3339()),
            created_at: key.created_at().to_rfc3339(),
            updated_at: key.updated_at().to_rfc3339(),
        }
    }
}

fn parse_key_id(id: &str) -> Result<ApiKeyId, ApiError> {
    ApiKeyId::new(id).map_err(|e| ApiError::bad_request(e.to_string()).with_param("id"))
}

fn parse_scopes(scopes: &[String]) -> Result<ScopeSet, ApiError> {
    ScopeSet::parse(scopes.iter().cloned())
        .map_err(|e| ApiError::bad_request(e.to_string()).with_param("scopes"))
}

fn parse_status(status: &str) -> Result<ApiKeyStatus, ApiError> {
    ApiKeyStatus::parse(status).ok_or_else(|| {
        ApiError::bad_request(format!("Unknown API key status '{}'", status)).with_param("status")
    })
}

/// GET /admin/api-keys
pub async fn list_api_keys(
    State(state): State<AppState>,
    RequireApiKey(ctx): RequireApiKey,
    Query(query): Query<ListApiKeysQuery>,
) -> Result<Json<ListApiKeysResponse>, ApiError> {
    ctx.authorize(SCOPE_KEYS_READ)?;
    debug!(caller = %ctx.key_id(), "Admin listing API keys");

    let status = query.status.as_deref().map(parse_status).transpose()?;
    let keys = state.api_keys.list(status).await?;

    let api_keys: Vec<ApiKeyResponse> = keys.iter().map(ApiKeyResponse::from).collect();
    let total = api_keys.len();

    Ok(Json(ListApiKeysResponse { api_keys, total }))
}

/// POST /admin/api-keys
pub async fn create_api_key(
    State(state): State<AppState>,
    RequireApiKey(ctx): RequireApiKey,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<Json<ApiKeyWithSecretResponse>, ApiError> {
    ctx.authorize(SCOPE_KEYS_WRITE)?;
    debug!(caller = %ctx.key_id(), name = %request.name, "Admin creating API key");

    let id = match &request.id {
        Some(id) => parse_key_id(id)?,
        None => parse_key_id(&uuid::Uuid::new_v4().to_string())?,
    };
    let scopes = parse_scopes(&request.scopes)?;

    let mut params = NewApiKey::new(id, &request.name, scopes);
    if let Some(description) = request.description {
        params = params.with_description(description);
    }
    if let Some(expires_at) = request.expires_at {
        params = params.with_expiration(expires_at);
    }
    if let Some(owner) = request.owner_user_id {
        params = params.with_owner(owner);
    }

    let created = state.api_keys.create(params).await?;

    Ok(Json(ApiKeyWithSecretResponse {
        api_key: ApiKeyResponse::from(&created.api_key),
        secret: created.secret,
    }))
}

/// GET /admin/api-keys/{key_id}
pub async fn get_api_key(
    State(state): State<AppState>,
    RequireApiKey(ctx): RequireApiKey,
    Path(key_id): Path<String>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    ctx.authorize(SCOPE_KEYS_READ)?;
    debug!(caller = %ctx.key_id(), key_id = %key_id, "Admin getting API key");

    let id = parse_key_id(&key_id)?;
    let key = state
        .api_keys
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("API key '{}' not found", key_id)))?;

    Ok(Json(ApiKeyResponse::from(&key)))
}

/// PUT /admin/api-keys/{key_id}
pub async fn update_api_key(
    State(state): State<AppState>,
    RequireApiKey(ctx): RequireApiKey,
    Path(key_id): Path<String>,
    Json(request): Json<UpdateApiKeyRequest>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    ctx.authorize(SCOPE_KEYS_WRITE)?;
    debug!(caller = %ctx.key_id(), key_id = %key_id, "Admin updating API key");

    let id = parse_key_id(&key_id)?;

    if let Some(scopes) = &request.scopes {
        let scopes = parse_scopes(scopes)?;
        state.api_keys.update_scopes(&id, scopes).await?;
    }

    if let Some(expires_at) = request.expires_at {
        state.api_keys.update_expiration(&id, Some(expires_at)).await?;
    }

    let key = state
        .api_keys
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("API key '{}' not found", key_id)))?;

    Ok(Json(ApiKeyResponse::from(&key)))
}

/// DELETE /admin/api-keys/{key_id}
pub async fn delete_api_key(
    State(state): State<AppState>,
    RequireApiKey(ctx): RequireApiKey,
    Path(key_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    ctx.authorize(SCOPE_KEYS_WRITE)?;
    debug!(caller = %ctx.key_id(), key_id = %key_id, "Admin deleting API key");

    let id = parse_key_id(&key_id)?;
    let deleted = state.api_keys.delete(&id).await?;

    if !deleted {
        return Err(ApiError::not_found(format!("API key '{}' not found", key_id)));
    }

    Ok(Json(serde_json::json!({
        "deleted": true,
        "id": key_id
    })))
}

/// POST /admin/api-keys/{key_id}/freeze
pub async fn freeze_api_key(
    State(state): State<AppState>,
    RequireApiKey(ctx): RequireApiKey,
    Path(key_id): Path<String>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    ctx.authorize(SCOPE_KEYS_WRITE)?;
    debug!(caller = %ctx.key_id(), key_id = %key_id, "Admin freezing API key");

    let id = parse_key_id(&key_id)?;
    let key = state.api_keys.freeze(&id).await?;

    Ok(Json(ApiKeyResponse::from(&key)))
}

/// POST /admin/api-keys/{key_id}/unfreeze
pub async fn unfreeze_api_key(
    State(state): State<AppState>,
    RequireApiKey(ctx): RequireApiKey,
    Path(key_id): Path<String>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    ctx.authorize(SCOPE_KEYS_WRITE)?;
    debug!(caller = %ctx.key_id(), key_id = %key_id, "Admin unfreezing API key");

    let id = parse_key_id(&key_id)?;
    let key = state.api_keys.unfreeze(&id).await?;

    Ok(Json(ApiKeyResponse::from(&key)))
}

/// POST /admin/api-keys/{key_id}/revoke
pub async fn revoke_api_key(
    State(state): State<AppState>,
    RequireApiKey(ctx): RequireApiKey,
    Path(key_id): Path<String>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    ctx.authorize(SCOPE_KEYS_WRITE)?;
    debug!(caller = %ctx.key_id(), key_id = %key_id, "Admin revoking API key");

    let id = parse_key_id(&key_id)?;
    let key = state.api_keys.revoke(&id).await?;

    Ok(Json(ApiKeyResponse::from(&key)))
}
