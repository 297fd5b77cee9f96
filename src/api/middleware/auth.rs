//! API key identity resolution and authorization
//!
//! A single middleware resolves the bearer token once per request and
//! places the verified identity in the request extensions; the rate
//! limiter, the request-logging wrapper and the route extractors all read
//! from there.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::api_key::{ApiKey, ApiKeyId, ScopePolicy};

const BEARER_PREFIX: &str = "Bearer ";

/// A verified API key attached to the current request
#[derive(Debug, Clone)]
pub struct ApiKeyContext {
    key: ApiKey,
}

impl ApiKeyContext {
    pub fn new(key: ApiKey) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &ApiKey {
        &self.key
    }

    pub fn key_id(&self) -> &ApiKeyId {
        self.key.id()
    }

    /// Authorize the given scope under the gateway's scope policy.
    ///
    /// An insufficient scope is a permission failure, distinct from the
    /// authentication failure of presenting no usable key at all.
    pub fn authorize(&self, scope: &str) -> Result<(), ApiError> {
        if ScopePolicy::authorizes(self.key.scopes(), scope) {
            return Ok(());
        }

        debug!(key_id = %self.key.id(), scope = scope, "Scope denied");
        Err(ApiError::forbidden(format!(
            "API key does not grant the '{}' scope",
            scope
        )))
    }
}

/// Extract the bearer token from an Authorization header.
///
/// Absence of the header, a non-bearer scheme or an empty token all mean
/// "no API key presented" - never an error.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Middleware resolving the caller's API key identity.
///
/// Verification failures of any kind leave the request unauthenticated;
/// downstream layers decide whether that is acceptable for their route.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        if let Some(key) = state.api_keys.verify(&token).await {
            debug!(key_id = %key.id(), "API key identity resolved");
            request.extensions_mut().insert(ApiKeyContext::new(key));
        }
    }

    next.run(request).await
}

/// Extractor that requires a verified API key on the request.
///
/// The rejection message deliberately does not distinguish a missing key
/// from an invalid, frozen, revoked or expired one.
#[derive(Debug, Clone)]
pub struct RequireApiKey(pub ApiKeyContext);

impl FromRequestParts<AppState> for RequireApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ApiKeyContext>()
            .cloned()
            .map(RequireApiKey)
            .ok_or_else(|| ApiError::unauthorized("Invalid or missing API key"))
    }
}

/// Extractor for routes where an API key is optional
#[derive(Debug, Clone)]
pub struct OptionalApiKey(pub Option<ApiKeyContext>);

impl FromRequestParts<AppState> for OptionalApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalApiKey(parts.extensions.get::<ApiKeyContext>().cloned()))
    }
}
