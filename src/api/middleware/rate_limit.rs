//! Per-class rate limiting middleware

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::rate_limit::{CallerIdentity, LimiterClass, RateLimitDecision};

use super::auth::ApiKeyContext;

/// Resolve the source IP of a request.
///
/// Prefers the first X-Forwarded-For hop (reverse-proxy deployments),
/// then the peer socket address.
pub fn client_ip(request: &Request<Body>) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// The identity a request is attributed to: the verified key when one was
/// resolved, else the source IP.
pub fn caller_identity(request: &Request<Body>) -> CallerIdentity {
    if let Some(ctx) = request.extensions().get::<ApiKeyContext>() {
        return CallerIdentity::Key(ctx.key_id().clone());
    }

    CallerIdentity::Ip(client_ip(request))
}

async fn enforce(
    state: AppState,
    class: LimiterClass,
    request: Request<Body>,
    next: Next,
) -> Response {
    let identity = caller_identity(&request);

    match state.rate_limiter.check(&identity, class).await {
        RateLimitDecision::Allowed { .. } => next.run(request).await,
        RateLimitDecision::Rejected { retry_after } => {
            debug!(
                class = %class,
                identity = %identity,
                retry_after_secs = retry_after.as_secs(),
                "Request rate limited"
            );

            ApiError::rate_limited("Rate limit exceeded; retry later")
                .with_retry_after(retry_after.as_secs().max(1))
                .into_response()
        }
    }
}

/// Rate limiting for admin endpoints
pub async fn admin_rate_limit(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    enforce(state, LimiterClass::Admin, request, next).await
}

/// Rate limiting for public endpoints: the api_key class when a key was
/// resolved, else the stricter anonymous class keyed by IP.
pub async fn public_rate_limit(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let class = if request.extensions().get::<ApiKeyContext>().is_some() {
        LimiterClass::ApiKey
    } else {
        LimiterClass::Public
    };

    enforce(state, class, request, next).await
}
