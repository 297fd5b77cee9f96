//! Router assembly and middleware layering

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::admin;
use super::health;
use super::middleware::{
    request_log_middleware, resolve_identity, security_headers_middleware,
};
use super::state::AppState;

/// Create the full application router.
///
/// Layer order (outermost first): trace span, security headers, identity
/// resolution, request logging, then the routes with their per-group rate
/// limits. Identity sits outside the logging wrapper so audit entries can
/// be attributed, and outside the limiters so verified keys are counted
/// by key id rather than source IP.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints (never rate limited)
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Admin API (admin limiter class applied inside)
        .nest("/admin", admin::create_admin_router(state.clone()))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_log_middleware,
        ))
        .layer(middleware::from_fn_with_state(state, resolve_identity))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::state::test_support::in_memory_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_route_is_open() {
        let app = create_router(in_memory_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_route_is_guarded() {
        let app = create_router(in_memory_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/api-keys")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_security_headers_present_on_all_responses() {
        let app = create_router(in_memory_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response
            .headers()
            .get(axum::http::header::X_CONTENT_TYPE_OPTIONS)
            .is_some());
    }
}
