//! Admin API endpoints for managing gateway resources

pub mod api_keys;
pub mod request_logs;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use super::middleware::rate_limit::admin_rate_limit;
use super::state::AppState;

/// Create the admin API router.
///
/// Every admin route sits behind the admin limiter class; scope checks
/// happen per handler.
pub fn create_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        // API key management
        .route("/api-keys", get(api_keys::list_api_keys))
        .route("/api-keys", post(api_keys::create_api_key))
        .route("/api-keys/{key_id}", get(api_keys::get_api_key))
        .route("/api-keys/{key_id}", put(api_keys::update_api_key))
        .route("/api-keys/{key_id}", delete(api_keys::delete_api_key))
        .route("/api-keys/{key_id}/freeze", post(api_keys::freeze_api_key))
        .route("/api-keys/{key_id}/unfreeze", post(api_keys::unfreeze_api_key))
        .route("/api-keys/{key_id}/revoke", post(api_keys::revoke_api_key))
        // Request audit log
        .route("/request-logs", get(request_logs::list_request_logs))
        .route("/request-logs", delete(request_logs::purge_request_logs))
        .layer(middleware::from_fn_with_state(state, admin_rate_limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::auth::resolve_identity;
    use crate::api::state::test_support::in_memory_state;
    use crate::domain::api_key::ScopeSet;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    const ROOT_SECRET: &str = "sg_test_root-secret-for-admin-tests";

    async fn admin_app(state: &AppState) -> Router {
        state
            .api_keys
            .create_with_secret(
                crate::domain::api_key::ApiKeyId::new("root").unwrap(),
                "Root Key",
                ROOT_SECRET,
                ScopeSet::superuser(),
            )
            .await
            .unwrap();

        Router::new()
            .nest("/admin", create_admin_router(state.clone()))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                resolve_identity,
            ))
            .with_state(state.clone())
    }

    fn request(method: Method, path: &str, token: Option<&str>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(path);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_admin_routes_require_a_key() {
        let state = in_memory_state();
        let app = admin_app(&state).await;

        let response = app
            .oneshot(request(Method::GET, "/admin/api-keys", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_then_list_keys() {
        let state = in_memory_state();
        let app = admin_app(&state).await;

        let create = request(
            Method::POST,
            "/admin/api-keys",
            Some(ROOT_SECRET),
            Some(r#"{"id": "ci-bot", "name": "CI Bot", "scopes": ["public.*"]}"#),
        );
        let response = app.clone().oneshot(create).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let list = request(Method::GET, "/admin/api-keys", Some(ROOT_SECRET), None);
        let response = app.oneshot(list).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(state.api_keys.count(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_freeze_unfreeze_revoke_lifecycle() {
        let state = in_memory_state();
        let app = admin_app(&state).await;

        let create = request(
            Method::POST,
            "/admin/api-keys",
            Some(ROOT_SECRET),
            Some(r#"{"id": "ci-bot", "name": "CI Bot", "scopes": []}"#),
        );
        app.clone().oneshot(create).await.unwrap();

        for (path, expected) in [
            ("/admin/api-keys/ci-bot/freeze", StatusCode::OK),
            ("/admin/api-keys/ci-bot/unfreeze", StatusCode::OK),
            ("/admin/api-keys/ci-bot/revoke", StatusCode::OK),
            // Frozen transitions are invalid from the revoked state.
            ("/admin/api-keys/ci-bot/freeze", StatusCode::BAD_REQUEST),
        ] {
            let response = app
                .clone()
                .oneshot(request(Method::POST, path, Some(ROOT_SECRET), None))
                .await
                .unwrap();
            assert_eq!(response.status(), expected, "unexpected status for {}", path);
        }
    }

    #[tokio::test]
    async fn test_non_admin_key_is_forbidden() {
        let state = in_memory_state();
        let app = admin_app(&state).await;

        state
            .api_keys
            .create_with_secret(
                crate::domain::api_key::ApiKeyId::new("reader").unwrap(),
                "Reader",
                "sg_test_reader-secret",
                ScopeSet::parse(["public.*"]).unwrap(),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(request(
                Method::GET,
                "/admin/api-keys",
                Some("sg_test_reader-secret"),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_key_returns_not_found() {
        let state = in_memory_state();
        let app = admin_app(&state).await;

        let response = app
            .oneshot(request(
                Method::GET,
                "/admin/api-keys/missing",
                Some(ROOT_SECRET),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_purge_request_logs_requires_days_parameter() {
        let state = in_memory_state();
        let app = admin_app(&state).await;

        let response = app
            .clone()
            .oneshot(request(
                Method::DELETE,
                "/admin/request-logs",
                Some(ROOT_SECRET),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(request(
                Method::DELETE,
                "/admin/request-logs?older_than_days=30",
                Some(ROOT_SECRET),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
