//! Streamgate
//!
//! API access-control gateway for a streaming-media platform:
//! - API key authentication with salted hashing and scoped permissions
//! - Fixed-window rate limiting per caller class
//! - Asynchronous request audit logging
//! - Admin API for key lifecycle and audit queries

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::{info, warn};

use api::state::AppState;
use domain::api_key::{ApiKeyId, ScopeSet};
use infrastructure::api_key::{
    ApiKeyService, InMemoryApiKeyRepository, PostgresApiKeyRepository,
};
use infrastructure::rate_limit::{
    CounterStore, InMemoryCounterStore, RateLimiter, RedisCounterStore,
};
use infrastructure::request_log::{
    InMemoryRequestLogRepository, PostgresRequestLogRepository, RequestLogService,
};

/// Create the application state with all services initialized
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let use_postgres = config.storage.backend.eq_ignore_ascii_case("postgres");

    info!("Storage backend: {}", config.storage.backend);

    let (api_key_service, request_log_service) = if use_postgres {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        info!("Connecting to PostgreSQL...");
        let pool = sqlx::PgPool::connect(&database_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to PostgreSQL: {}", e))?;
        info!("PostgreSQL connection established");

        PostgresApiKeyRepository::migrate(&pool).await?;
        PostgresRequestLogRepository::migrate(&pool).await?;

        (
            ApiKeyService::new(Arc::new(PostgresApiKeyRepository::new(pool.clone()))),
            RequestLogService::new(Arc::new(PostgresRequestLogRepository::new(pool))),
        )
    } else {
        info!("Using in-memory storage");
        (
            ApiKeyService::new(Arc::new(InMemoryApiKeyRepository::new())),
            RequestLogService::new(Arc::new(InMemoryRequestLogRepository::new())),
        )
    };

    let counter_store: Arc<dyn CounterStore> = match &config.storage.redis_url {
        Some(url) => {
            info!("Using Redis counter store for rate limiting");
            Arc::new(RedisCounterStore::connect(url).await?)
        }
        None => {
            info!("Using in-memory counter store for rate limiting");
            Arc::new(InMemoryCounterStore::new())
        }
    };

    let rate_limiter = RateLimiter::new(counter_store, config.rate_limit.classes());

    let api_key_service = Arc::new(api_key_service);

    if let Ok(root_secret) = std::env::var("ROOT_API_KEY") {
        bootstrap_root_api_key(&api_key_service, &root_secret).await?;
    }

    Ok(AppState::new(
        api_key_service,
        Arc::new(rate_limiter),
        Arc::new(request_log_service),
    ))
}

/// Create the root API key from the environment, once.
///
/// The root key holds the bare `*` scope. Creation is idempotent across
/// restarts: an existing `root` key is left untouched, even when the
/// configured secret has changed.
async fn bootstrap_root_api_key(
    api_keys: &ApiKeyService,
    secret: &str,
) -> anyhow::Result<()> {
    let root_id = ApiKeyId::new("root")
        .map_err(|e| anyhow::anyhow!("Invalid root key id: {}", e))?;

    if api_keys.exists(&root_id).await? {
        warn!("Root API key already exists; leaving it unchanged");
        return Ok(());
    }

    let created = api_keys
        .create_with_secret(root_id, "Root Key", secret, ScopeSet::superuser())
        .await?;

    info!("Root API key created with ID: {}", created.api_key.id());
    Ok(())
}
