//! PostgreSQL API key repository implementation

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::api_key::{
    ApiKey, ApiKeyId, ApiKeyRecord, ApiKeyRepository, ApiKeyStatus, ScopeSet,
};
use crate::domain::DomainError;

/// PostgreSQL implementation of `ApiKeyRepository`
#[derive(Debug, Clone)]
pub struct PostgresApiKeyRepository {
    pool: PgPool,
}

const SELECT_COLUMNS: &str = "id, name, description, secret_hash, lookup_digest, key_prefix, \
                              scopes, owner_user_id, status, expires_at, last_used_at, \
                              created_at, updated_at";

impl PostgresApiKeyRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table if it does not exist yet
    pub async fn migrate(pool: &PgPool) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_keys (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                secret_hash TEXT NOT NULL,
                lookup_digest TEXT NOT NULL UNIQUE,
                key_prefix TEXT NOT NULL,
                scopes JSONB NOT NULL DEFAULT '[]'::jsonb,
                owner_user_id TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                expires_at TIMESTAMPTZ,
                last_used_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create api_keys table: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl ApiKeyRepository for PostgresApiKeyRepository {
    async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM api_keys WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get API key: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_api_key(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_by_lookup_digest(&self, digest: &str) -> Result<Option<ApiKey>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM api_keys WHERE lookup_digest = $1",
            SELECT_COLUMNS
        ))
        .bind(digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to look up API key: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_api_key(&row)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        let scopes = serde_json::to_value(api_key.scopes())
            .map_err(|e| DomainError::internal(format!("Failed to encode scopes: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO api_keys (id, name, description, secret_hash, lookup_digest, key_prefix,
                                  scopes, owner_user_id, status, expires_at, last_used_at,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(api_key.id().as_str())
        .bind(api_key.name())
        .bind(api_key.description())
        .bind(api_key.secret_hash())
        .bind(api_key.lookup_digest())
        .bind(api_key.key_prefix())
        .bind(scopes)
        .bind(api_key.owner_user_id())
        .bind(api_key.status().as_str())
        .bind(api_key.expires_at())
        .bind(api_key.last_used_at())
        .bind(api_key.created_at())
        .bind(api_key.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();

            if msg.contains("duplicate key") || msg.contains("unique constraint") {
                DomainError::conflict(format!(
                    "API key with ID '{}' already exists",
                    api_key.id().as_str()
                ))
            } else {
                DomainError::storage(format!("Failed to create API key: {}", e))
            }
        })?;

        Ok(api_key)
    }

    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError> {
        let scopes = serde_json::to_value(api_key.scopes())
            .map_err(|e| DomainError::internal(format!("Failed to encode scopes: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET name = $2, description = $3, scopes = $4, owner_user_id = $5,
                status = $6, expires_at = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(api_key.id().as_str())
        .bind(api_key.name())
        .bind(api_key.description())
        .bind(scopes)
        .bind(api_key.owner_user_id())
        .bind(api_key.status().as_str())
        .bind(api_key.expires_at())
        .bind(api_key.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update API key: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "API key '{}' not found",
                api_key.id().as_str()
            )));
        }

        Ok(api_key.clone())
    }

    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete API key: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, status: Option<ApiKeyStatus>) -> Result<Vec<ApiKey>, DomainError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {} FROM api_keys WHERE status = $1 ORDER BY id",
                    SELECT_COLUMNS
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM api_keys ORDER BY id",
                    SELECT_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| DomainError::storage(format!("Failed to list API keys: {}", e)))?;

        rows.iter().map(row_to_api_key).collect()
    }

    async fn count(&self, status: Option<ApiKeyStatus>) -> Result<usize, DomainError> {
        let count: i64 = match status {
            Some(status) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM api_keys WHERE status = $1")
                    .bind(status.as_str())
                    .fetch_one(&self.pool)
                    .await
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM api_keys")
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(|e| DomainError::storage(format!("Failed to count API keys: {}", e)))?;

        Ok(count as usize)
    }

    async fn record_usage(&self, id: &ApiKeyId) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to record API key usage: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("API key '{}' not found", id)));
        }

        Ok(())
    }
}

fn row_to_api_key(row: &sqlx::postgres::PgRow) -> Result<ApiKey, DomainError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| DomainError::storage(format!("Failed to read id column: {}", e)))?;
    let id = ApiKeyId::new(id).map_err(|e| DomainError::invalid_id(e.to_string()))?;

    let scopes: serde_json::Value = row
        .try_get("scopes")
        .map_err(|e| DomainError::storage(format!("Failed to read scopes column: {}", e)))?;
    let scopes: ScopeSet = serde_json::from_value(scopes)
        .map_err(|e| DomainError::storage(format!("Failed to decode stored scopes: {}", e)))?;

    let status: String = row
        .try_get("status")
        .map_err(|e| DomainError::storage(format!("Failed to read status column: {}", e)))?;
    let status = ApiKeyStatus::parse(&status)
        .ok_or_else(|| DomainError::storage(format!("Unknown API key status '{}'", status)))?;

    let record = ApiKeyRecord {
        id,
        name: get_column(row, "name")?,
        description: get_column(row, "description")?,
        secret_hash: get_column(row, "secret_hash")?,
        lookup_digest: get_column(row, "lookup_digest")?,
        key_prefix: get_column(row, "key_prefix")?,
        scopes,
        owner_user_id: get_column(row, "owner_user_id")?,
        status,
        expires_at: get_column(row, "expires_at")?,
        last_used_at: get_column(row, "last_used_at")?,
        created_at: get_column(row, "created_at")?,
        updated_at: get_column(row, "updated_at")?,
    };

    Ok(ApiKey::from(record))
}

fn get_column<'r, T>(row: &'r sqlx::postgres::PgRow, column: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| DomainError::storage(format!("Failed to read {} column: {}", column, e)))
}
