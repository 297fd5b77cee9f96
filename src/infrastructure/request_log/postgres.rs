//! PostgreSQL request log repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::api_key::ApiKeyId;
use crate::domain::request_log::{
    RequestLogEntry, RequestLogFilter, RequestLogRecord, RequestLogRepository,
};
use crate::domain::DomainError;

/// PostgreSQL implementation of `RequestLogRepository`
#[derive(Debug, Clone)]
pub struct PostgresRequestLogRepository {
    pool: PgPool,
}

impl PostgresRequestLogRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table if it does not exist yet
    pub async fn migrate(pool: &PgPool) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS request_logs (
                id UUID PRIMARY KEY,
                endpoint TEXT NOT NULL,
                method TEXT NOT NULL,
                status SMALLINT NOT NULL,
                api_key_id TEXT,
                response_time_ms BIGINT NOT NULL,
                ip TEXT NOT NULL,
                user_agent TEXT,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| {
            DomainError::storage(format!("Failed to create request_logs table: {}", e))
        })?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS request_logs_created_at_idx \
             ON request_logs (created_at)",
        )
        .execute(pool)
        .await
        .map_err(|e| {
            DomainError::storage(format!("Failed to index request_logs table: {}", e))
        })?;

        Ok(())
    }
}

#[async_trait]
impl RequestLogRepository for PostgresRequestLogRepository {
    async fn record(&self, entry: RequestLogEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO request_logs (id, endpoint, method, status, api_key_id,
                                      response_time_ms, ip, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id())
        .bind(entry.endpoint())
        .bind(entry.method())
        .bind(entry.status() as i16)
        .bind(entry.api_key_id().map(|id| id.as_str()))
        .bind(entry.response_time_ms() as i64)
        .bind(entry.ip())
        .bind(entry.user_agent())
        .bind(entry.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to record request log: {}", e)))?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &RequestLogFilter,
        limit: usize,
    ) -> Result<Vec<RequestLogEntry>, DomainError> {
        let mut query = String::from(
            "SELECT id, endpoint, method, status, api_key_id, response_time_ms, \
             ip, user_agent, created_at FROM request_logs WHERE TRUE",
        );

        if filter.api_key_id.is_some() {
            query.push_str(" AND api_key_id = $2");
        }
        if filter.server_errors_only {
            query.push_str(" AND status >= 500");
        }
        query.push_str(" ORDER BY created_at DESC LIMIT $1");

        let mut q = sqlx::query(&query).bind(limit as i64);
        if let Some(key_id) = &filter.api_key_id {
            q = q.bind(key_id.as_str());
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list request logs: {}", e)))?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM request_logs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count request logs: {}", e)))?;

        Ok(count as usize)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM request_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to purge request logs: {}", e)))?;

        Ok(result.rows_affected())
    }
}

fn row_to_entry(row: &sqlx::postgres::PgRow) -> Result<RequestLogEntry, DomainError> {
    let api_key_id: Option<String> = row
        .try_get("api_key_id")
        .map_err(|e| DomainError::storage(format!("Failed to read api_key_id column: {}", e)))?;

    let api_key_id = api_key_id
        .map(ApiKeyId::new)
        .transpose()
        .map_err(|e| DomainError::storage(format!("Invalid stored api_key_id: {}", e)))?;

    let id: Uuid = get_column(row, "id")?;
    let status: i16 = get_column(row, "status")?;
    let response_time_ms: i64 = get_column(row, "response_time_ms")?;

    let record = RequestLogRecord {
        id,
        endpoint: get_column(row, "endpoint")?,
        method: get_column(row, "method")?,
        status: status as u16,
        api_key_id,
        response_time_ms: response_time_ms as u64,
        ip: get_column(row, "ip")?,
        user_agent: get_column(row, "user_agent")?,
        created_at: get_column(row, "created_at")?,
    };

    Ok(RequestLogEntry::from(record))
}

fn get_column<'r, T>(row: &'r sqlx::postgres::PgRow, column: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| DomainError::storage(format!("Failed to read {} column: {}", column, e)))
}
