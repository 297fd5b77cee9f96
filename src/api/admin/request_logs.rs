//! Request audit log admin endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::middleware::RequireApiKey;
use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::api_key::ApiKeyId;
use crate::domain::request_log::{RequestLogEntry, RequestLogFilter};

const SCOPE_LOGS_READ: &str = "admin.logs.read";
const SCOPE_LOGS_WRITE: &str = "admin.logs.write";

const DEFAULT_LIST_LIMIT: usize = 100;
const MAX_LIST_LIMIT: usize = 1000;

/// Query parameters for listing request logs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRequestLogsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub api_key_id: Option<String>,
    #[serde(default)]
    pub errors_only: Option<bool>,
}

/// Query parameters for the retention sweep
#[derive(Debug, Clone, Deserialize)]
pub struct PurgeRequestLogsQuery {
    /// Entries older than this many days are removed
    pub older_than_days: u32,
}

/// Request log entry in response format
#[derive(Debug, Clone, Serialize)]
pub struct RequestLogResponse {
    pub id: String,
    pub endpoint: String,
    pub method: String,
    pub status: u16,
    pub api_key_id: Option<String>,
    pub response_time_ms: u64,
    pub ip: String,
    pub user_agent: Option<String>,
    pub created_at: String,
}

impl From<&RequestLogEntry> for RequestLogResponse {
    fn from(entry: &RequestLogEntry) -> Self {
        Self {
            id: entry.id().to_string(),
            endpoint: entry.endpoint().to_string(),
            method: entry.method().to_string(),
            status: entry.status(),
            api_key_id: entry.api_key_id().map(|id| id.as_str().to_string()),
            response_time_ms: entry.response_time_ms(),
            ip: entry.ip().to_string(),
            user_agent: entry.user_agent().map(String::from),
            created_at: entry.created_at().to_rfc3339(),
        }
    }
}

/// List request logs response
#[derive(Debug, Clone, Serialize)]
pub struct ListRequestLogsResponse {
    pub entries: Vec<RequestLogResponse>,
    pub total: usize,
}

/// GET /admin/request-logs
pub async fn list_request_logs(
    State(state): State<AppState>,
    RequireApiKey(ctx): RequireApiKey,
    Query(query): Query<ListRequestLogsQuery>,
) -> Result<Json<ListRequestLogsResponse>, ApiError> {
    ctx.authorize(SCOPE_LOGS_READ)?;
    debug!(caller = %ctx.key_id(), "Admin listing request logs");

    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT);

    let api_key_id = query
        .api_key_id
        .map(ApiKeyId::new)
        .transpose()
        .map_err(|e| ApiError::bad_request(e.to_string()).with_param("api_key_id"))?;

    let filter = RequestLogFilter {
        api_key_id,
        server_errors_only: query.errors_only.unwrap_or(false),
    };

    let entries = state.request_logs.list(&filter, limit).await?;
    let responses: Vec<RequestLogResponse> =
        entries.iter().map(RequestLogResponse::from).collect();
    let total = responses.len();

    Ok(Json(ListRequestLogsResponse {
        entries: responses,
        total,
    }))
}

/// DELETE /admin/request-logs
pub async fn purge_request_logs(
    State(state): State<AppState>,
    RequireApiKey(ctx): RequireApiKey,
    Query(query): Query<PurgeRequestLogsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    ctx.authorize(SCOPE_LOGS_WRITE)?;
    debug!(
        caller = %ctx.key_id(),
        older_than_days = query.older_than_days,
        "Admin purging request logs"
    );

    let cutoff = Utc::now() - chrono::Duration::days(i64::from(query.older_than_days));
    let deleted = state.request_logs.purge_older_than(cutoff).await?;

    Ok(Json(serde_json::json!({
        "deleted": deleted,
        "older_than_days": query.older_than_days
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query: ListRequestLogsQuery = serde_json::from_str("{}").unwrap();
        assert!(query.limit.is_none());
        assert!(query.api_key_id.is_none());
        assert!(query.errors_only.is_none());
    }

    #[test]
    fn test_response_from_entry() {
        let entry = RequestLogEntry::new("/admin/api-keys", "GET", 200, 12, "203.0.113.7")
            .with_api_key(ApiKeyId::new("ci-bot").unwrap())
            .with_user_agent("curl/8.5.0");

        let response = RequestLogResponse::from(&entry);

        assert_eq!(response.endpoint, "/admin/api-keys");
        assert_eq!(response.status, 200);
        assert_eq!(response.api_key_id.as_deref(), Some("ci-bot"));
        assert_eq!(response.user_agent.as_deref(), Some("curl/8.5.0"));
    }

    #[test]
    fn test_list_response_serialization() {
        let response = ListRequestLogsResponse {
            entries: vec![],
            total: 0,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"entries\":[]"));
        assert!(json.contains("\"total\":0"));
    }
}
