//! Request log entry entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::api_key::ApiKeyId;

/// Immutable audit record of one handled request.
///
/// Created once after the handler completes (on both the success and the
/// failure path) and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogEntry {
    /// Unique identifier for the entry
    id: Uuid,
    /// Request path as matched by the router
    endpoint: String,
    /// HTTP method
    method: String,
    /// Resulting HTTP status code
    status: u16,
    /// Resolved caller key, when one was presented and verified
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key_id: Option<ApiKeyId>,
    /// Total handler time in milliseconds
    response_time_ms: u64,
    /// Source IP of the caller
    ip: String,
    /// Caller user agent, when sent
    #[serde(skip_serializing_if = "Option::is_none")]
    user_agent: Option<String>,
    /// When the request completed
    created_at: DateTime<Utc>,
}

impl RequestLogEntry {
    pub fn new(
        endpoint: impl Into<String>,
        method: impl Into<String>,
        status: u16,
        response_time_ms: u64,
        ip: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint: endpoint.into(),
            method: method.into(),
            status,
            api_key_id: None,
            response_time_ms,
            ip: ip.into(),
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    /// Attribute the entry to a verified API key
    pub fn with_api_key(mut self, api_key_id: ApiKeyId) -> Self {
        self.api_key_id = Some(api_key_id);
        self
    }

    /// Record the caller's user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    // Getters

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn api_key_id(&self) -> Option<&ApiKeyId> {
        self.api_key_id.as_ref()
    }

    pub fn response_time_ms(&self) -> u64 {
        self.response_time_ms
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the handler failed with a server error
    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// Raw field set used by repositories to rehydrate a stored entry
#[derive(Debug, Clone)]
pub struct RequestLogRecord {
    pub id: Uuid,
    pub endpoint: String,
    pub method: String,
    pub status: u16,
    pub api_key_id: Option<ApiKeyId>,
    pub response_time_ms: u64,
    pub ip: String,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<RequestLogRecord> for RequestLogEntry {
    fn from(record: RequestLogRecord) -> Self {
        Self {
            id: record.id,
            endpoint: record.endpoint,
            method: record.method,
            status: record.status,
            api_key_id: record.api_key_id,
            response_time_ms: record.response_time_ms,
            ip: record.ip,
            user_agent: record.user_agent,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = RequestLogEntry::new("/admin/api-keys", "GET", 200, 12, "203.0.113.7")
            .with_user_agent("curl/8.5.0");

        assert_eq!(entry.endpoint(), "/admin/api-keys");
        assert_eq!(entry.method(), "GET");
        assert_eq!(entry.status(), 200);
        assert_eq!(entry.response_time_ms(), 12);
        assert_eq!(entry.ip(), "203.0.113.7");
        assert_eq!(entry.user_agent(), Some("curl/8.5.0"));
        assert!(entry.api_key_id().is_none());
        assert!(!entry.is_server_error());
    }

    #[test]
    fn test_entry_with_api_key() {
        let key_id = ApiKeyId::new("ci-bot").unwrap();
        let entry = RequestLogEntry::new("/admin/api-keys", "POST", 201, 30, "203.0.113.7")
            .with_api_key(key_id.clone());

        assert_eq!(entry.api_key_id(), Some(&key_id));
    }

    #[test]
    fn test_server_error_classification() {
        let ok = RequestLogEntry::new("/health", "GET", 200, 1, "127.0.0.1");
        let client_err = RequestLogEntry::new("/admin/api-keys", "GET", 403, 2, "127.0.0.1");
        let server_err = RequestLogEntry::new("/admin/api-keys", "GET", 500, 2, "127.0.0.1");

        assert!(!ok.is_server_error());
        assert!(!client_err.is_server_error());
        assert!(server_err.is_server_error());
    }

    #[test]
    fn test_unique_ids() {
        let a = RequestLogEntry::new("/health", "GET", 200, 1, "127.0.0.1");
        let b = RequestLogEntry::new("/health", "GET", 200, 1, "127.0.0.1");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let entry = RequestLogEntry::new("/health", "GET", 200, 1, "127.0.0.1");
        let json = serde_json::to_string(&entry).unwrap();

        assert!(!json.contains("api_key_id"));
        assert!(!json.contains("user_agent"));
    }
}
