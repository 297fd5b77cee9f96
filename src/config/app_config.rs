use serde::Deserialize;

use crate::domain::rate_limit::RateLimitQuota;
use crate::infrastructure::rate_limit::RateLimitClasses;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Storage backend selection.
///
/// `backend` is "memory" or "postgres" (PostgreSQL reads DATABASE_URL
/// from the environment). When `redis_url` is set, rate-limit counters
/// live in Redis so quotas hold across multiple instances.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: String,
    #[serde(default)]
    pub redis_url: Option<String>,
}

/// Per-class rate limit quotas
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub admin: QuotaConfig,
    pub api_key: QuotaConfig,
    pub public: QuotaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    pub max_requests: u64,
    pub window_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            redis_url: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            admin: QuotaConfig {
                max_requests: 30,
                window_secs: 60,
            },
            api_key: QuotaConfig {
                max_requests: 100,
                window_secs: 60,
            },
            public: QuotaConfig {
                max_requests: 60,
                window_secs: 60,
            },
        }
    }
}

impl From<&QuotaConfig> for RateLimitQuota {
    fn from(config: &QuotaConfig) -> Self {
        RateLimitQuota::new(config.max_requests, config.window_secs)
    }
}

impl RateLimitConfig {
    /// Quotas in the shape the limiter consumes
    pub fn classes(&self) -> RateLimitClasses {
        RateLimitClasses {
            admin: (&self.admin).into(),
            api_key: (&self.api_key).into(),
            public: (&self.public).into(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
