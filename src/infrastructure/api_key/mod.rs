//! API Key infrastructure implementations
//!
//! Secret generation and hashing, storage backends, and the service that
//! ties them together for management and request verification.

mod generator;
mod postgres;
mod repository;
mod service;

pub use generator::{GeneratedSecret, SecretGenerator};
pub use postgres::PostgresApiKeyRepository;
pub use repository::InMemoryApiKeyRepository;
pub use service::{ApiKeyService, CreatedApiKey, NewApiKey};
