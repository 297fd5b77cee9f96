//! API key secret generation, hashing and verification
//!
//! Secrets are random tokens with an operator-visible type prefix
//! (`sg_live_...`). Storage keeps a salted Argon2 hash as the
//! authoritative credential plus a deterministic SHA-256 digest used only
//! for indexed lookup; verification always happens against the Argon2
//! hash.

use std::sync::OnceLock;

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::domain::DomainError;

/// Number of secret characters (after the type prefix) shown to operators
const DISPLAY_PREFIX_CHARS: usize = 8;

/// Result of generating a new API key secret
#[derive(Debug, Clone)]
pub struct GeneratedSecret {
    /// The full secret (only shown once at creation)
    pub secret: String,
    /// Non-sensitive prefix for operator identification
    pub prefix: String,
    /// Salted Argon2 hash for storage
    pub hash: String,
    /// Deterministic digest for indexed lookup
    pub lookup_digest: String,
}

/// Generator for API key secrets
#[derive(Debug, Clone)]
pub struct SecretGenerator {
    /// Type prefix for all generated secrets (e.g. "sg_live_", "sg_test_")
    prefix: String,
    /// Number of random bytes to generate
    key_bytes: usize,
}

impl SecretGenerator {
    /// Create a new generator with a custom type prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            key_bytes: 32,
        }
    }

    /// Generator for production secrets
    pub fn live() -> Self {
        Self::new("sg_live_")
    }

    /// Generator for test secrets
    pub fn test() -> Self {
        Self::new("sg_test_")
    }

    /// Set the number of random bytes
    pub fn with_key_bytes(mut self, bytes: usize) -> Self {
        self.key_bytes = bytes;
        self
    }

    /// Generate a new random secret
    pub fn generate(&self) -> Result<GeneratedSecret, DomainError> {
        let mut random_bytes = vec![0u8; self.key_bytes];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        let encoded = URL_SAFE_NO_PAD.encode(&random_bytes);
        let secret = format!("{}{}", self.prefix, encoded);

        self.from_secret(&secret)
    }

    /// Build the stored representation of a known secret.
    ///
    /// Used for bootstrap keys provided via the environment and for
    /// deterministic keys in integration tests.
    pub fn from_secret(&self, secret: &str) -> Result<GeneratedSecret, DomainError> {
        let hash = Self::hash_secret(secret)?;

        Ok(GeneratedSecret {
            secret: secret.to_string(),
            prefix: Self::display_prefix(secret),
            hash,
            lookup_digest: Self::lookup_digest(secret),
        })
    }

    /// Salted Argon2 hash of a secret (PHC string format)
    pub fn hash_secret(secret: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::internal(format!("Failed to hash secret: {}", e)))
    }

    /// Verify a presented secret against a stored Argon2 hash.
    ///
    /// The Argon2 verifier compares in constant time, so a wrong secret is
    /// not distinguishable from a right one by timing.
    pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(stored_hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Burn one verification against a fixed hash.
    ///
    /// Called on the no-candidate path so "unknown secret" costs the same
    /// as "wrong secret".
    pub fn verify_dummy(secret: &str) {
        static DUMMY_HASH: OnceLock<String> = OnceLock::new();

        let hash = DUMMY_HASH.get_or_init(|| {
            Self::hash_secret("streamgate-dummy-verification-secret")
                .unwrap_or_default()
        });

        let _ = Self::verify_secret(secret, hash);
    }

    /// Deterministic digest of a secret, for indexed lookup only
    pub fn lookup_digest(secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        let result = hasher.finalize();
        format!("sha256${}", URL_SAFE_NO_PAD.encode(result))
    }

    /// Non-sensitive prefix of a secret for operator display:
    /// the type prefix plus the first few characters of the random
    /// portion (`sg_live_abc12345`).
    pub fn display_prefix(secret: &str) -> String {
        if let Some(pos) = secret.find('_') {
            if let Some(second_pos) = secret[pos + 1..].find('_') {
                let type_prefix_end = pos + 1 + second_pos + 1;
                let end = (type_prefix_end + DISPLAY_PREFIX_CHARS).min(secret.len());
                return secret[..end].to_string();
            }
        }

        secret[..DISPLAY_PREFIX_CHARS.min(secret.len())].to_string()
    }
}

impl Default for SecretGenerator {
    fn default() -> Self {
        Self::live()
    }
}
