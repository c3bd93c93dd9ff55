/// Secret hashing and verification using Argon2id
///
/// Default parameters follow OWASP recommendations:
/// - Algorithm: Argon2id (memory-hard, resistant to GPU attacks)
/// - Memory: 64 MB
/// - Iterations: 3
/// - Parallelism: 4 threads
/// - Salt: 16 bytes random
/// - Output: 32 bytes hash
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Secret hashing errors
#[derive(Debug, Error)]
pub enum HashError {
    #[error("Invalid hasher parameters: {0}")]
    InvalidParams(String),

    #[error("Failed to hash secret: {0}")]
    HashingFailed(String),
}

/// Argon2 parameter set
///
/// Increasing memory or iterations improves security but slows down hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HasherConfig {
    /// Memory cost in KB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (threads, default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

impl HasherConfig {
    /// Cheap parameters for tests; never use in production
    pub fn fast_insecure() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    fn to_params(&self) -> Result<Params, HashError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| HashError::InvalidParams(e.to_string()))
    }
}

/// One-way secret hasher
///
/// Parameters are validated once at construction; the hasher itself holds no
/// mutable state and is shared freely between tasks.
#[derive(Debug, Clone)]
pub struct SecretHasher {
    params: Params,
}

impl SecretHasher {
    /// Create a hasher from configuration
    pub fn new(config: &HasherConfig) -> Result<Self, HashError> {
        Ok(Self {
            params: config.to_params()?,
        })
    }

    /// Hash a plaintext secret
    ///
    /// Returns a PHC string (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`).
    /// A fresh random salt is embedded on every call, so hashing the same
    /// input twice produces two different digests that both verify.
    pub fn hash(&self, secret: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            self.params.clone(),
        );

        let digest = argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| HashError::HashingFailed(e.to_string()))?;

        Ok(digest.to_string())
    }

    /// Verify a plaintext secret against a stored digest
    ///
    /// The digest's own parameters are used, so secrets hashed under older
    /// settings keep verifying. A malformed digest never errors; it simply
    /// does not match.
    pub fn verify(&self, secret: &str, digest: &str) -> bool {
        verify_secret(secret, digest)
    }
}

/// Verify a secret against a PHC digest without a configured hasher
pub fn verify_secret(secret: &str, digest: &str) -> bool {
    let parsed = match PasswordHash::new(digest) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, "stored secret digest is malformed");
            return false;
        }
    };

    // argon2 compares the recomputed output in constant time
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

/// Validate secret strength
///
/// Checks if a secret meets minimum requirements:
/// - At least 8 characters
/// - At least 1 uppercase letter
/// - At least 1 lowercase letter
/// - At least 1 digit
/// - At least 1 special character
pub fn validate_secret_strength(secret: &str) -> Result<(), String> {
    if secret.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if !secret.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !secret.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !secret.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }

    if !secret.chars().any(|c| !c.is_alphanumeric()) {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}
