use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::PasswordConfig;

/// Longest plaintext accepted for hashing, in bytes.
pub const MAX_PASSWORD_BYTES: usize = 256;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password cannot be encoded")]
    Encoding,
    #[error("password cannot be empty")]
    EmptyInput,
    #[error("password does not match")]
    Mismatch,
}

/// Argon2id hashing with a configurable work factor.
///
/// Cloning is cheap; clones share the dummy hash used to equalize timing
/// on lookups for unknown accounts.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    pub fn new(cfg: PasswordConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 parameters: {e}"))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(b"dummy-password-for-timing", &salt)
            .map_err(|e| anyhow::anyhow!("argon2 dummy hash: {e}"))?
            .to_string();
        Ok(Self {
            argon2,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        if plain.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::Encoding);
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                PasswordError::Encoding
            })?
            .to_string();
        Ok(hash)
    }

    /// Checks `plain` against a stored PHC string. A malformed stored hash
    /// is reported as `Mismatch` and costs one full verification, same as a
    /// wrong password.
    pub fn verify(&self, hash: &str, plain: &str) -> Result<(), PasswordError> {
        if plain.is_empty() {
            return Err(PasswordError::EmptyInput);
        }
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "argon2 parse hash error");
                self.verify_dummy(plain);
                return Err(PasswordError::Mismatch);
            }
        };
        self.argon2
            .verify_password(plain.as_bytes(), &parsed)
            .map_err(|_| PasswordError::Mismatch)
    }

    /// Runs one verification against a throwaway hash and discards the result.
    pub fn verify_dummy(&self, plain: &str) {
        let _ = self.verify(&self.dummy_hash, plain);
    }
}

#[cfg(test)]
pub(crate) fn cheap_config() -> PasswordConfig {
    PasswordConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}
