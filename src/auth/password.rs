// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local password hashing (Argon2id, PHC string format).
//!
//! Hashing is CPU and memory heavy. Request handlers use the `*_blocking`
//! helpers, which run it on the blocking thread pool.

use std::sync::LazyLock;

use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier, Version};
use password_hash::{rand_core::OsRng, SaltString};

use super::AuthError;

/// OWASP minimum Argon2id params: m=19456 KiB, t=2 iterations, p=1 lane.
const MEMORY_COST_KIB: u32 = 19_456;
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;

/// Hash checked when there is no stored hash, so a miss costs as much as a
/// wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| PasswordHasher::default().hash("erp-api-absent-user").ok());

/// Hashes and verifies local account passwords.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    memory_cost: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            memory_cost: MEMORY_COST_KIB,
            time_cost: TIME_COST,
            parallelism: PARALLELISM,
        }
    }
}

impl PasswordHasher {
    /// Hash `plaintext` with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|e| AuthError::InternalError(format!("invalid argon2 params: {e}")))?;
        let salt = SaltString::generate(&mut OsRng);

        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::InternalError(format!("failed to hash password: {e}")))
    }

    /// Check `plaintext` against a stored hash.
    ///
    /// Parameters come from the PHC string itself. A malformed hash is a
    /// mismatch, not an error.
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Check `plaintext` against `hash`, or against a dummy hash when the
    /// account has none. A missing hash never verifies.
    pub fn verify_or_dummy(&self, plaintext: &str, hash: Option<&str>) -> bool {
        match hash {
            Some(hash) => self.verify(plaintext, hash),
            None => {
                if let Some(dummy) = DUMMY_HASH.as_deref() {
                    let _ = self.verify(plaintext, dummy);
                }
                false
            }
        }
    }

    /// [`Self::hash`] on the blocking thread pool.
    pub async fn hash_blocking(self, plaintext: String) -> Result<String, AuthError> {
        tokio::task::spawn_blocking(move || self.hash(&plaintext))
            .await
            .map_err(|e| AuthError::InternalError(format!("password hashing task failed: {e}")))?
    }

    /// [`Self::verify_or_dummy`] on the blocking thread pool.
    pub async fn verify_blocking(
        self,
        plaintext: String,
        hash: Option<String>,
    ) -> Result<bool, AuthError> {
        tokio::task::spawn_blocking(move || self.verify_or_dummy(&plaintext, hash.as_deref()))
            .await
            .map_err(|e| AuthError::InternalError(format!("password check task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_and_both_verify() {
        let hasher = PasswordHasher::default();
        let first = hasher.hash("correct horse").unwrap();
        let second = hasher.hash("correct horse").unwrap();

        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &first));
        assert!(hasher.verify("correct horse", &second));
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let hasher = PasswordHasher::default();
        let hash = hasher.hash("secret1").unwrap();

        assert!(!hasher.verify("secret2", &hash));
        assert!(!hasher.verify("", &hash));
    }

    #[test]
    fn missing_hash_never_verifies() {
        let hasher = PasswordHasher::default();
        assert!(!hasher.verify_or_dummy("erp-api-absent-user", None));
        assert!(!hasher.verify_or_dummy("secret1", None));
        assert!(DUMMY_HASH.as_deref().is_some_and(|h| h.starts_with("$argon2id$")));
    }

    #[tokio::test]
    async fn blocking_helpers_hash_and_verify() {
        let hasher = PasswordHasher::default();
        let hash = hasher.hash_blocking("secret1".to_string()).await.unwrap();

        assert!(hasher
            .verify_blocking("secret1".to_string(), Some(hash.clone()))
            .await
            .unwrap());
        assert!(!hasher
            .verify_blocking("secret2".to_string(), Some(hash))
            .await
            .unwrap());
        assert!(!hasher
            .verify_blocking("secret1".to_string(), None)
            .await
            .unwrap());
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        let hasher = PasswordHasher::default();
        assert!(!hasher.verify("secret1", "not-a-phc-string"));
        assert!(!hasher.verify("secret1", ""));
    }
}
