//! Password hashing with Argon2id.

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

/// One-way, salted password hashing.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password into a self-describing digest.
    fn hash(&self, plaintext: &str) -> Result<String, HashError>;

    /// Check a plaintext password against a stored digest.
    /// Unparseable digests never match.
    fn verify(&self, plaintext: &str, digest: &str) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),
    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Argon2id hasher producing PHC-format digests.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl Argon2Hasher {
    /// Build a hasher with explicit cost parameters.
    pub fn with_cost(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, HashError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| HashError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    /// Cheapest parameters argon2 accepts. Only for tests.
    pub fn insecure_fast() -> Self {
        Self {
            params: Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
                .unwrap_or_default(),
        }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| HashError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        // Parameters are read from the digest itself
        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = Argon2Hasher::insecure_fast();
        let digest = hasher.hash("pw1").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify("pw1", &digest));
        assert!(!hasher.verify("pw2", &digest));
    }

    #[test]
    fn test_same_password_gets_different_salt() {
        let hasher = Argon2Hasher::insecure_fast();

        let first = hasher.hash("secret").unwrap();
        let second = hasher.hash("secret").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("secret", &first));
        assert!(hasher.verify("secret", &second));
    }

    #[test]
    fn test_garbage_digest_never_matches() {
        let hasher = Argon2Hasher::insecure_fast();

        assert!(!hasher.verify("pw", ""));
        assert!(!hasher.verify("pw", "not-a-phc-string"));
    }

    #[test]
    fn test_digest_verifies_across_cost_settings() {
        let cheap = Argon2Hasher::insecure_fast();
        let other = Argon2Hasher::with_cost(16, 2, 1).unwrap();

        let digest = cheap.hash("pw").unwrap();
        assert!(other.verify("pw", &digest));
    }

    #[test]
    fn test_invalid_cost_rejected() {
        assert!(matches!(
            Argon2Hasher::with_cost(0, 0, 0),
            Err(HashError::Params(_))
        ));
    }
}
