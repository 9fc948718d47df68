//! Password hashing.

use crate::error::{CoreError, CoreResult};
use argon2::password_hash::{
    Error as PasswordHashError, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
    SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};

/// Shortest accepted password.
pub const MIN_PASSWORD_LENGTH: usize = 8;

// Upper bound keeps a single request from hashing an arbitrarily large buffer.
/// Longest accepted password.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Cost profile for new hashes.
///
/// Verification always uses the parameters stored in the hash itself, so
/// hashes created with either profile verify with both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashCost {
    /// The argon2 crate's recommended parameters.
    #[default]
    Standard,
    /// Minimum parameters. Only for tests.
    Fast,
}

/// Creates and verifies argon2id password hashes.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Creates a hasher with the given cost profile.
    pub fn new(cost: HashCost) -> Self {
        let params = match cost {
            HashCost::Standard => Params::default(),
            HashCost::Fast => Params::new(
                Params::MIN_M_COST,
                Params::MIN_T_COST,
                Params::MIN_P_COST,
                None,
            )
            .unwrap_or_default(),
        };
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hashes a password after checking its length.
    pub fn hash(&self, password: &str) -> CoreResult<String> {
        validate_password(password)?;
        let salt = SaltString::generate(&mut rand::thread_rng());
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CoreError::password(e.to_string()))
    }

    /// Checks a password against a stored hash.
    pub fn verify(&self, password: &str, hash: &str) -> CoreResult<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| CoreError::password(e.to_string()))?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(e) => Err(CoreError::password(e.to_string())),
        }
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    pub async fn hash_blocking(&self, password: String) -> CoreResult<String> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| CoreError::password(e.to_string()))?
    }

    /// [`verify`](Self::verify) on the blocking thread pool.
    pub async fn verify_blocking(&self, password: String, hash: String) -> CoreResult<bool> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| CoreError::password(e.to_string()))?
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(HashCost::Standard)
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

/// Checks password length bounds (in characters).
pub(crate) fn validate_password(password: &str) -> CoreResult<()> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(CoreError::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(CoreError::validation(
            "password",
            format!("must be at most {MAX_PASSWORD_LENGTH} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(HashCost::Fast)
    }

    #[test]
    fn hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(!hasher.verify("battery staple", &hash).unwrap());
    }

    #[test]
    fn salts_differ() {
        let hasher = hasher();
        let a = hasher.hash("same password").unwrap();
        let b = hasher.hash("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn fast_hashes_verify_with_standard_hasher() {
        let hash = hasher().hash("portable-pw").unwrap();
        assert!(PasswordHasher::default()
            .verify("portable-pw", &hash)
            .unwrap());
    }

    #[test]
    fn length_bounds() {
        let hasher = hasher();
        assert!(matches!(
            hasher.hash("short"),
            Err(CoreError::Validation { field: "password", .. })
        ));
        let long = "x".repeat(MAX_PASSWORD_LENGTH + 1);
        assert!(hasher.hash(&long).is_err());
        assert!(hasher.hash(&"x".repeat(MAX_PASSWORD_LENGTH)).is_ok());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(matches!(
            hasher().verify("whatever1", "not-a-phc-string"),
            Err(CoreError::Password { .. })
        ));
    }

    #[tokio::test]
    async fn blocking_variants() {
        let hasher = hasher();
        let hash = hasher.hash_blocking("async password".into()).await.unwrap();
        assert!(hasher
            .verify_blocking("async password".into(), hash)
            .await
            .unwrap());
    }
}
