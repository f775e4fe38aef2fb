//! Password hashing (Argon2id, PHC string format).

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

use schoolmart_core::DomainError;

/// Shortest password accepted anywhere a password is set.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password hashing failed")]
    HashingFailed,

    #[error("password does not match")]
    Mismatch,

    #[error("stored password hash is malformed")]
    InvalidHashFormat,
}

impl From<PasswordError> for DomainError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Mismatch => DomainError::bad_credentials(),
            other => DomainError::internal(other.to_string()),
        }
    }
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| PasswordError::HashingFailed)
}

/// Verify a plaintext password against a stored PHC hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| PasswordError::Mismatch)
}

/// Boolean form of [`verify_password`]; a malformed hash never matches.
pub fn check_password(password: &str, hash: &str) -> bool {
    verify_password(password, hash).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("password123").unwrap();
        let b = hash_password("password123").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2"));
    }

    #[test]
    fn malformed_hash_is_reported() {
        assert_eq!(
            verify_password("password123", "not-a-hash"),
            Err(PasswordError::InvalidHashFormat)
        );
        assert!(!check_password("password123", "not-a-hash"));
    }

    proptest! {
        // Argon2 is deliberately slow; a handful of cases is enough.
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn round_trip_holds_for_valid_passwords(
            password in "[ -~]{6,32}",
            suffix in "[a-z0-9]{1,4}",
        ) {
            let hash = hash_password(&password).unwrap();
            prop_assert!(check_password(&password, &hash));

            let wrong = format!("{password}{suffix}");
            prop_assert!(!check_password(&wrong, &hash));
        }
    }
}
