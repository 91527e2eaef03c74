//! Password hashing and strength policy.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng};
use argon2::Argon2;
use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
const SPECIAL_CHARS: &str = "@$!%*?&";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters")]
    Length,

    #[error("password must contain an uppercase letter, a lowercase letter, a digit and one of {SPECIAL_CHARS}")]
    Weak,

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Enforce the account password policy.
pub fn check_strength(password: &str) -> Result<(), PasswordError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(PasswordError::Length);
    }

    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let special = password.chars().any(|c| SPECIAL_CHARS.contains(c));

    if lower && upper && digit && special {
        Ok(())
    } else {
        Err(PasswordError::Weak)
    }
}

/// Hash with Argon2id and a random salt (PHC string).
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Check `password` against a stored PHC hash. A malformed hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("Sup3r$ecret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Sup3r$ecret", &hash));
        assert!(!verify_password("sup3r$ecret", &hash));
    }

    #[test]
    fn malformed_hash_does_not_verify() {
        assert!(!verify_password("anything", "plaintext"));
    }

    #[test]
    fn strength_policy() {
        assert_eq!(check_strength("Aa1@aaaa"), Ok(()));
        assert_eq!(check_strength("Aa1@"), Err(PasswordError::Length));
        assert_eq!(check_strength("aa1@aaaa"), Err(PasswordError::Weak));
        assert_eq!(check_strength("AA1@AAAA"), Err(PasswordError::Weak));
        assert_eq!(check_strength("Aab@aaaa"), Err(PasswordError::Weak));
        assert_eq!(check_strength("Aa1#aaaa"), Err(PasswordError::Weak));
    }
}
