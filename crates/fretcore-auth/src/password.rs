//! Password hashing, strength policy, and temporary-password generation.
//!
//! Hashing uses Argon2id (adaptive cost). Hashes are never logged — callers
//! must not put `password_hash` into a `tracing` field.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;

use fretcore_domain::error::{Error, Result};

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Internal(format!("password hash: {e}")))
}

/// Verify a plaintext password against a stored Argon2 hash string.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Generate a URL-safe temporary password (12 printable characters).
pub fn generate_temp_password() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";
    let mut rng = rand::thread_rng();
    (0..12)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Password strength policy: length >= 8, at least one upper, one lower,
/// one digit. Returns `Err` with a user-facing message on failure.
pub fn validate_password_strength(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(Error::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(Error::Validation(
            "password must contain at least one uppercase letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(Error::Validation(
            "password must contain at least one lowercase letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(Error::Validation(
            "password must contain at least one digit".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("Sup3rSecret").unwrap();
        assert!(verify_password("Sup3rSecret", &hash));
        assert!(!verify_password("WrongPassword1", &hash));
    }

    #[test]
    fn strength_rejects_short() {
        assert!(validate_password_strength("Ab1").is_err());
    }

    #[test]
    fn strength_rejects_no_upper() {
        assert!(validate_password_strength("lowercase1").is_err());
    }

    #[test]
    fn strength_rejects_no_digit() {
        assert!(validate_password_strength("NoDigitsHere").is_err());
    }

    #[test]
    fn strength_accepts_valid() {
        assert!(validate_password_strength("Valid1Password").is_ok());
    }

    #[test]
    fn temp_password_has_expected_length() {
        assert_eq!(generate_temp_password().len(), 12);
    }
}
