use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::warn;

use crate::error::{Error, Result};

/// Hashes a password with Argon2id and a fresh random salt, producing a PHC
/// string for the `password` column.
pub fn hash(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| Error::PasswordHash(e.to_string()))?
        .to_string();
    Ok(hash)
}

/// Checks a password against a stored PHC string. A stored value that does
/// not parse counts as a failed match, so login degrades instead of erroring
/// on legacy or damaged rows.
pub fn verify(plain: &str, stored: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "stored password is not a valid phc string");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash("secret1").expect("hashing should succeed");
        assert!(verify("secret1", &hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash("correct-horse-battery-staple").expect("hashing should succeed");
        assert!(!verify("wrong-password", &hash));
    }

    #[test]
    fn verify_treats_malformed_hash_as_mismatch() {
        assert!(!verify("anything", "not-a-valid-hash"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash("secret1").unwrap();
        let b = hash("secret1").unwrap();
        assert_ne!(a, b);
    }
}
