use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use super::error::AuthError;

fn hashing_failure(stage: &'static str, e: password_hash::Error) -> AuthError {
    error!(error = %e, stage, "argon2 failure");
    AuthError::Hashing(format!("{stage}: {e}"))
}

/// One-way derivation into an argon2 PHC string. The salt is fresh per call.
pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| hashing_failure("hash", e))
}

/// Ok(false) on a mismatch. A stored value that is not a PHC string is an
/// internal fault, not a failed login.
pub fn verify_password(plain: &str, stored: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored).map_err(|e| hashing_failure("parse", e))?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(hashing_failure("verify", e)),
    }
}
