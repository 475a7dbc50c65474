//! Password hashing and verification using Argon2id.
//!
//! Credentials are stored as salted hashes; verification preserves the
//! plain authorize-or-Forbidden contract of the services.

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use outcome::{Error, Outcome};

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Outcome<String> {
    let salt = SaltString::generate(rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| Error::internal("failed to hash password"))?
        .to_string();
    Ok(hash)
}

/// Verify a password against a stored hash. A malformed stored hash
/// counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
