//! Password hashing with bcrypt.
//!
//! Stored hashes are standard `$2b$<cost>$<salt+digest>` strings. The cost
//! travels with each hash, so changing the configured cost never invalidates
//! existing users.

use crate::error::AccountError;

pub use bcrypt::DEFAULT_COST;

/// Lowest cost bcrypt accepts.
pub const MIN_COST: u32 = 4;

/// Highest cost bcrypt accepts.
pub const MAX_COST: u32 = 31;

/// Hashes a password with a fresh random salt.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AccountError> {
    bcrypt::hash(password, cost).map_err(|e| AccountError::Hashing(e.to_string()))
}

/// Verifies a password against a stored hash.
///
/// A hash bcrypt cannot parse is reported as [`AccountError::MalformedHash`].
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AccountError> {
    bcrypt::verify(password, hash).map_err(|_| AccountError::MalformedHash)
}
