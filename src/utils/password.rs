use anyhow::{Context, Result};
use std::sync::OnceLock;

/// bcrypt work factor, overridable with `BCRYPT_COST` (clamped to bcrypt's
/// accepted range).
fn cost() -> u32 {
    static COST: OnceLock<u32> = OnceLock::new();
    *COST.get_or_init(|| {
        std::env::var("BCRYPT_COST")
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .map(|c| c.clamp(4, 31))
            .unwrap_or(bcrypt::DEFAULT_COST)
    })
}

/// Derive a salted hash for storage.
pub fn hash(password: &str) -> Result<String> {
    bcrypt::hash(password, cost()).context("Failed to hash password")
}

/// Check a submitted password against a stored hash.
pub fn verify(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).context("Failed to verify password")
}
