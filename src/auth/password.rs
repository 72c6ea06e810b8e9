use crate::error::AppError;
use bcrypt::{hash, verify, DEFAULT_COST};

/// bcrypt work factor, overridable with `BCRYPT_COST` (tests use the minimum of 4).
fn cost() -> u32 {
    std::env::var("BCRYPT_COST")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_COST)
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, cost())
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    verify(password, hashed_password)
        .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
}

/// Fails with `mismatch` unless `password` matches `hashed_password`.
pub fn ensure_password(
    password: &str,
    hashed_password: &str,
    mismatch: AppError,
) -> Result<(), AppError> {
    if verify_password(password, hashed_password)? {
        Ok(())
    } else {
        Err(mismatch)
    }
}
