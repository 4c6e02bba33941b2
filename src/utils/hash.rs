use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use crate::error::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .to_string();

    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Whether a submitted password leaves the stored one as it is.
///
/// True when the submission verifies against the stored hash, or is the
/// stored hash string itself. Accounts without a password never match.
pub fn is_current_password(submitted: &str, stored: Option<&str>) -> bool {
    match stored {
        None => false,
        Some(stored) if stored == submitted => true,
        Some(stored) => verify_password(submitted, stored).unwrap_or(false),
    }
}
