use crate::error::AppError;
use bcrypt::{hash, verify};
use validator::ValidationError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, 12) // bcrypt default cost is 12
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    verify(password, hashed_password)
        .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
}

/// Validator hook for password fields: the literal word "password" is not
/// allowed anywhere in the value, regardless of casing.
pub fn validate_password_content(password: &str) -> Result<(), ValidationError> {
    if password.to_lowercase().contains("password") {
        let mut error = ValidationError::new("forbidden_password");
        error.message = Some("Password cannot contain the word \"password\"".into());
        return Err(error);
    }
    Ok(())
}
