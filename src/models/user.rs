use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// Fields a `PATCH /users/me` body may touch. Any other key rejects the whole
/// request before anything is applied.
pub const ALLOWED_UPDATE_FIELDS: [&str; 4] = ["name", "email", "password", "age"];

/// An account row.
///
/// Credentials, session tokens, and the stored avatar never leave the server:
/// they are skipped on serialization, so handlers can return a `User`
/// directly without building a separate response type.
#[derive(Debug, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: i32,
    /// Salted bcrypt hash, never the plaintext.
    #[serde(skip_serializing)]
    pub password: String,
    /// Session tokens currently accepted for this account.
    #[serde(skip_serializing)]
    pub tokens: Vec<String>,
    /// Normalized avatar PNG, if one was uploaded.
    #[serde(skip_serializing)]
    pub avatar: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update. Absent fields keep their stored value.
#[derive(Debug, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(
        length(min = 6),
        custom = "crate::auth::password::validate_password_content"
    )]
    pub password: Option<String>,
    #[validate(range(min = 0))]
    pub age: Option<i32>,
}

/// Rejects the update wholesale if any key falls outside
/// [`ALLOWED_UPDATE_FIELDS`] — even when the other keys are valid.
pub fn ensure_allowed_update(body: &Value) -> Result<(), AppError> {
    let object = body
        .as_object()
        .ok_or_else(|| AppError::BadRequest("Expected a JSON object".into()))?;

    let valid = object
        .keys()
        .all(|key| ALLOWED_UPDATE_FIELDS.contains(&key.as_str()));
    if !valid {
        return Err(AppError::ValidationError("Invalid Updates".into()));
    }

    Ok(())
}
