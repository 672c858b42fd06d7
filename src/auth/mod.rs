//! Authentication: request payloads, password hashing, token signing, and the
//! extractor protected routes use to resolve the calling account.

pub mod password;
pub mod session;
pub mod token;

use serde::{Deserialize, Serialize};
use validator::Validate;

// Re-export the pieces handlers reach for.
pub use password::{hash_password, verify_password};
pub use session::AuthSession;
pub use token::{Claims, TokenSigner};

use crate::models::user::User;

/// Payload for `POST /users`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name for the new account.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Email address; stored lowercased and must be unique.
    #[validate(email)]
    pub email: String,
    /// At least 6 characters, and must not contain the word "password" in any
    /// casing.
    #[validate(
        length(min = 6),
        custom = "crate::auth::password::validate_password_content"
    )]
    pub password: String,
    /// Optional age; defaults to 0.
    #[validate(range(min = 0))]
    pub age: Option<i32>,
}

/// Payload for `POST /users/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

/// Body returned by registration and login: the public view of the account
/// plus the session token that was just issued for it.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}
