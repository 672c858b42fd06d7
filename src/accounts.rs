//!
//! # Account lifecycle
//!
//! Explicit service-layer steps for everything that touches an account row:
//! creation, credential lookup, profile update, deletion, and avatar storage.
//! Password hashing happens here and nowhere else — on creation and when an
//! update carries a new plaintext — so a stored hash can never be rehashed.
//! Account deletion removes the account's tasks in the same transaction.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::RegisterRequest;
use crate::error::AppError;
use crate::models::user::{User, UserUpdate};

const USER_COLUMNS: &str = "id, name, email, age, password, tokens, avatar, created_at, updated_at";

/// Inserts a new account with a hashed password. Emails are stored lowercased
/// and must be unique.
pub async fn create_account(pool: &PgPool, input: RegisterRequest) -> Result<User, AppError> {
    let email = input.email.trim().to_lowercase();

    let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let password_hash = hash_password(&input.password)?;

    let sql = format!(
        "INSERT INTO users (id, name, email, age, password) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {}",
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(Uuid::new_v4())
        .bind(input.name.trim())
        .bind(&email)
        .bind(input.age.unwrap_or(0))
        .bind(&password_hash)
        .fetch_one(pool)
        .await?;

    Ok(user)
}

/// Looks up an account by email and checks the password against the stored
/// hash. Both failure causes produce the same error, so a caller cannot probe
/// which addresses are registered.
pub async fn find_by_credentials(
    pool: &PgPool,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;

    let user = user.ok_or_else(|| AppError::Unauthorized("Unable to login".into()))?;

    if !verify_password(password, &user.password)? {
        return Err(AppError::Unauthorized("Unable to login".into()));
    }

    Ok(user)
}

/// Applies an allow-listed partial update and persists it in one statement.
/// A new plaintext password is hashed here; when the field is absent the
/// stored hash is written back untouched.
pub async fn update_account(
    pool: &PgPool,
    user: &User,
    changes: UserUpdate,
) -> Result<User, AppError> {
    let name = match changes.name {
        Some(name) => name.trim().to_string(),
        None => user.name.clone(),
    };
    let email = match changes.email {
        Some(email) => email.trim().to_lowercase(),
        None => user.email.clone(),
    };
    let age = changes.age.unwrap_or(user.age);
    let password = match changes.password {
        Some(plaintext) => hash_password(&plaintext)?,
        None => user.password.clone(),
    };

    if email != user.email {
        let taken = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(pool)
            .await?;
        if taken.is_some() {
            return Err(AppError::BadRequest("Email already registered".into()));
        }
    }

    let sql = format!(
        "UPDATE users SET name = $1, email = $2, age = $3, password = $4, updated_at = now() \
         WHERE id = $5 RETURNING {}",
        USER_COLUMNS
    );
    let updated = sqlx::query_as::<_, User>(&sql)
        .bind(&name)
        .bind(&email)
        .bind(age)
        .bind(&password)
        .bind(user.id)
        .fetch_one(pool)
        .await?;

    Ok(updated)
}

/// Removes the account and every task it owns in one transaction. Either both
/// disappear or neither does.
pub async fn delete_account(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM tasks WHERE owner = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Resolves an account only when the given token is still in its token list.
/// Used by session extraction; returns `None` for unknown ids and revoked
/// tokens alike.
pub async fn find_by_id_and_token(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
) -> Result<Option<User>, AppError> {
    let sql = format!(
        "SELECT {} FROM users WHERE id = $1 AND $2 = ANY(tokens)",
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .bind(token)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Stores a normalized avatar, replacing any prior value.
pub async fn store_avatar(pool: &PgPool, user_id: Uuid, png: &[u8]) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET avatar = $1, updated_at = now() WHERE id = $2")
        .bind(png)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn clear_avatar(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET avatar = NULL, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Fetches the stored avatar bytes, failing with `NotFound` when the account
/// does not exist or has no avatar.
pub async fn find_avatar(pool: &PgPool, user_id: Uuid) -> Result<Vec<u8>, AppError> {
    let avatar =
        sqlx::query_scalar::<_, Option<Vec<u8>>>("SELECT avatar FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    avatar
        .flatten()
        .ok_or_else(|| AppError::NotFound("Avatar not found".into()))
}
