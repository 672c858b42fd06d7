use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use sqlx::PgPool;
use uuid::Uuid;

use crate::accounts;
use crate::auth::token::TokenSigner;
use crate::error::AppError;
use crate::models::user::User;

/// The authenticated account for a protected request, together with the exact
/// token that proved it. Handlers take this as a parameter; nothing is
/// attached to shared request state.
///
/// Extraction succeeds only when the bearer token carries a valid signature
/// AND is still present in the account's `tokens` list — a signed token that
/// logout already removed is rejected here, and the handler never runs.
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

impl FromRequest for AuthSession {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            match authenticate(&req).await {
                Ok(session) => Ok(session),
                Err(err) => {
                    log::warn!("rejected request to {}: {}", req.path(), err);
                    Err(AppError::Unauthorized("Please authenticate".into()).into())
                }
            }
        })
    }
}

async fn authenticate(req: &HttpRequest) -> Result<AuthSession, AppError> {
    let pool = req
        .app_data::<web::Data<PgPool>>()
        .ok_or_else(|| AppError::InternalServerError("Database pool not configured".into()))?;
    let signer = req
        .app_data::<web::Data<TokenSigner>>()
        .ok_or_else(|| AppError::InternalServerError("Token signer not configured".into()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    let claims = signer.verify(token)?;

    // A valid signature is not enough: the token must still be on the account.
    let user = accounts::find_by_id_and_token(pool.get_ref(), claims.sub, token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Token revoked or unknown".into()))?;

    Ok(AuthSession {
        user,
        token: token.to_string(),
    })
}

/// Signs a fresh token for the account and appends it to the account's token
/// list in one statement.
pub async fn issue_token(
    pool: &PgPool,
    signer: &TokenSigner,
    user_id: Uuid,
) -> Result<String, AppError> {
    let token = signer.sign(user_id)?;

    sqlx::query("UPDATE users SET tokens = array_append(tokens, $1), updated_at = now() WHERE id = $2")
        .bind(&token)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(token)
}

/// Removes exactly the presented token; other sessions stay valid.
pub async fn revoke_token(pool: &PgPool, user_id: Uuid, token: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET tokens = array_remove(tokens, $1), updated_at = now() WHERE id = $2")
        .bind(token)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Clears every session for the account.
pub async fn revoke_all_tokens(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET tokens = '{}', updated_at = now() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}
