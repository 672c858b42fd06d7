use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use futures::TryStreamExt;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    accounts,
    auth::{session, AuthResponse, AuthSession, LoginRequest, RegisterRequest, TokenSigner},
    avatar,
    error::AppError,
    mailer::Mailer,
    models::user::{self, User, UserUpdate},
};

/// Register a new account.
///
/// Creates the account, fires the welcome email, and opens the first session.
#[post("/users")]
pub async fn register(
    pool: web::Data<PgPool>,
    signer: web::Data<TokenSigner>,
    mailer: web::Data<Mailer>,
    input: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    input.validate()?;

    let user = accounts::create_account(&pool, input.into_inner()).await?;

    spawn_mail(&mailer, &user, MailKind::Welcome);

    let token = session::issue_token(&pool, &signer, user.id).await?;

    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

/// Login with email and password.
///
/// Issues a fresh session token on success. The failure response does not say
/// whether the email or the password was wrong.
#[post("/users/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    signer: web::Data<TokenSigner>,
    credentials: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    credentials.validate()?;

    let user =
        accounts::find_by_credentials(&pool, &credentials.email, &credentials.password).await?;

    let token = session::issue_token(&pool, &signer, user.id).await?;

    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

/// End the current session. Tokens issued to other devices stay valid.
#[post("/users/logout")]
pub async fn logout(
    pool: web::Data<PgPool>,
    session_data: AuthSession,
) -> Result<impl Responder, AppError> {
    session::revoke_token(&pool, session_data.user.id, &session_data.token).await?;

    Ok(HttpResponse::Ok().finish())
}

/// End every session for the account.
#[post("/users/logoutall")]
pub async fn logout_all(
    pool: web::Data<PgPool>,
    session_data: AuthSession,
) -> Result<impl Responder, AppError> {
    session::revoke_all_tokens(&pool, session_data.user.id).await?;

    Ok(HttpResponse::Ok().finish())
}

/// The caller's own profile, with credentials and avatar stripped.
#[get("/users/me")]
pub async fn profile(session_data: AuthSession) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(session_data.user))
}

/// Partial profile update.
///
/// The raw body is checked against the allow-list first, so an unknown key
/// rejects the request before anything is applied.
#[patch("/users/me")]
pub async fn update_profile(
    pool: web::Data<PgPool>,
    session_data: AuthSession,
    body: web::Json<serde_json::Value>,
) -> Result<impl Responder, AppError> {
    let body = body.into_inner();
    user::ensure_allowed_update(&body)?;

    let changes: UserUpdate = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid update payload: {}", e)))?;
    changes.validate()?;

    let updated = accounts::update_account(&pool, &session_data.user, changes).await?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Delete the caller's account, cascading to its tasks, then send the
/// cancellation email.
#[delete("/users/me")]
pub async fn delete_profile(
    pool: web::Data<PgPool>,
    mailer: web::Data<Mailer>,
    session_data: AuthSession,
) -> Result<impl Responder, AppError> {
    accounts::delete_account(&pool, session_data.user.id).await?;

    spawn_mail(&mailer, &session_data.user, MailKind::Cancellation);

    Ok(HttpResponse::Ok().json(session_data.user))
}

/// Accept an avatar upload from the multipart field "avatar", normalize it,
/// and store it on the account.
#[post("/users/me/avatar")]
pub async fn upload_avatar(
    pool: web::Data<PgPool>,
    session_data: AuthSession,
    mut payload: Multipart,
) -> Result<impl Responder, AppError> {
    let mut image_bytes: Option<Vec<u8>> = None;

    while let Some(mut field) = payload.try_next().await.map_err(invalid_upload)? {
        if field.name() != "avatar" {
            continue;
        }

        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_owned)
            .ok_or_else(|| AppError::UploadValidation("Please upload an image".into()))?;
        if !avatar::acceptable_filename(&filename) {
            return Err(AppError::UploadValidation("Please upload an image".into()));
        }

        // Enforce the size cap while reading so an oversized upload is cut
        // off instead of buffered.
        let mut buffer = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(invalid_upload)? {
            if buffer.len() + chunk.len() > avatar::MAX_AVATAR_BYTES {
                return Err(AppError::UploadValidation("File too large".into()));
            }
            buffer.extend_from_slice(&chunk);
        }

        image_bytes = Some(buffer);
    }

    let bytes =
        image_bytes.ok_or_else(|| AppError::UploadValidation("Please upload an image".into()))?;

    let png = avatar::normalize(&bytes)?;
    accounts::store_avatar(&pool, session_data.user.id, &png).await?;

    Ok(HttpResponse::Ok().finish())
}

/// Remove the caller's avatar.
#[delete("/users/me/avatar")]
pub async fn delete_avatar(
    pool: web::Data<PgPool>,
    session_data: AuthSession,
) -> Result<impl Responder, AppError> {
    accounts::clear_avatar(&pool, session_data.user.id).await?;

    Ok(HttpResponse::Ok().finish())
}

/// Fetch any account's avatar by id. Public; 404 when the account or avatar
/// is missing.
#[get("/users/{id}/avatar")]
pub async fn get_avatar(
    pool: web::Data<PgPool>,
    user_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let png = accounts::find_avatar(&pool, user_id.into_inner()).await?;

    Ok(HttpResponse::Ok().content_type("image/png").body(png))
}

enum MailKind {
    Welcome,
    Cancellation,
}

/// Mail is best-effort: the send runs on its own task and a failure is
/// logged, never surfaced to the client.
fn spawn_mail(mailer: &web::Data<Mailer>, user: &User, kind: MailKind) {
    let mailer = mailer.get_ref().clone();
    let email = user.email.clone();
    let name = user.name.clone();

    tokio::spawn(async move {
        let result = match kind {
            MailKind::Welcome => mailer.send_welcome_email(&email, &name).await,
            MailKind::Cancellation => mailer.send_cancellation_email(&email, &name).await,
        };
        if let Err(err) = result {
            log::error!("account email to {} failed: {}", email, err);
        }
    });
}

fn invalid_upload(error: actix_multipart::MultipartError) -> AppError {
    AppError::UploadValidation(format!("Invalid upload: {}", error))
}
