use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issued tokens expire a day after signing. Revocation through the account's
/// token list is the primary control; the expiry just bounds how long a
/// forgotten token stays verifiable.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Claims encoded in a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The account this session belongs to.
    pub sub: Uuid,
    /// Expiration timestamp, seconds since epoch.
    pub exp: usize,
}

/// Signs and verifies session tokens.
///
/// Built once at startup from the configured secret and shared through app
/// data, so no request path ever reads the process environment.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Produces a signed token for the given account id, expiring in
    /// [`TOKEN_TTL_HOURS`].
    pub fn sign(&self, user_id: Uuid) -> Result<String, AppError> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
            .expect("valid timestamp")
            .timestamp() as usize;

        let claims = Claims {
            sub: user_id,
            exp: expiration,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Checks the signature and expiry and returns the decoded claims.
    /// Whether the token is still accepted for its account is a separate
    /// question answered against storage.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }
}
