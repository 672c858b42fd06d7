//!
//! # Error handling
//!
//! `AppError` is the single error type used across the crate. Every failure a
//! request can run into becomes one of its variants, and the
//! `actix_web::error::ResponseError` impl converts the variant into the HTTP
//! status and body the client sees — nothing propagates past the handler
//! boundary.
//!
//! `From` implementations cover the library errors that cross that boundary
//! (`sqlx::Error`, `validator::ValidationErrors`, `jsonwebtoken::errors::Error`,
//! `bcrypt::BcryptError`, `image::ImageError`) so handlers and services can
//! use the `?` operator throughout.

use actix_web::{error::ResponseError, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Failed or missing authentication (HTTP 401). The response body is a
    /// constant, so bad credentials, a bad token, and a revoked token are
    /// indistinguishable to the caller.
    Unauthorized(String),
    /// Malformed or disallowed input (HTTP 400).
    BadRequest(String),
    /// Input that failed a validation rule (HTTP 400).
    ValidationError(String),
    /// A rejected avatar upload (HTTP 400). Serialized as `{"err": message}`.
    UploadValidation(String),
    /// A missing resource (HTTP 404, empty body).
    NotFound(String),
    /// An unexpected server-side failure (HTTP 500, empty body).
    InternalServerError(String),
    /// A storage failure (HTTP 500, empty body).
    DatabaseError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            AppError::UploadValidation(msg) => write!(f, "Upload Error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            // One constant body for every authentication failure; the cause
            // stays in the server log.
            AppError::Unauthorized(_) => HttpResponse::Unauthorized().json(json!({
                "error": "Please authenticate"
            })),
            AppError::BadRequest(msg) | AppError::ValidationError(msg) => {
                HttpResponse::BadRequest().json(json!({
                    "error": msg
                }))
            }
            AppError::UploadValidation(msg) => HttpResponse::BadRequest().json(json!({
                "err": msg
            })),
            AppError::NotFound(_) => HttpResponse::NotFound().finish(),
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                HttpResponse::InternalServerError().finish()
            }
        }
    }
}

/// `sqlx::Error::RowNotFound` maps to 404; every other database error is a
/// generic storage failure.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

/// Bytes that cannot be decoded (or re-encoded) as an image get the same
/// message the extension check uses.
impl From<image::ImageError> for AppError {
    fn from(_: image::ImageError) -> AppError {
        AppError::UploadValidation("Please upload an image".into())
    }
}
