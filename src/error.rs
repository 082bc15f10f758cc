//! Unified error types for Verigate.
//! Used by: verification, accounts, mailer, session, handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("verification failed")]
    VerificationFailed,

    #[error("email not verified")]
    NotVerified,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("session token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidInput(_) | Error::InvalidCredentials => StatusCode::BAD_REQUEST,
            Error::VerificationFailed => StatusCode::UNAUTHORIZED,
            Error::NotVerified => StatusCode::FORBIDDEN,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Error::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::Database(_)
            | Error::Serialization(_)
            | Error::Jwt(_)
            | Error::Password(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Maps a poisoned mutex into an internal error naming the guarded resource.
pub fn lock_err<T>(name: &'static str) -> impl FnOnce(std::sync::PoisonError<T>) -> Error {
    move |_| Error::Internal(format!("{name} lock poisoned"))
}
