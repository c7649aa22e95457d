//! Error types and their HTTP mapping

use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Credential and session token failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid input: {}", .0.join(", "))]
    InvalidInput(Vec<String>),
    #[error("Username already registered")]
    AlreadyExists,
    #[error("User not found")]
    NotFound,
    #[error("Password doesn't match")]
    BadPassword,
    #[error("Token signature doesn't match")]
    InvalidSignature,
    #[error("Malformed token: {0}")]
    Malformed(jsonwebtoken::errors::Error),
    #[error("Missing subject on a token")]
    MissingSubject,
    #[error("Token has expired")]
    Expired,
    #[error("Cannot sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Credential store failure: {0}")]
    Store(#[from] sqlx::Error),
}

/// Weather archive failures
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Archive responded with {0}")]
    Upstream(u16),
    #[error("Archive unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Archive response unreadable: {0}")]
    Decode(reqwest::Error),
    #[error("Cannot look {0} days back")]
    Range(u32),
}

/// Failure returned to the client
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error")]
    Validation(Vec<String>),
    #[error("Username already registered")]
    AlreadyExists,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthenticated(&'static str),
    #[error("Not authenticated")]
    MissingAuth,
    #[error("Failed to retrieve weather data")]
    Upstream(StatusCode),
    #[error("Internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [String]>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::AlreadyExists => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::MissingAuth => StatusCode::FORBIDDEN,
            Self::Upstream(status) => *status,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let errors = match self {
            Self::Validation(errors) => Some(errors.as_slice()),
            _ => None,
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            detail: self.to_string(),
            errors,
        })
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(errors) => Self::Validation(errors),
            AuthError::AlreadyExists => Self::AlreadyExists,
            // Both cases look the same to the client
            AuthError::NotFound | AuthError::BadPassword => Self::InvalidCredentials,
            AuthError::Expired => Self::Unauthenticated("Token has expired"),
            AuthError::InvalidSignature | AuthError::Malformed(_) | AuthError::MissingSubject => {
                Self::Unauthenticated("Invalid token")
            }
            err @ (AuthError::Signing(_) | AuthError::Hash(_) | AuthError::Store(_)) => {
                error!(%err, "Authentication backend failure");
                Self::Internal
            }
        }
    }
}

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::Upstream(status) => {
                Self::Upstream(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY))
            }
            err @ (WeatherError::Transport(_) | WeatherError::Decode(_)) => {
                error!(%err, "Weather archive request failed");
                Self::Upstream(StatusCode::BAD_GATEWAY)
            }
            err @ WeatherError::Range(_) => Self::Validation(vec![err.to_string()]),
        }
    }
}

impl From<JsonPayloadError> for ApiError {
    fn from(err: JsonPayloadError) -> Self {
        Self::Validation(vec![err.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use serde_json::{json, Value};

    async fn body(err: ApiError) -> (StatusCode, Value) {
        let resp = err.error_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn login_failures_are_indistinguishable() {
        let not_found = body(AuthError::NotFound.into()).await;
        let bad_password = body(AuthError::BadPassword.into()).await;

        assert_eq!(not_found, bad_password);
        assert_eq!(
            not_found,
            (
                StatusCode::UNAUTHORIZED,
                json!({ "detail": "Invalid credentials" })
            )
        );
    }

    #[actix_web::test]
    async fn validation_lists_errors() {
        let err = AuthError::InvalidInput(vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(
            body(err.into()).await,
            (
                StatusCode::BAD_REQUEST,
                json!({ "detail": "Validation error", "errors": ["a", "b"] })
            )
        );
    }

    #[actix_web::test]
    async fn token_failures() {
        assert_eq!(
            body(AuthError::Expired.into()).await,
            (
                StatusCode::UNAUTHORIZED,
                json!({ "detail": "Token has expired" })
            )
        );
        assert_eq!(
            body(AuthError::MissingSubject.into()).await,
            (StatusCode::UNAUTHORIZED, json!({ "detail": "Invalid token" }))
        );
        assert_eq!(
            body(ApiError::MissingAuth).await,
            (StatusCode::FORBIDDEN, json!({ "detail": "Not authenticated" }))
        );
    }

    #[actix_web::test]
    async fn upstream_status_passes_through() {
        assert_eq!(
            body(WeatherError::Upstream(404).into()).await,
            (
                StatusCode::NOT_FOUND,
                json!({ "detail": "Failed to retrieve weather data" })
            )
        );
    }

    #[actix_web::test]
    async fn internal_failures_hide_cause() {
        let err = AuthError::Store(sqlx::Error::PoolTimedOut);
        assert_eq!(
            body(err.into()).await,
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "detail": "Internal server error" })
            )
        );
    }
}
