use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::Header;
use actix_web::{web, FromRequest, HttpRequest};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation,
};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, AuthError};
use crate::models::Claims;

/// Session token lifetime unless configured otherwise
pub const TOKEN_TTL_MINUTES: i64 = 15;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims as they come out of a token, before the required ones are checked
#[derive(Deserialize)]
struct RawClaims {
    name: Option<String>,
    exp: Option<i64>,
}

/// Session token issuer and validator
///
/// Tokens are stateless: nothing about issued tokens is kept, a token is good as long as its
/// signature matches and it didn't expire yet.
pub struct Tokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Tokens {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Signs a token for `name` expiring after the configured lifetime
    pub fn issue(&self, name: &str) -> Result<String, AuthError> {
        self.issue_at(name, Utc::now())
    }

    /// Signs a token as if it was issued at `now`
    pub fn issue_at(&self, name: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            name: name.to_owned(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&JwtHeader::new(ALGORITHM), &claims, &self.encoding).map_err(AuthError::Signing)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate_at(token, Utc::now())
    }

    /// Verifies the token signature and checks its claims against `now`
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        // Expiry is checked below, without the library leeway
        let mut validation = Validation::new(ALGORITHM);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let claims = decode::<RawClaims>(token, &self.decoding, &validation)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::Malformed(err),
            })?
            .claims;

        let name = claims
            .name
            .filter(|name| !name.is_empty())
            .ok_or(AuthError::MissingSubject)?;

        match claims.exp {
            Some(exp) if now.timestamp() < exp => Ok(Claims { name, exp }),
            _ => Err(AuthError::Expired),
        }
    }
}

/// Claims of the bearer token the request was authenticated with
#[derive(Debug)]
pub struct AuthenticatedUser(pub Claims);

impl AuthenticatedUser {
    fn authenticate(req: &HttpRequest) -> Result<Self, ApiError> {
        // Both a missing header and a non-bearer scheme count as no credentials
        let bearer = Authorization::<Bearer>::parse(req)
            .map_err(|_| ApiError::MissingAuth)?
            .into_scheme();

        let tokens = req.app_data::<web::Data<Tokens>>().ok_or_else(|| {
            tracing::error!("Token validator is not registered");
            ApiError::Internal
        })?;

        let claims = tokens.validate(bearer.token()).map_err(|err| {
            debug!(%err, "Rejected bearer token");
            ApiError::from(err)
        })?;

        Ok(Self(claims))
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::authenticate(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "test key";

    fn tokens() -> Tokens {
        Tokens::new(SECRET, Duration::minutes(TOKEN_TTL_MINUTES))
    }

    fn sign(claims: serde_json::Value) -> String {
        encode(
            &JwtHeader::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn validate_issued_token() {
        let tokens = tokens();

        for name in ["user1", "User Two", "ünïcødé", " "] {
            let token = tokens.issue(name).unwrap();
            let claims = tokens.validate(&token).unwrap();
            assert_eq!(claims.name, name);
        }
    }

    #[test]
    fn token_expires_after_ttl() {
        let tokens = tokens();
        let now = Utc::now();

        let token = tokens.issue_at("user1", now).unwrap();
        let claims = tokens.validate_at(&token, now).unwrap();
        assert_eq!(claims.exp, now.timestamp() + TOKEN_TTL_MINUTES * 60);

        // Still valid right before the expiry, rejected at it
        let expiry = now + Duration::minutes(TOKEN_TTL_MINUTES);
        tokens
            .validate_at(&token, expiry - Duration::seconds(1))
            .unwrap();
        let err = tokens.validate_at(&token, expiry).unwrap_err();
        assert!(matches!(err, AuthError::Expired));
    }

    #[test]
    fn expired_token_rejected() {
        let tokens = tokens();
        let token = tokens
            .issue_at("user1", Utc::now() - Duration::minutes(16))
            .unwrap();

        let err = tokens.validate(&token).unwrap_err();
        assert!(matches!(err, AuthError::Expired));
    }

    #[test]
    fn foreign_signature_rejected() {
        let other = Tokens::new("other key", Duration::minutes(TOKEN_TTL_MINUTES));
        let token = other.issue("user1").unwrap();

        let err = tokens().validate(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn swapped_payload_rejected() {
        let tokens = tokens();
        let token1 = tokens.issue("user1").unwrap();
        let token2 = tokens.issue("admin").unwrap();

        let parts1: Vec<_> = token1.split('.').collect();
        let parts2: Vec<_> = token2.split('.').collect();
        let forged = format!("{}.{}.{}", parts1[0], parts2[1], parts1[2]);

        let err = tokens.validate(&forged).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn garbage_rejected() {
        let tokens = tokens();
        for token in ["", "fake_token", "a.b.c"] {
            let err = tokens.validate(token).unwrap_err();
            assert!(matches!(err, AuthError::Malformed(_)), "{token}: {err}");
        }
    }

    #[test]
    fn missing_subject_rejected() {
        let tokens = tokens();
        let exp = (Utc::now() + Duration::minutes(5)).timestamp();

        let err = tokens.validate(&sign(json!({ "exp": exp }))).unwrap_err();
        assert!(matches!(err, AuthError::MissingSubject));

        let err = tokens
            .validate(&sign(json!({ "name": "", "exp": exp })))
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingSubject));
    }

    #[test]
    fn missing_expiry_rejected() {
        let err = tokens()
            .validate(&sign(json!({ "name": "user1" })))
            .unwrap_err();
        assert!(matches!(err, AuthError::Expired));
    }
}
