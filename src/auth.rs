//! Bearer token verification.
//!
//! Tokens are HS256 JWTs issued elsewhere; `sub` carries the user identity.

use axum::http::StatusCode;
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::HttpError;
use crate::impl_into_response;

/// JWT claims accepted by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub exp: i64,    // expiry
    #[serde(default)]
    pub iat: i64, // issued at
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid authorization header")]
    MalformedHeader,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,
}

impl HttpError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::MalformedHeader | Self::InvalidToken => Some("INVALID_TOKEN"),
            Self::TokenExpired => Some("TOKEN_EXPIRED"),
        }
    }
}

impl_into_response!(AuthError);

/// Verify a bearer token and return the user id it was issued for
pub fn verify_token(token: &str, secret: &str) -> Result<String, AuthError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<Claims>(token, &key, &Validation::default()).map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    })?;

    if data.claims.sub.trim().is_empty() {
        return Err(AuthError::InvalidToken);
    }

    Ok(data.claims.sub)
}
