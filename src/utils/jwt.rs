// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

/// Distinguishes short-lived access tokens from long-lived refresh tokens.
/// A refresh token is never accepted on authenticated endpoints.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// Token kind: 'access' or 'refresh'.
    pub kind: TokenKind,
    /// Issued-at as Unix timestamp.
    pub iat: usize,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

fn sign_with_kind(
    id: i64,
    kind: TokenKind,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize;

    let claims = Claims {
        sub: id.to_string(), // Store User ID in 'sub' claim
        kind,
        iat: now,
        exp: now + expiration_seconds as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Signs a short-lived access token for the user.
pub fn sign_access(id: i64, secret: &str, expiration_seconds: u64) -> Result<String, AppError> {
    sign_with_kind(id, TokenKind::Access, secret, expiration_seconds)
}

/// Signs a long-lived refresh token for the user.
pub fn sign_refresh(id: i64, secret: &str, expiration_seconds: u64) -> Result<String, AppError> {
    sign_with_kind(id, TokenKind::Refresh, secret, expiration_seconds)
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Verifies a refresh token. Access tokens are rejected here so a leaked
/// short-lived token cannot mint new credentials.
pub fn verify_refresh(token: &str, secret: &str) -> Result<Claims, AppError> {
    let claims = verify_jwt(token, secret)?;

    if claims.kind != TokenKind::Refresh {
        return Err(AppError::AuthError("Invalid token".to_string()));
    }

    Ok(claims)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
}

/// Extractor for the authenticated user's ID.
///
/// Validates the 'Authorization: Bearer <token>' header against an access
/// token. Handlers taking `AuthUser` reject unauthenticated requests with
/// 401; handlers taking `Option<AuthUser>` treat a missing header as an
/// anonymous read.
pub struct AuthUser(pub i64);

impl<S> FromRequestParts<S> for AuthUser
where
    Config: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Config::from_ref(state);

        let token = bearer_token(parts).ok_or_else(|| {
            AppError::AuthError("Missing or malformed Authorization header".to_string())
        })?;

        let claims = verify_jwt(token, &config.jwt_secret)?;

        if claims.kind != TokenKind::Access {
            return Err(AppError::AuthError("Access token required".to_string()));
        }

        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

        Ok(AuthUser(user_id))
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    Config: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        // No header at all is an anonymous request; a header that fails
        // validation is still a 401.
        if parts.headers.get(header::AUTHORIZATION).is_none() {
            return Ok(None);
        }

        <AuthUser as FromRequestParts<S>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}
