// src/handlers/auth.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    models::user::{RefreshRequest, TokenRequest, User},
    utils::{
        hash::verify_password,
        jwt::{sign_access, sign_refresh, verify_refresh},
    },
};

/// Issues an access/refresh token pair for valid credentials.
///
/// Unknown username, wrong password and inactive account all yield the same
/// generic 401, so the response never reveals which part was wrong.
pub async fn obtain_token(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<TokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password, bio, avatar, is_staff, is_active, created_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Token obtain DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let invalid = || AppError::AuthError("Invalid credentials".to_string());

    let user = user.ok_or_else(invalid)?;

    if !user.is_active || !verify_password(&payload.password, &user.password)? {
        return Err(invalid());
    }

    let access = sign_access(user.id, &config.jwt_secret, config.access_token_ttl)?;
    let refresh = sign_refresh(user.id, &config.jwt_secret, config.refresh_token_ttl)?;

    tracing::info!("Issued token pair for user {}", user.id);

    Ok(Json(json!({
        "access": access,
        "refresh": refresh,
    })))
}

/// Exchanges a valid refresh token for a new access token.
pub async fn refresh_token(
    State(config): State<Config>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let claims = verify_refresh(&payload.refresh, &config.jwt_secret)?;

    let user_id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    let access = sign_access(user_id, &config.jwt_secret, config.access_token_ttl)?;

    Ok(Json(json!({ "access": access })))
}
