// src/handlers/users.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{ChangePasswordRequest, RegisterRequest, UpdateProfileRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        jwt::AuthUser,
    },
};

const USER_COLUMNS: &str =
    "id, username, email, password, bio, avatar, is_staff, is_active, created_at";

/// Maps a unique-constraint violation on username/email to a field-level
/// 400. Anything else stays a 500.
fn map_unique_violation(e: sqlx::Error) -> AppError {
    let msg = e.to_string();
    if msg.contains("users_username_key") {
        AppError::BadRequest("A user with that username already exists.".to_string())
    } else if msg.contains("users_email_key") {
        AppError::BadRequest("A user with that email already exists.".to_string())
    } else {
        tracing::error!("User write failed: {:?}", e);
        AppError::from(e)
    }
}

async fn fetch_user(pool: &PgPool, id: i64) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::AuthError("User not found".to_string()))?;

    Ok(user)
}

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, email, password, bio, avatar)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(&payload.bio)
    .bind(&payload.avatar)
    .fetch_one(&pool)
    .await
    .map_err(map_unique_violation)?;

    tracing::info!("Registered user {} ({})", user.username, user.id);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Returns the authenticated user's profile.
pub async fn get_profile(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let user = fetch_user(&pool, user_id).await?;

    Ok(Json(user))
}

/// Updates the authenticated user's profile.
/// Permitted fields: username, email, bio, avatar. Absent fields are left
/// untouched; the password only changes via the dedicated endpoint.
pub async fn update_profile(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET username = COALESCE($2, username),
            email = COALESCE($3, email),
            bio = COALESCE($4, bio),
            avatar = COALESCE($5, avatar)
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&payload.bio)
    .bind(&payload.avatar)
    .fetch_optional(&pool)
    .await
    .map_err(map_unique_violation)?
    .ok_or(AppError::AuthError("User not found".to_string()))?;

    Ok(Json(user))
}

/// Replaces the authenticated user's password after verifying the old one.
pub async fn change_password(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = fetch_user(&pool, user_id).await?;

    if !verify_password(&payload.old_password, &user.password)? {
        return Err(AppError::BadRequest("Incorrect old password".to_string()));
    }

    let hashed_password = hash_password(&payload.new_password)?;

    sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
        .bind(user_id)
        .bind(&hashed_password)
        .execute(&pool)
        .await?;

    tracing::info!("Password changed for user {}", user_id);

    Ok(Json(json!({ "message": "Password updated successfully" })))
}
