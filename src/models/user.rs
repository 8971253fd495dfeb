// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Unique email address.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub bio: Option<String>,

    /// Optional avatar URL.
    pub avatar: Option<String>,

    pub is_staff: bool,

    /// Inactive accounts cannot obtain tokens.
    pub is_active: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub fn validate_avatar_url(avatar: &str) -> Result<(), ValidationError> {
    if url::Url::parse(avatar).is_err() {
        let mut err = ValidationError::new("url");
        err.message = Some("Avatar must be a valid URL.".into());
        return Err(err);
    }
    Ok(())
}

/// DTO for registration.
///
/// String fields default to empty on missing keys so that absent and blank
/// input produce the same field-level 400.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(
        min = 3,
        max = 150,
        message = "Username length must be between 3 and 150 characters."
    ))]
    pub username: String,

    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[serde(default)]
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,

    pub bio: Option<String>,

    #[validate(custom(function = validate_avatar_url))]
    pub avatar: Option<String>,
}

/// DTO for profile edits. Absent fields are left untouched.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(
        min = 3,
        max = 150,
        message = "Username length must be between 3 and 150 characters."
    ))]
    pub username: Option<String>,

    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,

    pub bio: Option<String>,

    #[validate(custom(function = validate_avatar_url))]
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,

    #[serde(default)]
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub new_password: String,
}

/// DTO for obtaining a token pair.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}
