use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Valid non-empty categories. The empty string is the unset default.
pub const CATEGORIES: [&str; 4] = ["event", "sale", "help", "misc"];

pub fn validate_category(category: &str) -> Result<(), ValidationError> {
    if category.is_empty() || CATEGORIES.contains(&category) {
        return Ok(());
    }
    let mut err = ValidationError::new("category");
    err.message = Some("Category must be one of: event, sale, help, misc.".into());
    Err(err)
}

/// One row of the ping listing query: the 'pings' table joined with its
/// owner and the computed vote columns.
#[derive(Debug, Clone, FromRow)]
pub struct PingRow {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub category: String,
    pub location: String,
    pub is_anonymous: bool,
    pub hashtags: String,
    pub seo_description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,

    // Owner columns.
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub user_created_at: chrono::DateTime<chrono::Utc>,

    // Computed per request.
    pub vote_count: i64,
    pub user_has_upvoted: bool,
    pub user_has_downvoted: bool,
}

/// Owner fields embedded in a ping response.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// API shape of a ping. `hashtags` and `seo_description` are stored but
/// intentionally absent here.
#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub id: i64,
    pub text: String,
    pub category: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub user: PublicUser,
    pub location: String,
    pub is_anonymous: bool,
    pub display_name: String,
    pub vote_count: i64,
    pub user_has_upvoted: bool,
    pub user_has_downvoted: bool,
}

impl From<PingRow> for PingResponse {
    fn from(row: PingRow) -> Self {
        let display_name = if row.is_anonymous {
            "Anonymous".to_string()
        } else {
            row.username.clone()
        };

        Self {
            id: row.id,
            text: row.text,
            category: row.category,
            timestamp: row.created_at,
            user: PublicUser {
                id: row.user_id,
                username: row.username,
                email: row.email,
                bio: row.bio,
                avatar: row.avatar,
                created_at: row.user_created_at,
            },
            location: row.location,
            is_anonymous: row.is_anonymous,
            display_name,
            vote_count: row.vote_count,
            user_has_upvoted: row.user_has_upvoted,
            user_has_downvoted: row.user_has_downvoted,
        }
    }
}

/// DTO for creating a new ping.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePingRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 280,
        message = "Text length must be between 1 and 280 characters."
    ))]
    pub text: String,

    #[serde(default)]
    #[validate(custom(function = validate_category))]
    pub category: String,

    #[serde(default)]
    #[validate(length(max = 100, message = "Location must be at most 100 characters."))]
    pub location: String,

    #[serde(default)]
    pub is_anonymous: bool,
}

/// DTO for editing a ping. Only text, category and location are mutable;
/// absent fields are left untouched.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePingRequest {
    #[validate(length(
        min = 1,
        max = 280,
        message = "Text length must be between 1 and 280 characters."
    ))]
    pub text: Option<String>,

    #[validate(custom(function = validate_category))]
    pub category: Option<String>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters."))]
    pub location: Option<String>,
}

/// Query parameters for listing pings.
#[derive(Debug, Deserialize)]
pub struct PingListParams {
    /// Exact category match.
    pub category: Option<String>,

    /// Exact location match.
    pub location: Option<String>,

    /// Case-insensitive substring search over text and location.
    pub search: Option<String>,

    /// 'timestamp', '-timestamp', 'vote_count' or '-vote_count'.
    /// Anything else falls back to the default '-timestamp'.
    pub ordering: Option<String>,

    /// 1-based page number.
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub vote_type: String,
}

/// Page envelope for ping listings.
#[derive(Debug, Serialize)]
pub struct PaginatedPings {
    pub count: i64,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<PingResponse>,
}
