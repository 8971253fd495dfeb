// src/handlers/pings.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::ping::{
        CreatePingRequest, PaginatedPings, PingListParams, PingResponse, PingRow,
        UpdatePingRequest,
    },
    utils::{
        jwt::AuthUser,
        seo::{build_seo_description, extract_hashtags},
    },
};

pub const PAGE_SIZE: i64 = 20;

/// Shared SELECT for ping reads: the row, its owner, and the per-request
/// vote columns. `$1` is the viewer's user ID (NULL for anonymous reads,
/// which makes both EXISTS checks false).
const PING_SELECT: &str = r#"
SELECT
    p.id, p.user_id, p.text, p.category, p.location, p.is_anonymous,
    p.hashtags, p.seo_description, p.created_at,
    u.username, u.email, u.bio, u.avatar, u.created_at AS user_created_at,
    ((SELECT COUNT(*) FROM ping_upvotes v WHERE v.ping_id = p.id)
        - (SELECT COUNT(*) FROM ping_downvotes v WHERE v.ping_id = p.id)) AS vote_count,
    EXISTS(SELECT 1 FROM ping_upvotes v WHERE v.ping_id = p.id AND v.user_id = $1::BIGINT) AS user_has_upvoted,
    EXISTS(SELECT 1 FROM ping_downvotes v WHERE v.ping_id = p.id AND v.user_id = $1::BIGINT) AS user_has_downvoted
FROM pings p
JOIN users u ON u.id = p.user_id
"#;

async fn fetch_ping(
    pool: &PgPool,
    id: i64,
    viewer: Option<i64>,
) -> Result<Option<PingRow>, AppError> {
    let sql = format!("{PING_SELECT} WHERE p.id = $2");

    let row = sqlx::query_as::<_, PingRow>(&sql)
        .bind(viewer)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Fetches one page of pings for the global feed (`owner` = None) or a
/// single user's feed (`owner` = Some). Filters, search, ordering and
/// pagination are applied here; handlers stay a thin shell around this.
async fn fetch_ping_page(
    pool: &PgPool,
    viewer: Option<i64>,
    owner: Option<i64>,
    params: &PingListParams,
) -> Result<PaginatedPings, AppError> {
    // Blank query values behave like absent ones.
    let category = params.category.as_deref().filter(|s| !s.is_empty());
    let location = params.location.as_deref().filter(|s| !s.is_empty());
    let search = params.search.as_deref().filter(|s| !s.is_empty());

    // Whitelisted ORDER BY fragments. Unknown ordering values fall back to
    // the default instead of erroring.
    let order = match params.ordering.as_deref() {
        Some("timestamp") => "p.created_at ASC",
        Some("vote_count") => "vote_count ASC, p.created_at DESC",
        Some("-vote_count") => "vote_count DESC, p.created_at DESC",
        _ => "p.created_at DESC",
    };

    let page = params.page.unwrap_or(1).max(1);
    let offset = (page as i64 - 1) * PAGE_SIZE;

    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM pings p
        WHERE ($1::TEXT IS NULL OR p.category = $1)
          AND ($2::TEXT IS NULL OR p.location = $2)
          AND ($3::TEXT IS NULL OR p.text ILIKE '%' || $3 || '%' OR p.location ILIKE '%' || $3 || '%')
          AND ($4::BIGINT IS NULL OR p.user_id = $4)
        "#,
    )
    .bind(category)
    .bind(location)
    .bind(search)
    .bind(owner)
    .fetch_one(pool)
    .await?;

    if page > 1 && offset >= count {
        return Err(AppError::NotFound("Invalid page.".to_string()));
    }

    let sql = format!(
        r#"{PING_SELECT}
        WHERE ($2::TEXT IS NULL OR p.category = $2)
          AND ($3::TEXT IS NULL OR p.location = $3)
          AND ($4::TEXT IS NULL OR p.text ILIKE '%' || $4 || '%' OR p.location ILIKE '%' || $4 || '%')
          AND ($5::BIGINT IS NULL OR p.user_id = $5)
        ORDER BY {order}
        LIMIT $6 OFFSET $7
        "#
    );

    let rows = sqlx::query_as::<_, PingRow>(&sql)
        .bind(viewer)
        .bind(category)
        .bind(location)
        .bind(search)
        .bind(owner)
        .bind(PAGE_SIZE)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list pings: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let next = if offset + (rows.len() as i64) < count {
        Some(page + 1)
    } else {
        None
    };
    let previous = if page > 1 { Some(page - 1) } else { None };

    Ok(PaginatedPings {
        count,
        next,
        previous,
        results: rows.into_iter().map(PingResponse::from).collect(),
    })
}

/// Global feed. Readable without authentication; a bearer token only adds
/// the caller's vote flags to each row.
pub async fn list_pings(
    State(pool): State<PgPool>,
    viewer: Option<AuthUser>,
    Query(params): Query<PingListParams>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = viewer.map(|AuthUser(id)| id);

    let page = fetch_ping_page(&pool, viewer, None, &params).await?;

    Ok(Json(page))
}

/// The authenticated user's own pings, newest first.
pub async fn list_user_pings(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<PingListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = fetch_ping_page(&pool, Some(user_id), Some(user_id), &params).await?;

    Ok(Json(page))
}

/// Creates a ping. Hashtags and the SEO description are derived here, once;
/// later edits do not refresh them.
pub async fn create_ping(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreatePingRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashtags = extract_hashtags(&payload.text);
    let seo_description = build_seo_description(&payload.text, &hashtags);

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO pings (user_id, text, category, location, is_anonymous, hashtags, seo_description)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&payload.text)
    .bind(&payload.category)
    .bind(&payload.location)
    .bind(payload.is_anonymous)
    .bind(hashtags.join(","))
    .bind(&seo_description)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create ping: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let row = fetch_ping(&pool, id, Some(user_id))
        .await?
        .ok_or(AppError::InternalServerError(
            "Ping missing after insert".to_string(),
        ))?;

    Ok((StatusCode::CREATED, Json(PingResponse::from(row))))
}

/// Get a single ping by ID.
pub async fn get_ping(
    State(pool): State<PgPool>,
    viewer: Option<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = viewer.map(|AuthUser(id)| id);

    let row = fetch_ping(&pool, id, viewer)
        .await?
        .ok_or(AppError::NotFound("Ping not found".to_string()))?;

    Ok(Json(PingResponse::from(row)))
}

/// Edits a ping. Owner only; permitted fields are text, category and
/// location. hashtags/seo_description keep their creation-time values.
pub async fn update_ping(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePingRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let owner: Option<i64> = sqlx::query_scalar("SELECT user_id FROM pings WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    let owner = owner.ok_or(AppError::NotFound("Ping not found".to_string()))?;

    if owner != user_id {
        return Err(AppError::Forbidden(
            "You can only edit your own pings.".to_string(),
        ));
    }

    sqlx::query(
        r#"
        UPDATE pings
        SET text = COALESCE($2, text),
            category = COALESCE($3, category),
            location = COALESCE($4, location)
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&payload.text)
    .bind(&payload.category)
    .bind(&payload.location)
    .execute(&pool)
    .await?;

    let row = fetch_ping(&pool, id, Some(user_id))
        .await?
        .ok_or(AppError::NotFound("Ping not found".to_string()))?;

    Ok(Json(PingResponse::from(row)))
}

/// Deletes a ping. Owner only. Vote memberships go with it via the
/// cascading foreign keys.
pub async fn delete_ping(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let owner: Option<i64> = sqlx::query_scalar("SELECT user_id FROM pings WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    let owner = owner.ok_or(AppError::NotFound("Ping not found".to_string()))?;

    if owner != user_id {
        return Err(AppError::Forbidden(
            "You can only delete your own pings.".to_string(),
        ));
    }

    sqlx::query("DELETE FROM pings WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete ping: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}
