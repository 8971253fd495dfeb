// src/handlers/votes.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{error::AppError, models::ping::VoteRequest, utils::jwt::AuthUser};

/// Casts, switches or clears the caller's vote on a ping.
///
/// upvote/downvote remove the opposite membership first, then insert their
/// own (a no-op when already present), so a user is never in both sets.
/// 'remove' clears both unconditionally. Voting on your own ping is allowed.
pub async fn vote_ping(
    State(pool): State<PgPool>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<VoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ping: Option<i64> = sqlx::query_scalar("SELECT id FROM pings WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    if ping.is_none() {
        return Err(AppError::NotFound("Ping not found".to_string()));
    }

    let vote_type = payload.vote_type.as_str();

    if !matches!(vote_type, "upvote" | "downvote" | "remove") {
        return Err(AppError::BadRequest(
            "vote_type must be one of: upvote, downvote, remove.".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    match vote_type {
        "upvote" => {
            sqlx::query("DELETE FROM ping_downvotes WHERE user_id = $1 AND ping_id = $2")
                .bind(user_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                "INSERT INTO ping_upvotes (user_id, ping_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        "downvote" => {
            sqlx::query("DELETE FROM ping_upvotes WHERE user_id = $1 AND ping_id = $2")
                .bind(user_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                "INSERT INTO ping_downvotes (user_id, ping_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        _ => {
            sqlx::query("DELETE FROM ping_upvotes WHERE user_id = $1 AND ping_id = $2")
                .bind(user_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM ping_downvotes WHERE user_id = $1 AND ping_id = $2")
                .bind(user_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;

    let vote_count: i64 = sqlx::query_scalar(
        r#"
        SELECT (SELECT COUNT(*) FROM ping_upvotes WHERE ping_id = $1)
             - (SELECT COUNT(*) FROM ping_downvotes WHERE ping_id = $1)
        "#,
    )
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(json!({
        "message": format!("{} successful", vote_type),
        "vote_count": vote_count,
    })))
}
