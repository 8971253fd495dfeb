// tests/ping_tests.rs

use pingboard::{config::Config, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;

async fn spawn_app() -> Option<String> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "ping_test_secret".to_string(),
        access_token_ttl: 600,
        refresh_token_ttl: 3600,
        rust_log: "error".to_string(),
    };

    let state = AppState { pool, config };
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(address)
}

/// Registers a fresh user and returns (username, access token).
async fn make_user(client: &reqwest::Client, address: &str) -> (String, String) {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(format!("{}/api/users/register/", address))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    let tokens: serde_json::Value = client
        .post(format!("{}/api/token/", address))
        .json(&serde_json::json!({ "username": username, "password": "password123" }))
        .send()
        .await
        .expect("Token request failed")
        .json()
        .await
        .unwrap();

    let access = tokens["access"].as_str().expect("access token missing");
    (username, access.to_string())
}

async fn create_ping(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    body: serde_json::Value,
) -> serde_json::Value {
    let response = client
        .post(format!("{}/api/pings/", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&body)
        .send()
        .await
        .expect("Create ping failed");
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.unwrap()
}

async fn vote(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    ping_id: i64,
    vote_type: &str,
) -> serde_json::Value {
    let response = client
        .post(format!("{}/api/pings/{}/vote/", address, ping_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "vote_type": vote_type }))
        .send()
        .await
        .expect("Vote failed");
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
async fn create_and_read_ping() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (username, token) = make_user(&client, &address).await;

    let ping = create_ping(
        &client,
        &address,
        &token,
        serde_json::json!({
            "text": "shipping a new thing #tech",
            "category": "event",
            "location": "Berlin"
        }),
    )
    .await;

    assert_eq!(ping["text"], "shipping a new thing #tech");
    assert_eq!(ping["category"], "event");
    assert_eq!(ping["location"], "Berlin");
    assert_eq!(ping["is_anonymous"], false);
    assert_eq!(ping["display_name"], username.as_str());
    assert_eq!(ping["vote_count"], 0);
    assert_eq!(ping["user"]["username"], username.as_str());

    // Anonymous read of the same ping
    let id = ping["id"].as_i64().unwrap();
    let fetched: serde_json::Value = client
        .get(format!("{}/api/pings/{}/", address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["id"], id);
    assert_eq!(fetched["user_has_upvoted"], false);
    assert_eq!(fetched["user_has_downvoted"], false);
}

#[tokio::test]
async fn create_requires_auth() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/pings/", address))
        .json(&serde_json::json!({ "text": "anonymous write" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn text_length_is_enforced() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_, token) = make_user(&client, &address).await;

    for text in ["", &"x".repeat(281)] {
        let response = client
            .post(format!("{}/api/pings/", address))
            .header("Authorization", format!("Bearer {}", token))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
    }

    // 280 characters is the inclusive maximum
    create_ping(
        &client,
        &address,
        &token,
        serde_json::json!({ "text": "x".repeat(280) }),
    )
    .await;
}

#[tokio::test]
async fn unknown_category_is_rejected() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_, token) = make_user(&client, &address).await;

    let response = client
        .post(format!("{}/api/pings/", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "text": "hello", "category": "party" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn anonymous_ping_masks_display_name() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (username, token) = make_user(&client, &address).await;

    let ping = create_ping(
        &client,
        &address,
        &token,
        serde_json::json!({ "text": "whisper", "is_anonymous": true }),
    )
    .await;

    assert_eq!(ping["display_name"], "Anonymous");
    // The mask is display-only; the owner is still serialized
    assert_eq!(ping["user"]["username"], username.as_str());
}

#[tokio::test]
async fn only_the_owner_can_edit_or_delete() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_, token_a) = make_user(&client, &address).await;
    let (_, token_b) = make_user(&client, &address).await;

    let ping = create_ping(
        &client,
        &address,
        &token_a,
        serde_json::json!({ "text": "mine" }),
    )
    .await;
    let id = ping["id"].as_i64().unwrap();

    // Non-owner update
    let response = client
        .patch(format!("{}/api/pings/{}/", address, id))
        .header("Authorization", format!("Bearer {}", token_b))
        .json(&serde_json::json!({ "text": "stolen" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // Non-owner delete
    let response = client
        .delete(format!("{}/api/pings/{}/", address, id))
        .header("Authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // Owner update
    let response = client
        .patch(format!("{}/api/pings/{}/", address, id))
        .header("Authorization", format!("Bearer {}", token_a))
        .json(&serde_json::json!({ "text": "edited", "category": "help" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(updated["text"], "edited");
    assert_eq!(updated["category"], "help");

    // Owner delete
    let response = client
        .delete(format!("{}/api/pings/{}/", address, id))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client
        .get(format!("{}/api/pings/{}/", address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn vote_flow() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_, token_a) = make_user(&client, &address).await;
    let (_, token_b) = make_user(&client, &address).await;

    let ping = create_ping(
        &client,
        &address,
        &token_a,
        serde_json::json!({ "text": "vote on me" }),
    )
    .await;
    let id = ping["id"].as_i64().unwrap();

    // Self-vote is allowed
    let body = vote(&client, &address, &token_a, id, "upvote").await;
    assert_eq!(body["message"], "upvote successful");
    assert_eq!(body["vote_count"], 1);

    // Upvoting again is idempotent
    let body = vote(&client, &address, &token_a, id, "upvote").await;
    assert_eq!(body["vote_count"], 1);

    // Upvote by A + downvote by B = 0
    let body = vote(&client, &address, &token_b, id, "downvote").await;
    assert_eq!(body["vote_count"], 0);

    // Switching sides replaces the previous vote
    let body = vote(&client, &address, &token_a, id, "downvote").await;
    assert_eq!(body["vote_count"], -2);

    // The voter's flags show up on an authenticated read
    let fetched: serde_json::Value = client
        .get(format!("{}/api/pings/{}/", address, id))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["user_has_upvoted"], false);
    assert_eq!(fetched["user_has_downvoted"], true);

    // Remove clears the caller's vote
    let body = vote(&client, &address, &token_a, id, "remove").await;
    assert_eq!(body["vote_count"], -1);

    // Removing again is a no-op
    let body = vote(&client, &address, &token_a, id, "remove").await;
    assert_eq!(body["vote_count"], -1);
}

#[tokio::test]
async fn vote_error_cases() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_, token) = make_user(&client, &address).await;

    // Unknown ping
    let response = client
        .post(format!("{}/api/pings/999999999/vote/", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "vote_type": "upvote" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // Invalid vote_type
    let ping = create_ping(
        &client,
        &address,
        &token,
        serde_json::json!({ "text": "bad votes" }),
    )
    .await;
    let response = client
        .post(format!(
            "{}/api/pings/{}/vote/",
            address,
            ping["id"].as_i64().unwrap()
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "vote_type": "sideways" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Voting requires authentication
    let response = client
        .post(format!(
            "{}/api/pings/{}/vote/",
            address,
            ping["id"].as_i64().unwrap()
        ))
        .json(&serde_json::json!({ "vote_type": "upvote" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn list_filters_search_and_ordering() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_, token) = make_user(&client, &address).await;

    // A unique marker scopes assertions to this test's rows in a shared DB
    let marker = uuid::Uuid::new_v4().to_string()[..8].to_string();

    let first = create_ping(
        &client,
        &address,
        &token,
        serde_json::json!({ "text": format!("{} garage sale", marker), "category": "sale" }),
    )
    .await;
    let second = create_ping(
        &client,
        &address,
        &token,
        serde_json::json!({ "text": format!("{} block party", marker), "category": "event" }),
    )
    .await;

    // category filter + search
    let page: serde_json::Value = client
        .get(format!(
            "{}/api/pings/?category=sale&search={}",
            address, marker
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["id"], first["id"]);
    assert_eq!(page["results"][0]["category"], "sale");

    // Default ordering is newest first
    let page: serde_json::Value = client
        .get(format!("{}/api/pings/?search={}", address, marker))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["count"], 2);
    assert_eq!(page["results"][0]["id"], second["id"]);
    assert_eq!(page["results"][1]["id"], first["id"]);
    assert_eq!(page["next"], serde_json::Value::Null);
    assert_eq!(page["previous"], serde_json::Value::Null);

    // Ordering by vote count
    vote(
        &client,
        &address,
        &token,
        first["id"].as_i64().unwrap(),
        "upvote",
    )
    .await;

    let page: serde_json::Value = client
        .get(format!(
            "{}/api/pings/?search={}&ordering=-vote_count",
            address, marker
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["results"][0]["id"], first["id"]);

    let page: serde_json::Value = client
        .get(format!(
            "{}/api/pings/?search={}&ordering=vote_count",
            address, marker
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["results"][0]["id"], second["id"]);

    // Out-of-range page
    let response = client
        .get(format!("{}/api/pings/?search={}&page=99", address, marker))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn user_feed_lists_only_own_pings() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_, token_a) = make_user(&client, &address).await;
    let (_, token_b) = make_user(&client, &address).await;

    create_ping(
        &client,
        &address,
        &token_a,
        serde_json::json!({ "text": "a's first" }),
    )
    .await;
    create_ping(
        &client,
        &address,
        &token_a,
        serde_json::json!({ "text": "a's second" }),
    )
    .await;
    create_ping(
        &client,
        &address,
        &token_b,
        serde_json::json!({ "text": "b's only" }),
    )
    .await;

    let page: serde_json::Value = client
        .get(format!("{}/api/pings/user/", address))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(page["count"], 2);
    // Newest first
    assert_eq!(page["results"][0]["text"], "a's second");
    assert_eq!(page["results"][1]["text"], "a's first");

    // Requires authentication
    let response = client
        .get(format!("{}/api/pings/user/", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}
