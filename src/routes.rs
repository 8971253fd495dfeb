// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, pings, users, votes},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (token, users, pings).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
///
/// Paths carry a trailing slash; that is the canonical form of this API.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let token_routes = Router::new()
        .route("/token/", post(auth::obtain_token))
        .route("/token/refresh/", post(auth::refresh_token));

    let user_routes = Router::new()
        .route("/users/register/", post(users::register))
        .route(
            "/users/profile/",
            get(users::get_profile)
                .put(users::update_profile)
                .patch(users::update_profile),
        )
        .route("/users/change-password/", post(users::change_password));

    let ping_routes = Router::new()
        .route("/pings/", get(pings::list_pings).post(pings::create_ping))
        // Static segment, registered alongside the {id} routes; the router
        // prefers it over the parameter match.
        .route("/pings/user/", get(pings::list_user_pings))
        .route(
            "/pings/{id}/",
            get(pings::get_ping)
                .put(pings::update_ping)
                .patch(pings::update_ping)
                .delete(pings::delete_ping),
        )
        .route("/pings/{id}/vote/", post(votes::vote_ping));

    let api_routes = Router::new()
        .merge(token_routes)
        .merge(user_routes)
        .merge(ping_routes);

    Router::new()
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
