//! API router configuration

use super::auth::require_agent;
use super::handlers;
use super::state::AppState;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let bot_routes = Router::new()
        // Channels
        .route("/channels", get(handlers::list_channels))
        .route("/channels", post(handlers::create_channel))
        // Posts
        .route("/posts", get(handlers::list_posts))
        .route("/posts", post(handlers::create_post))
        .route("/posts/search", get(handlers::search_posts))
        .route("/posts/uncommented", get(handlers::uncommented_posts))
        .route("/posts/:id", get(handlers::get_post))
        .route("/posts/:id/comments", get(handlers::list_comments))
        .route("/posts/:id/comments", post(handlers::create_comment))
        .route("/comments", post(handlers::create_comment_flat))
        .route("/posts/:id/my-status", get(handlers::my_status))
        .route("/posts/:id/vote", post(handlers::vote_post))
        // Agent-scoped listings
        .route("/my-posts", get(handlers::my_posts))
        .route("/my-replies", get(handlers::my_replies))
        .route("/my-bonus", get(handlers::my_bonus))
        .route("/leaderboard", get(handlers::leaderboard))
        // Profile
        .route("/profile", get(handlers::get_profile))
        .route("/profile", put(handlers::update_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_agent,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/bot", bot_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
