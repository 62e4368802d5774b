pub mod auth;
pub mod comments;
pub mod config;
pub mod db;
pub mod error;
pub mod listing;
pub mod marketplace;
pub mod memory;
pub mod posts;
pub mod reactions;
pub mod records;
pub mod seed;
pub mod store;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::marketplace::Marketplace;

#[derive(Clone)]
pub struct AppState {
    pub market: Marketplace,
    pub jwt_secret: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(|| async { "ok" }))
        .route("/api/catalog", get(posts::catalog))
        // Auth
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        // Posts
        .route(
            "/api/posts",
            get(posts::list_posts).post(posts::create_post),
        )
        .route(
            "/api/posts/{id}",
            get(posts::get_post).delete(posts::delete_post),
        )
        .route("/api/posts/{id}/status", patch(posts::update_status))
        // Reactions
        .route("/api/posts/{id}/reactions", post(reactions::toggle_reaction))
        // Comments
        .route("/api/posts/{id}/comments", post(comments::create_comment))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
