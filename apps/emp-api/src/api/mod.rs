//! API routes module
//!
//! Nested under `/api` by `axum_helpers::create_router`.

pub mod auth;
pub mod health;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Create all API routes
pub fn routes(state: &AppState) -> Router {
    Router::new()
        .nest("/auth", auth::router(state))
        .nest("/users", users::router(state))
        .merge(health::router(state.clone()))
}
