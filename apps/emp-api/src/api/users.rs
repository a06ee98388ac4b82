//! Users API routes

use axum::Router;
use domain_users::{AccessGuard, UserService, handlers};

use crate::state::AppState;

pub fn router(state: &AppState) -> Router {
    let service = UserService::new(state.users.clone());
    let guard = AccessGuard::new(state.users.clone(), state.jwt.clone());

    handlers::router(service, guard)
}
