//! Auth API routes
//!
//! Wires registration, verification, login and password recovery to MongoDB
//! and the SMTP mailer.

use axum::Router;
use domain_users::{AccessGuard, AuthService, TokenManager, auth_handlers};

use crate::state::AppState;

pub fn router(state: &AppState) -> Router {
    let tokens = TokenManager::new(state.users.clone(), state.jwt.clone());
    let service = AuthService::new(
        state.users.clone(),
        tokens,
        state.account_mailer.clone(),
        state.config.accounts.admin_secret.clone(),
    );
    let guard = AccessGuard::new(state.users.clone(), state.jwt.clone());

    auth_handlers::router(service, guard)
}
