//! Application state management.
//!
//! Built once at startup and shared by the route builders. Domain services are
//! constructed from it and own their own clones of the shared handles.

use axum_helpers::JwtAuth;
use domain_users::{AccountMailer, MongoUserRepository};
use email::Mailer;
use mongodb::Client;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// MongoDB client (cloneable, shares underlying connection pool)
    pub mongo_client: Client,
    pub users: Arc<MongoUserRepository>,
    pub jwt: JwtAuth,
    /// Raw mailer, kept for readiness checks
    pub mailer: Mailer,
    pub account_mailer: Arc<AccountMailer>,
}
