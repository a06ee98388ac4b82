//! Users Domain
//!
//! Accounts for the EMP storefront: registration for admins, customers and
//! sellers, login with bearer tokens, email verification, seller approval,
//! password reset and user administration.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  auth_handlers / handlers    │  ← HTTP endpoints, guarded by `guard`
//! └──────────────┬───────────────┘
//!                │
//! ┌──────────────▼───────────────┐
//! │  AuthService / UserService   │  ← Business rules, login gates
//! │  TokenManager, AccountMailer │  ← Out-of-band tokens, account emails
//! └──────────────┬───────────────┘
//!                │
//! ┌──────────────▼───────────────┐
//! │  UserRepository              │  ← In-memory or MongoDB
//! └──────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_users::{AccessGuard, AuthService, InMemoryUserRepository, TokenManager, auth_handlers};
//!
//! let repository = Arc::new(InMemoryUserRepository::new());
//! let tokens = TokenManager::new(repository.clone(), jwt.clone());
//! let service = AuthService::new(repository.clone(), tokens, mailer, admin_secret);
//! let router = auth_handlers::router(service, AccessGuard::new(repository, jwt));
//! ```

pub mod auth_handlers;
pub mod auth_service;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod notifications;
pub mod password;
pub mod repository;
pub mod service;
pub mod tokens;

pub use auth_handlers::AuthApiDoc;
pub use auth_service::AuthService;
pub use config::AccountsConfig;
pub use error::{AuthFailure, UserError, UserResult};
pub use guard::{AccessGuard, AuthUser};
pub use handlers::ApiDoc;
pub use models::{Role, User, UserFilter, UserPatch, UserResponse};
pub use mongodb::MongoUserRepository;
pub use notifications::AccountMailer;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;
pub use tokens::TokenManager;
