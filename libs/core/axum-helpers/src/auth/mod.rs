//! Bearer token issuing and verification.
//!
//! ```ignore
//! use axum_helpers::auth::{JwtAuth, JwtConfig};
//! use core_config::FromEnv;
//!
//! let jwt = JwtAuth::new(&JwtConfig::from_env()?);
//! let token = jwt.issue(&user_id.to_string(), "CUSTOMER", chrono::Duration::days(7))?;
//! let claims = jwt.verify(&token)?;
//! ```

pub mod bearer;
pub mod config;
pub mod jwt;

pub use bearer::bearer_token;
pub use config::JwtConfig;
pub use jwt::{JwtAuth, JwtClaims, TokenError};
