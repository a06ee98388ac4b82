//! Out-of-band token lifecycles: email verification, password reset and
//! seller approval, plus session token issuing.

use axum_helpers::JwtAuth;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{Role, User, UserPatch};
use crate::password::{ensure_policy, hash_password};
use crate::repository::UserRepository;

pub const LOGIN_TOKEN_TTL: Duration = Duration::days(7);
pub const APPROVAL_TOKEN_TTL: Duration = Duration::days(14);
pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);

const RANDOM_TOKEN_BYTES: usize = 32;

/// 32 random bytes, hex-encoded (64 characters)
pub fn generate_token() -> String {
    let bytes: [u8; RANDOM_TOKEN_BYTES] = rand::random();
    const_hex::encode(bytes)
}

pub struct TokenManager<R: UserRepository> {
    repository: Arc<R>,
    jwt: JwtAuth,
}

impl<R: UserRepository> Clone for TokenManager<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            jwt: self.jwt.clone(),
        }
    }
}

impl<R: UserRepository> TokenManager<R> {
    pub fn new(repository: Arc<R>, jwt: JwtAuth) -> Self {
        Self { repository, jwt }
    }

    /// Signed session token carrying the user's id and role
    pub fn issue_session(&self, user: &User) -> UserResult<String> {
        self.jwt
            .issue(&user.id.to_string(), &user.role.to_string(), LOGIN_TOKEN_TTL)
            .map_err(|e| UserError::Token(e.to_string()))
    }

    /// A fresh verification token. The caller stores it with the new user.
    pub fn issue_verification(&self) -> String {
        generate_token()
    }

    #[instrument(skip(self, token))]
    pub async fn consume_verification(&self, email: &str, token: &str) -> UserResult<User> {
        self.repository
            .consume_verification_token(email, token)
            .await?
            .ok_or(UserError::InvalidOrExpiredToken)
    }

    /// Store a reset token valid for [`RESET_TOKEN_TTL`] and return it
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn issue_reset(&self, user: &User) -> UserResult<String> {
        let token = generate_token();
        self.repository
            .update(
                user.id,
                UserPatch {
                    reset_password_token: Some(Some(token.clone())),
                    reset_password_expires: Some(Some(Utc::now() + RESET_TOKEN_TTL)),
                    ..Default::default()
                },
            )
            .await?;
        Ok(token)
    }

    #[instrument(skip_all)]
    pub async fn consume_reset(&self, token: &str, new_password: &str) -> UserResult<User> {
        ensure_policy(new_password)?;
        let password_hash = hash_password(new_password).await?;

        self.repository
            .consume_reset_token(token, Utc::now(), password_hash)
            .await?
            .ok_or(UserError::InvalidOrExpiredToken)
    }

    /// Sign a 14-day approval token for `seller`. The caller stores it.
    pub fn sign_approval(&self, seller: &User) -> UserResult<String> {
        self.jwt
            .issue(&seller.id.to_string(), &Role::Seller.to_string(), APPROVAL_TOKEN_TTL)
            .map_err(|e| UserError::Token(e.to_string()))
    }

    #[instrument(skip_all)]
    pub async fn consume_approval(&self, token: &str) -> UserResult<User> {
        let claims = self.jwt.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected approval token");
            UserError::InvalidOrExpiredToken
        })?;

        if claims.role.parse::<Role>().ok() != Some(Role::Seller) {
            return Err(UserError::InvalidOrExpiredToken);
        }
        let id = Uuid::parse_str(&claims.sub).map_err(|_| UserError::InvalidOrExpiredToken)?;

        self.repository
            .consume_approval_token(id, token)
            .await?
            .ok_or(UserError::InvalidOrExpiredToken)
    }
}
