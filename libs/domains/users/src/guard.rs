//! Bearer authentication and role authorization middleware.
//!
//! ```ignore
//! Router::new()
//!     .route("/", get(list_users))
//!     .route_layer(middleware::from_fn(|req, next| require_roles(ADMIN_ONLY, req, next)))
//!     .route_layer(middleware::from_fn_with_state(guard, authenticate::<R>))
//! ```
//!
//! `route_layer` wraps outside-in, so `authenticate` runs before `require_roles`.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_helpers::{JwtAuth, bearer_token};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AuthFailure, UserError, UserResult};
use crate::models::Role;
use crate::repository::UserRepository;

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
pub const ANY_ROLE: &[Role] = &[Role::Admin, Role::Seller, Role::Customer];

/// Authenticated caller, placed in request extensions by [`authenticate`].
///
/// The role is read from the stored record, so a role change takes effect
/// without reissuing tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn has_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = UserError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(UserError::Unauthorized(AuthFailure::NoToken))
    }
}

/// State for [`authenticate`]
pub struct AccessGuard<R: UserRepository> {
    repository: Arc<R>,
    jwt: JwtAuth,
}

impl<R: UserRepository> Clone for AccessGuard<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            jwt: self.jwt.clone(),
        }
    }
}

impl<R: UserRepository> AccessGuard<R> {
    pub fn new(repository: Arc<R>, jwt: JwtAuth) -> Self {
        Self { repository, jwt }
    }

    /// Resolve the bearer token in `headers` to a live user
    pub async fn authenticate_headers(&self, headers: &HeaderMap) -> UserResult<AuthUser> {
        let token =
            bearer_token(headers).ok_or(UserError::Unauthorized(AuthFailure::NoToken))?;

        let claims = self.jwt.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            UserError::Unauthorized(AuthFailure::InvalidToken)
        })?;

        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| UserError::Unauthorized(AuthFailure::UserNotFound))?;
        let user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::Unauthorized(AuthFailure::UserNotFound))?;

        Ok(AuthUser {
            id: user.id,
            email: user.email,
            role: user.role,
        })
    }
}

/// Authenticate the request and attach [`AuthUser`], or answer 401
pub async fn authenticate<R: UserRepository + 'static>(
    State(guard): State<AccessGuard<R>>,
    mut req: Request,
    next: Next,
) -> Result<Response, UserError> {
    let user = guard.authenticate_headers(req.headers()).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Let the request through only if the authenticated role is in `allowed`.
/// Must run after [`authenticate`].
pub async fn require_roles(
    allowed: &'static [Role],
    req: Request,
    next: Next,
) -> Result<Response, UserError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(UserError::Unauthorized(AuthFailure::NoToken))?;

    if !user.has_role(allowed) {
        tracing::info!(user_id = %user.id, role = %user.role, "Role not allowed");
        return Err(UserError::Forbidden);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::repository::InMemoryUserRepository;
    use axum::http::{HeaderValue, header::AUTHORIZATION};
    use axum_helpers::JwtConfig;
    use chrono::Duration;

    fn jwt() -> JwtAuth {
        JwtAuth::new(&JwtConfig::new("guard-test-secret-0123456789abcdef").unwrap())
    }

    fn headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    async fn guard_with_user(role: Role) -> (AccessGuard<InMemoryUserRepository>, User) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let user = repo
            .create(User::new("Dana".into(), "dana@example.com", "hash".into(), role))
            .await
            .unwrap();
        (AccessGuard::new(repo, jwt()), user)
    }

    fn failure(result: UserResult<AuthUser>) -> AuthFailure {
        match result {
            Err(UserError::Unauthorized(reason)) => reason,
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_header() {
        let (guard, _) = guard_with_user(Role::Customer).await;
        let result = guard.authenticate_headers(&HeaderMap::new()).await;
        assert_eq!(failure(result), AuthFailure::NoToken);
    }

    #[tokio::test]
    async fn test_bad_and_expired_tokens() {
        let (guard, user) = guard_with_user(Role::Customer).await;

        let result = guard.authenticate_headers(&headers("not.a.jwt")).await;
        assert_eq!(failure(result), AuthFailure::InvalidToken);

        let expired = jwt()
            .issue(&user.id.to_string(), "CUSTOMER", Duration::hours(-2))
            .unwrap();
        let result = guard.authenticate_headers(&headers(&expired)).await;
        assert_eq!(failure(result), AuthFailure::InvalidToken);
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let (guard, _) = guard_with_user(Role::Customer).await;
        let token = jwt()
            .issue(&Uuid::now_v7().to_string(), "ADMIN", Duration::hours(1))
            .unwrap();
        let result = guard.authenticate_headers(&headers(&token)).await;
        assert_eq!(failure(result), AuthFailure::UserNotFound);
    }

    #[tokio::test]
    async fn test_role_comes_from_record_not_token() {
        let (guard, user) = guard_with_user(Role::Customer).await;
        let token = jwt()
            .issue(&user.id.to_string(), "ADMIN", Duration::hours(1))
            .unwrap();

        let auth = guard.authenticate_headers(&headers(&token)).await.unwrap();
        assert_eq!(auth.id, user.id);
        assert_eq!(auth.role, Role::Customer);
        assert!(!auth.has_role(ADMIN_ONLY));
        assert!(auth.has_role(ANY_ROLE));
    }
}
