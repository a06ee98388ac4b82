use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{User, UserFilter, UserPatch, normalize_email};

/// Credential store for user records.
///
/// Lookups never return soft-deleted users. The `consume_*` methods match a
/// token and clear it in one atomic step, so a token is usable exactly once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with `DuplicateEmail` if any record, deleted or
    /// not, already has the email.
    async fn create(&self, user: User) -> UserResult<User>;

    /// Case-insensitive lookup of a live user
    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    /// Apply `patch` to a live user
    async fn update(&self, id: Uuid, patch: UserPatch) -> UserResult<User>;

    /// One page of live users, newest first
    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>>;

    async fn count(&self, filter: UserFilter) -> UserResult<u64>;

    /// Mark the user verified if `(email, token)` matches, clearing the token
    async fn consume_verification_token(&self, email: &str, token: &str)
    -> UserResult<Option<User>>;

    /// Mark the seller verified if `(id, token)` matches, clearing the token
    async fn consume_approval_token(&self, id: Uuid, token: &str) -> UserResult<Option<User>>;

    /// Replace the password hash if `token` matches and has not expired at `now`,
    /// clearing the token and its expiry
    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        password_hash: String,
    ) -> UserResult<Option<User>>;
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Raw record lookup that ignores soft deletion. Test helper.
    pub async fn raw(&self, id: Uuid) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }
}

/// Apply `effect` to the first live user matching `predicate`, under one write lock.
async fn consume_where<P, F>(
    users: &RwLock<HashMap<Uuid, User>>,
    predicate: P,
    effect: F,
) -> Option<User>
where
    P: Fn(&User) -> bool,
    F: FnOnce(&mut User),
{
    let mut users = users.write().await;
    let user = users.values_mut().find(|u| !u.is_deleted && predicate(u))?;
    effect(user);
    user.updated_at = Utc::now();
    Some(user.clone())
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, mut user: User) -> UserResult<User> {
        user.email = normalize_email(&user.email);
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(UserError::DuplicateEmail(user.email));
        }

        users.insert(user.id, user.clone());

        tracing::info!(user_id = %user.id, role = %user.role, "Created user");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| !u.is_deleted && u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).filter(|u| !u.is_deleted).cloned())
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> UserResult<User> {
        let mut users = self.users.write().await;

        let user = users
            .get_mut(&id)
            .filter(|u| !u.is_deleted)
            .ok_or(UserError::NotFound(id))?;
        user.apply_patch(patch);

        tracing::info!(user_id = %id, "Updated user");
        Ok(user.clone())
    }

    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>> {
        let users = self.users.read().await;

        let mut result: Vec<User> = users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();

        // Newest first; v7 ids break ties in creation order
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(result
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(filter.limit).unwrap_or(usize::MAX))
            .collect())
    }

    async fn count(&self, filter: UserFilter) -> UserResult<u64> {
        let users = self.users.read().await;
        Ok(users.values().filter(|u| filter.matches(u)).count() as u64)
    }

    async fn consume_verification_token(
        &self,
        email: &str,
        token: &str,
    ) -> UserResult<Option<User>> {
        let email = normalize_email(email);
        Ok(consume_where(
            &self.users,
            |u| u.email == email && u.verification_token.as_deref() == Some(token),
            |u| {
                u.is_verified = true;
                u.verification_token = None;
            },
        )
        .await)
    }

    async fn consume_approval_token(&self, id: Uuid, token: &str) -> UserResult<Option<User>> {
        Ok(consume_where(
            &self.users,
            |u| u.id == id && u.approval_token.as_deref() == Some(token),
            |u| {
                u.is_verified = true;
                u.approval_token = None;
            },
        )
        .await)
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        password_hash: String,
    ) -> UserResult<Option<User>> {
        Ok(consume_where(
            &self.users,
            |u| {
                u.reset_password_token.as_deref() == Some(token)
                    && u.reset_password_expires.is_some_and(|exp| exp > now)
            },
            |u| {
                u.password_hash = password_hash;
                u.reset_password_token = None;
                u.reset_password_expires = None;
            },
        )
        .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Duration;

    fn customer(email: &str) -> User {
        User::new("Test User".to_string(), email, "hashed_password".to_string(), Role::Customer)
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let repo = InMemoryUserRepository::new();

        let created = repo.create(customer("test@example.com")).await.unwrap();
        assert_eq!(created.email, "test@example.com");

        let fetched = repo.find_by_id(created.id).await.unwrap();
        assert_eq!(fetched.unwrap().id, created.id);

        let fetched = repo.find_by_email("TEST@EXAMPLE.COM").await.unwrap();
        assert!(fetched.is_some()); // Case insensitive
    }

    #[tokio::test]
    async fn test_duplicate_email_includes_deleted_users() {
        let repo = InMemoryUserRepository::new();

        let first = repo.create(customer("test@example.com")).await.unwrap();
        repo.update(
            first.id,
            UserPatch {
                is_deleted: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let result = repo.create(customer("Test@Example.com")).await;
        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_deleted_users_are_invisible() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create(customer("gone@example.com")).await.unwrap();

        repo.update(
            user.id,
            UserPatch {
                is_deleted: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(repo.find_by_id(user.id).await.unwrap().is_none());
        assert!(repo.find_by_email("gone@example.com").await.unwrap().is_none());
        assert_eq!(repo.count(UserFilter::default()).await.unwrap(), 0);
        assert!(matches!(
            repo.update(user.id, UserPatch::default()).await,
            Err(UserError::NotFound(_))
        ));
        assert!(repo.raw(user.id).await.unwrap().is_deleted);
    }

    #[tokio::test]
    async fn test_verification_token_consumed_once() {
        let repo = InMemoryUserRepository::new();
        let mut user = customer("alice@example.com");
        user.verification_token = Some("tok".into());
        repo.create(user).await.unwrap();

        assert!(
            repo.consume_verification_token("bob@example.com", "tok")
                .await
                .unwrap()
                .is_none()
        );

        let verified = repo
            .consume_verification_token("alice@example.com", "tok")
            .await
            .unwrap()
            .unwrap();
        assert!(verified.is_verified);
        assert_eq!(verified.verification_token, None);

        let again = repo
            .consume_verification_token("alice@example.com", "tok")
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_reset_token_respects_expiry() {
        let repo = InMemoryUserRepository::new();
        let now = Utc::now();
        let mut user = customer("alice@example.com");
        user.reset_password_token = Some("reset".into());
        user.reset_password_expires = Some(now - Duration::minutes(1));
        repo.create(user).await.unwrap();

        let result = repo
            .consume_reset_token("reset", now, "new-hash".into())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_list_paginates_newest_first() {
        let repo = InMemoryUserRepository::new();
        for i in 0..5 {
            let mut user = customer(&format!("user{}@example.com", i));
            user.created_at = Utc::now() + Duration::seconds(i);
            repo.create(user).await.unwrap();
        }

        let page = repo
            .list(UserFilter {
                page: 1,
                limit: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        let emails: Vec<_> = page.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["user4@example.com", "user3@example.com"]);

        let last = repo
            .list(UserFilter {
                page: 3,
                limit: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(repo.count(UserFilter::default()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_list_far_past_the_end_is_empty() {
        let repo = InMemoryUserRepository::new();
        repo.create(customer("only@example.com")).await.unwrap();

        let page = repo
            .list(UserFilter {
                page: u64::MAX,
                limit: 100,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.is_empty());
    }
}
