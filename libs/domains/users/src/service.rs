use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::auth_service::DEFAULT_SUSPENSION_REASON;
use crate::error::{UserError, UserResult};
use crate::models::{Role, UpdateProfile, UserFilter, UserPatch, UserResponse};
use crate::repository::UserRepository;

/// Service layer for user administration
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Get a live user by ID
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: Uuid) -> UserResult<UserResponse> {
        let user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        Ok(user.into())
    }

    /// Update the caller's own name, phone or address
    #[instrument(skip(self, input))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        input: UpdateProfile,
    ) -> UserResult<UserResponse> {
        let patch = UserPatch {
            name: input.name,
            phone: input.phone.map(Some),
            address: input.address.map(Some),
            ..Default::default()
        };

        let updated = self.repository.update(user_id, patch).await?;
        Ok(updated.into())
    }

    /// Change a user's role. Granting SELLER marks the account approved;
    /// any other role drops the approval flag.
    #[instrument(skip(self))]
    pub async fn change_role(&self, user_id: Uuid, role: Role) -> UserResult<UserResponse> {
        let is_approved = match role {
            Role::Seller => Some(true),
            Role::Admin | Role::Customer => None,
        };

        let updated = self
            .repository
            .update(
                user_id,
                UserPatch {
                    role: Some(role),
                    is_approved: Some(is_approved),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %user_id, role = %role, "Role changed");
        Ok(updated.into())
    }

    /// Soft delete. The record stays but disappears from every lookup.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> UserResult<()> {
        self.repository
            .update(
                id,
                UserPatch {
                    is_deleted: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %id, "User soft-deleted");
        Ok(())
    }

    /// List users with filters, returning the page and the total match count
    #[instrument(skip(self))]
    pub async fn list_users(&self, filter: UserFilter) -> UserResult<(Vec<UserResponse>, u64)> {
        let total = self.repository.count(filter.clone()).await?;
        let users = self.repository.list(filter).await?;
        let responses: Vec<UserResponse> = users.into_iter().map(|u| u.into()).collect();
        Ok((responses, total))
    }

    #[instrument(skip(self))]
    pub async fn suspend_user(
        &self,
        user_id: Uuid,
        reason: Option<String>,
    ) -> UserResult<UserResponse> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_SUSPENSION_REASON.to_string());

        let updated = self
            .repository
            .update(
                user_id,
                UserPatch {
                    is_suspended: Some(true),
                    suspension_reason: Some(Some(reason)),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %user_id, "User suspended");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn unsuspend_user(&self, user_id: Uuid) -> UserResult<UserResponse> {
        let updated = self
            .repository
            .update(
                user_id,
                UserPatch {
                    is_suspended: Some(false),
                    suspension_reason: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %user_id, "User unsuspended");
        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::repository::{InMemoryUserRepository, MockUserRepository};

    async fn setup(role: Role) -> (UserService<InMemoryUserRepository>, Uuid) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let user = User::new("Carol".into(), "carol@example.com", "hash".into(), role);
        let id = repo.create(user).await.unwrap().id;
        (UserService::new(repo), id)
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let (service, _) = setup(Role::Customer).await;
        let missing = Uuid::now_v7();
        assert!(matches!(
            service.get_user(missing).await,
            Err(UserError::NotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn test_update_profile_leaves_other_fields() {
        let (service, id) = setup(Role::Customer).await;
        let updated = service
            .update_profile(
                id,
                UpdateProfile {
                    phone: Some("555-0100".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Carol");
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));
    }

    #[tokio::test]
    async fn test_change_role_sets_approval_flag() {
        let (service, id) = setup(Role::Customer).await;

        let seller = service.change_role(id, Role::Seller).await.unwrap();
        assert_eq!(seller.role, Role::Seller);
        assert_eq!(seller.is_approved, Some(true));

        let customer = service.change_role(id, Role::Customer).await.unwrap();
        assert_eq!(customer.is_approved, None);
    }

    #[tokio::test]
    async fn test_delete_is_soft_and_not_repeatable() {
        let (service, id) = setup(Role::Customer).await;

        service.delete_user(id).await.unwrap();
        assert!(matches!(service.get_user(id).await, Err(UserError::NotFound(_))));
        assert!(matches!(service.delete_user(id).await, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_suspend_and_unsuspend() {
        let (service, id) = setup(Role::Customer).await;

        let suspended = service.suspend_user(id, None).await.unwrap();
        assert!(suspended.is_suspended);
        assert_eq!(suspended.suspension_reason.as_deref(), Some(DEFAULT_SUSPENSION_REASON));

        let suspended = service.suspend_user(id, Some("Chargebacks".into())).await.unwrap();
        assert_eq!(suspended.suspension_reason.as_deref(), Some("Chargebacks"));

        let restored = service.unsuspend_user(id).await.unwrap();
        assert!(!restored.is_suspended);
        assert_eq!(restored.suspension_reason, None);
    }

    #[tokio::test]
    async fn test_list_users_reports_total() {
        let (service, _) = setup(Role::Seller).await;
        let (users, total) = service
            .list_users(UserFilter {
                role: Some(Role::Seller),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(users[0].email, "carol@example.com");
    }

    #[tokio::test]
    async fn test_list_propagates_repository_error() {
        let mut repo = MockUserRepository::new();
        repo.expect_count()
            .returning(|_| Err(UserError::Database("timeout".into())));
        repo.expect_list().never();

        let service = UserService::new(Arc::new(repo));
        let result = service.list_users(UserFilter::default()).await;
        assert!(matches!(result, Err(UserError::Database(_))));
    }
}
