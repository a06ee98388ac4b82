use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{
    LoginResponse, RegisterAdmin, RegisterCustomer, RegisterSeller, Role, User, UserPatch,
    UserResponse,
};
use crate::notifications::AccountMailer;
use crate::password::{hash_password, verify_password};
use crate::repository::UserRepository;
use crate::tokens::{APPROVAL_TOKEN_TTL, TokenManager};

pub const DEFAULT_SUSPENSION_REASON: &str = "Policy violation";

/// Registration, verification, login and password recovery
pub struct AuthService<R: UserRepository> {
    repository: Arc<R>,
    tokens: TokenManager<R>,
    mailer: Arc<AccountMailer>,
    admin_secret: String,
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(
        repository: Arc<R>,
        tokens: TokenManager<R>,
        mailer: Arc<AccountMailer>,
        admin_secret: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            tokens,
            mailer,
            admin_secret: admin_secret.into(),
        }
    }

    /// Create a verified admin when `admin_secret` matches the configured one
    #[instrument(skip_all, fields(email = %input.email))]
    pub async fn register_admin(&self, input: RegisterAdmin) -> UserResult<UserResponse> {
        if input.admin_secret != self.admin_secret {
            tracing::warn!("Admin registration with wrong secret");
            return Err(UserError::InvalidAdminSecret);
        }
        self.ensure_email_free(&input.email).await?;

        let password_hash = hash_password(&input.password).await?;
        let mut user = User::new(input.name, &input.email, password_hash, Role::Admin);
        user.is_verified = true;

        let created = self.repository.create(user).await?;
        Ok(created.into())
    }

    /// Create an unverified customer and email a verification link
    #[instrument(skip_all, fields(email = %input.email))]
    pub async fn register_customer(&self, input: RegisterCustomer) -> UserResult<UserResponse> {
        self.ensure_email_free(&input.email).await?;

        let password_hash = hash_password(&input.password).await?;
        let mut user = User::new(input.name, &input.email, password_hash, Role::Customer);
        let token = self.tokens.issue_verification();
        user.verification_token = Some(token.clone());
        user.phone = input.phone;
        user.address = input.address;

        let created = self.repository.create(user).await?;

        if !self
            .mailer
            .send_verification(&created.name, &created.email, &token)
            .await
        {
            tracing::warn!(user_id = %created.id, "Customer registered but verification email was not sent");
        }
        Ok(created.into())
    }

    /// Create an unverified, unapproved seller and tell them approval is pending
    #[instrument(skip_all, fields(email = %input.email))]
    pub async fn register_seller(&self, input: RegisterSeller) -> UserResult<UserResponse> {
        self.ensure_email_free(&input.email).await?;

        let password_hash = hash_password(&input.password).await?;
        let mut user = User::new(input.name, &input.email, password_hash, Role::Seller);
        user.business_name = Some(input.business_name);
        user.phone = input.phone;
        user.address = input.address;

        let created = self.repository.create(user).await?;

        let business_name = created.business_name.as_deref().unwrap_or_default();
        if !self
            .mailer
            .send_seller_pending(&created.name, &created.email, business_name)
            .await
        {
            tracing::warn!(user_id = %created.id, "Seller registered but pending email was not sent");
        }
        Ok(created.into())
    }

    /// Consume a verification token. With an email the token is the random
    /// verification token; without one it is a seller approval token.
    #[instrument(skip_all)]
    pub async fn verify_email(
        &self,
        token: Option<&str>,
        email: Option<&str>,
    ) -> UserResult<UserResponse> {
        let token = token.filter(|t| !t.is_empty()).ok_or_else(|| {
            UserError::Validation("Invalid or missing verification token or email".to_string())
        })?;

        let user = match email.filter(|e| !e.is_empty()) {
            Some(email) => self.tokens.consume_verification(email, token).await?,
            None => self.tokens.consume_approval(token).await?,
        };

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(user.into())
    }

    /// Approve a seller and email them a 14-day verification link.
    ///
    /// The approval flag and token are written together. If the email
    /// cannot be sent both are reverted.
    #[instrument(skip(self))]
    pub async fn approve_seller(&self, seller_id: Uuid) -> UserResult<UserResponse> {
        let seller = self
            .repository
            .find_by_id(seller_id)
            .await?
            .filter(|u| u.role == Role::Seller)
            .ok_or(UserError::NotASeller)?;
        let previous_approval = seller.is_approved;

        let token = self.tokens.sign_approval(&seller)?;
        let approved = self
            .repository
            .update(
                seller_id,
                UserPatch {
                    is_approved: Some(Some(true)),
                    approval_token: Some(Some(token.clone())),
                    ..Default::default()
                },
            )
            .await?;

        let delivered = self
            .mailer
            .send_seller_approved(
                &approved.name,
                &approved.email,
                &token,
                APPROVAL_TOKEN_TTL.num_days(),
            )
            .await;

        if !delivered {
            self.revert_approval(seller_id, previous_approval).await;
            return Err(UserError::Email(
                "Error sending verification email".to_string(),
            ));
        }

        tracing::info!(user_id = %seller_id, "Seller approved");
        Ok(approved.into())
    }

    async fn revert_approval(&self, seller_id: Uuid, previous: Option<bool>) {
        let reverted = self
            .repository
            .update(
                seller_id,
                UserPatch {
                    is_approved: Some(previous),
                    approval_token: Some(None),
                    ..Default::default()
                },
            )
            .await;
        if let Err(e) = reverted {
            tracing::error!(user_id = %seller_id, error = %e, "Failed to revert seller approval");
        }
    }

    /// Check account gates, then credentials, and issue a 7-day session token.
    ///
    /// Gates run before the password check so an unverified, suspended or
    /// unapproved account is refused whatever password is given.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> UserResult<LoginResponse> {
        let user = self
            .repository
            .find_by_email(email)
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        if !user.is_verified {
            return Err(UserError::NotVerified);
        }
        if user.is_suspended {
            let reason = user
                .suspension_reason
                .clone()
                .unwrap_or_else(|| DEFAULT_SUSPENSION_REASON.to_string());
            return Err(UserError::Suspended(reason));
        }
        if user.role == Role::Seller && !user.is_seller_approved() {
            return Err(UserError::PendingApproval);
        }

        if !verify_password(password, &user.password_hash).await? {
            return Err(UserError::InvalidCredentials);
        }

        let token = self.tokens.issue_session(&user)?;
        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok(LoginResponse {
            message: "Login successful".to_string(),
            token,
            user: user.into(),
        })
    }

    /// Store a one-hour reset token and email the reset link
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> UserResult<()> {
        let user = self
            .repository
            .find_by_email(email)
            .await?
            .ok_or(UserError::EmailNotFound)?;

        let token = self.tokens.issue_reset(&user).await?;

        if !self
            .mailer
            .send_password_reset(&user.name, &user.email, &token)
            .await
        {
            tracing::warn!(user_id = %user.id, "Reset token stored but email was not sent");
        }
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> UserResult<()> {
        let user = self.tokens.consume_reset(token, new_password).await?;
        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str) -> UserResult<()> {
        if self.repository.find_by_email(email).await?.is_some() {
            return Err(UserError::DuplicateEmail(email.trim().to_lowercase()));
        }
        Ok(())
    }
}
