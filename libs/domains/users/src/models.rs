use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::password::validate_password;

/// Account role
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Seller,
    Customer,
}

/// User entity as held by the repositories.
///
/// Never serialized to clients directly; handlers return [`UserResponse`].
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Trimmed and lower-cased
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    /// Only present for sellers
    pub is_approved: Option<bool>,
    pub is_suspended: bool,
    pub suspension_reason: Option<String>,
    pub is_deleted: bool,
    pub verification_token: Option<String>,
    pub approval_token: Option<String>,
    pub reset_password_token: Option<String>,
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub business_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A live, unverified account with no tokens. Sellers start unapproved.
    pub fn new(name: String, email: &str, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name,
            email: normalize_email(email),
            password_hash,
            role,
            is_verified: false,
            is_approved: (role == Role::Seller).then_some(false),
            is_suspended: false,
            suspension_reason: None,
            is_deleted: false,
            verification_token: None,
            approval_token: None,
            reset_password_token: None,
            reset_password_expires: None,
            phone: None,
            address: None,
            business_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_seller_approved(&self) -> bool {
        self.is_approved == Some(true)
    }

    /// Apply a partial update and bump `updated_at`
    pub fn apply_patch(&mut self, patch: UserPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(address) = patch.address {
            self.address = address;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(is_verified) = patch.is_verified {
            self.is_verified = is_verified;
        }
        if let Some(is_approved) = patch.is_approved {
            self.is_approved = is_approved;
        }
        if let Some(is_suspended) = patch.is_suspended {
            self.is_suspended = is_suspended;
        }
        if let Some(reason) = patch.suspension_reason {
            self.suspension_reason = reason;
        }
        if let Some(is_deleted) = patch.is_deleted {
            self.is_deleted = is_deleted;
        }
        if let Some(token) = patch.approval_token {
            self.approval_token = token;
        }
        if let Some(token) = patch.reset_password_token {
            self.reset_password_token = token;
        }
        if let Some(expires) = patch.reset_password_expires {
            self.reset_password_expires = expires;
        }
        self.updated_at = Utc::now();
    }
}

/// Emails are compared and stored trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Partial update of a stored user.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub role: Option<Role>,
    pub is_verified: Option<bool>,
    pub is_approved: Option<Option<bool>>,
    pub is_suspended: Option<bool>,
    pub suspension_reason: Option<Option<String>>,
    pub is_deleted: Option<bool>,
    pub approval_token: Option<Option<String>>,
    pub reset_password_token: Option<Option<String>>,
    pub reset_password_expires: Option<Option<DateTime<Utc>>>,
}

/// User as returned by the API. Carries no secret or token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_approved: Option<bool>,
    pub is_suspended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspension_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            is_verified: user.is_verified,
            is_approved: user.is_approved,
            is_suspended: user.is_suspended,
            suspension_reason: user.suspension_reason,
            phone: user.phone,
            address: user.address,
            business_name: user.business_name,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// Auth DTOs

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAdmin {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address"), length(max = 255))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    #[validate(length(min = 1))]
    pub admin_secret: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCustomer {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address"), length(max = 255))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSeller {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address"), length(max = 255))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    #[validate(length(min = 1, max = 200))]
    pub business_name: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// Query for `GET /verify-email`. With `email` the token is a random verification
/// token; without it the token is a seller approval token.
#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ApproveSellerQuery {
    pub seller_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserEnvelope {
    pub message: String,
    pub user: UserResponse,
}

// Administration DTOs

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleRequest {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuspendRequest {
    pub user_id: Uuid,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnsuspendRequest {
    pub user_id: Uuid,
}

/// Highest page a listing may request
pub const MAX_PAGE: u64 = 1_000_000;

/// Query filters for listing users
#[derive(Debug, Clone, Deserialize, Validate, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct UserFilter {
    /// 1-based page number, at most [`MAX_PAGE`]
    #[serde(default = "default_page")]
    #[validate(range(min = 1, max = 1000000))]
    pub page: u64,
    /// Page size
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
    /// Case-insensitive match on name, email or phone
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_verified: Option<bool>,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    10
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            search: None,
            role: None,
            is_verified: None,
        }
    }
}

impl UserFilter {
    /// Records to skip for the requested page
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Whether `user` satisfies the filter. Soft-deleted users never match.
    pub fn matches(&self, user: &User) -> bool {
        if user.is_deleted {
            return false;
        }
        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }
        if let Some(verified) = self.is_verified {
            if user.is_verified != verified {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            let hit = user.name.to_lowercase().contains(&needle)
                || user.email.contains(&needle)
                || user
                    .phone
                    .as_deref()
                    .is_some_and(|p| p.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersResponse {
    pub total_users: u64,
    pub users: Vec<UserResponse>,
}
