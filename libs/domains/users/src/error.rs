use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;

/// Why a request could not be authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    NoToken,
    InvalidToken,
    UserNotFound,
}

impl AuthFailure {
    pub fn message(&self) -> &'static str {
        match self {
            AuthFailure::NoToken => "Unauthorized: No token provided",
            AuthFailure::InvalidToken => "Unauthorized: Invalid token",
            AuthFailure::UserNotFound => "Unauthorized: User not found",
        }
    }
}

#[derive(Debug, Error)]
pub enum UserError {
    // 400
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("User with email '{0}' already exists")]
    DuplicateEmail(String),

    // 401
    #[error("{}", .0.message())]
    Unauthorized(AuthFailure),

    #[error("Invalid credentials")]
    InvalidCredentials,

    // 403
    #[error("Forbidden: Access denied")]
    Forbidden,

    #[error("Invalid admin secret key")]
    InvalidAdminSecret,

    #[error("Verify your email before logging in")]
    NotVerified,

    #[error("Account suspended: {0}")]
    Suspended(String),

    #[error("Seller account is pending approval")]
    PendingApproval,

    // 404
    #[error("User not found: {0}")]
    NotFound(Uuid),

    #[error("No account registered with this email")]
    EmailNotFound,

    #[error("Seller not found or role is not SELLER")]
    NotASeller,

    // 500
    #[error("Database error: {0}")]
    Database(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

/// Convert UserError to AppError for standardized error responses
impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(msg) => AppError::BadRequest(msg),
            UserError::InvalidOrExpiredToken => {
                AppError::BadRequest("Invalid or expired token".to_string())
            }
            UserError::DuplicateEmail(email) => {
                tracing::debug!(%email, "Registration with existing email");
                AppError::BadRequest("Email already registered".to_string())
            }
            UserError::Unauthorized(reason) => AppError::Unauthorized(reason.message().to_string()),
            UserError::InvalidCredentials => {
                AppError::Unauthorized("Invalid email or password".to_string())
            }
            UserError::Forbidden => AppError::Forbidden("Forbidden: Access denied".to_string()),
            UserError::InvalidAdminSecret => {
                AppError::Forbidden("Invalid admin secret key".to_string())
            }
            UserError::NotVerified => {
                AppError::Forbidden("Verify your email before logging in".to_string())
            }
            UserError::Suspended(reason) => {
                AppError::Forbidden(format!("Your account has been suspended. Reason: {}", reason))
            }
            UserError::PendingApproval => {
                AppError::Forbidden("Seller account is pending approval".to_string())
            }
            UserError::NotFound(id) => AppError::NotFound(format!("User {} not found", id)),
            UserError::EmailNotFound => AppError::NotFound("User not found".to_string()),
            UserError::NotASeller => {
                AppError::NotFound("Seller not found or role is not SELLER".to_string())
            }
            UserError::Database(msg) => AppError::Database(msg),
            UserError::Email(msg) => AppError::EmailDelivery(msg),
            UserError::PasswordHash(msg) | UserError::Token(msg) | UserError::Internal(msg) => {
                AppError::InternalServerError(msg)
            }
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for UserError {
    fn from(err: mongodb::error::Error) -> Self {
        UserError::Database(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for UserError {
    fn from(err: bcrypt::BcryptError) -> Self {
        UserError::PasswordHash(err.to_string())
    }
}

impl From<tokio::task::JoinError> for UserError {
    fn from(err: tokio::task::JoinError) -> Self {
        UserError::Internal(format!("blocking task failed: {}", err))
    }
}
