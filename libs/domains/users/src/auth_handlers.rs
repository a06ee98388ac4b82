use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, patch, post},
};
use axum_helpers::{
    ValidatedJson, ValidatedQuery,
    errors::responses::{
        BadRequestResponse, BadRequestValidationResponse, ForbiddenResponse,
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::auth_service::AuthService;
use crate::error::{UserError, UserResult};
use crate::guard::{ADMIN_ONLY, AccessGuard, authenticate, require_roles};
use crate::models::{
    ApproveSellerQuery, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    RegisterAdmin, RegisterCustomer, RegisterSeller, ResetPasswordRequest, Role, UserEnvelope,
    UserResponse, VerifyEmailQuery,
};
use crate::repository::UserRepository;

/// OpenAPI documentation for the auth API
#[derive(OpenApi)]
#[openapi(
    paths(
        register_admin,
        register_customer,
        register_seller,
        verify_email,
        approve_seller,
        login,
        forgot_password,
        reset_password,
    ),
    components(
        schemas(
            RegisterAdmin,
            RegisterCustomer,
            RegisterSeller,
            LoginRequest,
            LoginResponse,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            MessageResponse,
            UserEnvelope,
            UserResponse,
            Role
        ),
        responses(
            BadRequestResponse,
            BadRequestValidationResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            NotFoundResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login, verification and password recovery")
    )
)]
pub struct AuthApiDoc;

/// Create the auth router. `approve-seller` is restricted to admins.
pub fn router<R: UserRepository + 'static>(
    service: AuthService<R>,
    guard: AccessGuard<R>,
) -> Router {
    let admin = Router::new()
        .route("/approve-seller", patch(approve_seller::<R>))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            require_roles(ADMIN_ONLY, req, next)
        }))
        .route_layer(middleware::from_fn_with_state(guard, authenticate::<R>));

    Router::new()
        .route("/register/admin", post(register_admin::<R>))
        .route("/register/customer", post(register_customer::<R>))
        .route("/register/seller", post(register_seller::<R>))
        .route("/verify-email", get(verify_email::<R>))
        .route("/login", post(login::<R>))
        .route("/forgot-password", post(forgot_password::<R>))
        .route("/reset-password", post(reset_password::<R>))
        .merge(admin)
        .with_state(Arc::new(service))
}

fn envelope(message: &str, user: UserResponse) -> UserEnvelope {
    UserEnvelope {
        message: message.to_string(),
        user,
    }
}

/// Register an admin account (requires the admin secret)
#[utoipa::path(
    post,
    path = "/register/admin",
    tag = "Auth",
    request_body = RegisterAdmin,
    responses(
        (status = 201, description = "Admin registered", body = UserEnvelope),
        (status = 400, response = BadRequestValidationResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn register_admin<R: UserRepository>(
    State(service): State<Arc<AuthService<R>>>,
    ValidatedJson(input): ValidatedJson<RegisterAdmin>,
) -> UserResult<impl IntoResponse> {
    let user = service.register_admin(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(envelope("Admin registered successfully.", user)),
    ))
}

/// Register a customer and send a verification email
#[utoipa::path(
    post,
    path = "/register/customer",
    tag = "Auth",
    request_body = RegisterCustomer,
    responses(
        (status = 201, description = "Customer registered", body = UserEnvelope),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn register_customer<R: UserRepository>(
    State(service): State<Arc<AuthService<R>>>,
    ValidatedJson(input): ValidatedJson<RegisterCustomer>,
) -> UserResult<impl IntoResponse> {
    let user = service.register_customer(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(envelope("Customer registered. Please verify your email.", user)),
    ))
}

/// Register a seller pending admin approval
#[utoipa::path(
    post,
    path = "/register/seller",
    tag = "Auth",
    request_body = RegisterSeller,
    responses(
        (status = 201, description = "Seller registered", body = UserEnvelope),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn register_seller<R: UserRepository>(
    State(service): State<Arc<AuthService<R>>>,
    ValidatedJson(input): ValidatedJson<RegisterSeller>,
) -> UserResult<impl IntoResponse> {
    let user = service.register_seller(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(envelope("Seller registered. Awaiting admin approval.", user)),
    ))
}

/// Verify an email address with a verification or seller approval token
#[utoipa::path(
    get,
    path = "/verify-email",
    tag = "Auth",
    params(VerifyEmailQuery),
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn verify_email<R: UserRepository>(
    State(service): State<Arc<AuthService<R>>>,
    ValidatedQuery(query): ValidatedQuery<VerifyEmailQuery>,
) -> UserResult<Json<MessageResponse>> {
    service
        .verify_email(query.token.as_deref(), query.email.as_deref())
        .await?;
    Ok(Json(MessageResponse::new(
        "Email verified successfully. You can now log in.",
    )))
}

/// Approve a seller and email them a verification link (admin only)
#[utoipa::path(
    patch,
    path = "/approve-seller",
    tag = "Auth",
    params(ApproveSellerQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Seller approved", body = UserEnvelope),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn approve_seller<R: UserRepository>(
    State(service): State<Arc<AuthService<R>>>,
    ValidatedQuery(query): ValidatedQuery<ApproveSellerQuery>,
) -> UserResult<Json<UserEnvelope>> {
    let seller_id = query
        .seller_id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or_else(|| UserError::Validation("Invalid Seller ID format".to_string()))?;

    let user = service.approve_seller(seller_id).await?;
    Ok(Json(envelope(
        "Seller approved and verification email sent.",
        user,
    )))
}

/// Log in and receive a bearer token
#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn login<R: UserRepository>(
    State(service): State<Arc<AuthService<R>>>,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> UserResult<Json<LoginResponse>> {
    let response = service.login(&input.email, &input.password).await?;
    Ok(Json(response))
}

/// Email a one-hour password reset link
#[utoipa::path(
    post,
    path = "/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent", body = MessageResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn forgot_password<R: UserRepository>(
    State(service): State<Arc<AuthService<R>>>,
    ValidatedJson(input): ValidatedJson<ForgotPasswordRequest>,
) -> UserResult<Json<MessageResponse>> {
    service.forgot_password(&input.email).await?;
    Ok(Json(MessageResponse::new("Password reset email sent")))
}

/// Set a new password using a reset token
#[utoipa::path(
    post,
    path = "/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn reset_password<R: UserRepository>(
    State(service): State<Arc<AuthService<R>>>,
    ValidatedJson(input): ValidatedJson<ResetPasswordRequest>,
) -> UserResult<Json<MessageResponse>> {
    service
        .reset_password(&input.token, &input.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Password reset successful")))
}
