use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{delete, get, patch},
};
use axum_helpers::{
    UuidPath, ValidatedJson, ValidatedQuery,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ForbiddenResponse,
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::UserResult;
use crate::guard::{ADMIN_ONLY, ANY_ROLE, AccessGuard, AuthUser, authenticate, require_roles};
use crate::models::{
    ChangeRoleRequest, ListUsersResponse, MessageResponse, Role, SuspendRequest,
    UnsuspendRequest, UpdateProfile, UserFilter, UserResponse,
};
use crate::repository::UserRepository;
use crate::service::UserService;

/// OpenAPI documentation for the users API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_users,
        get_user,
        update_profile,
        change_role,
        delete_user,
        suspend_user,
        unsuspend_user,
    ),
    components(
        schemas(
            UserResponse,
            ListUsersResponse,
            UpdateProfile,
            ChangeRoleRequest,
            SuspendRequest,
            UnsuspendRequest,
            MessageResponse,
            UserFilter,
            Role
        ),
        responses(
            BadRequestUuidResponse,
            BadRequestValidationResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            NotFoundResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Users", description = "User profile and administration endpoints")
    )
)]
pub struct ApiDoc;

/// Create the users router. Every route requires a bearer token; the
/// administration routes also require the ADMIN role.
pub fn router<R: UserRepository + 'static>(
    service: UserService<R>,
    guard: AccessGuard<R>,
) -> Router {
    let admin = Router::new()
        .route("/", get(list_users::<R>))
        .route("/change-role", patch(change_role::<R>))
        .route("/suspend", patch(suspend_user::<R>))
        .route("/unsuspend", patch(unsuspend_user::<R>))
        .route("/{id}", delete(delete_user::<R>))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            require_roles(ADMIN_ONLY, req, next)
        }));

    let member = Router::new()
        .route("/profile", patch(update_profile::<R>))
        .route("/{id}", get(get_user::<R>))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            require_roles(ANY_ROLE, req, next)
        }));

    Router::new()
        .merge(admin)
        .merge(member)
        .route_layer(middleware::from_fn_with_state(guard, authenticate::<R>))
        .with_state(Arc::new(service))
}

/// List users with pagination and filters (admin only)
#[utoipa::path(
    get,
    path = "",
    tag = "Users",
    params(UserFilter),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Page of users", body = ListUsersResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    ValidatedQuery(filter): ValidatedQuery<UserFilter>,
) -> UserResult<Json<ListUsersResponse>> {
    let (users, total_users) = service.list_users(filter).await?;
    Ok(Json(ListUsersResponse { total_users, users }))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 400, response = BadRequestUuidResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    UuidPath(id): UuidPath,
) -> UserResult<Json<UserResponse>> {
    let user = service.get_user(id).await?;
    Ok(Json(user))
}

/// Update the caller's own profile
#[utoipa::path(
    patch,
    path = "/profile",
    tag = "Users",
    request_body = UpdateProfile,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_profile<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    caller: AuthUser,
    ValidatedJson(input): ValidatedJson<UpdateProfile>,
) -> UserResult<Json<UserResponse>> {
    let user = service.update_profile(caller.id, input).await?;
    Ok(Json(user))
}

/// Change a user's role (admin only)
#[utoipa::path(
    patch,
    path = "/change-role",
    tag = "Users",
    request_body = ChangeRoleRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Role changed", body = UserResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn change_role<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    ValidatedJson(input): ValidatedJson<ChangeRoleRequest>,
) -> UserResult<Json<UserResponse>> {
    let user = service.change_role(input.user_id, input.role).await?;
    Ok(Json(user))
}

/// Soft-delete a user (admin only)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Users",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, response = BadRequestUuidResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    UuidPath(id): UuidPath,
) -> UserResult<impl IntoResponse> {
    service.delete_user(id).await?;
    Ok((
        StatusCode::OK,
        Json(MessageResponse::new("User deleted successfully")),
    ))
}

/// Suspend a user (admin only)
#[utoipa::path(
    patch,
    path = "/suspend",
    tag = "Users",
    request_body = SuspendRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User suspended", body = UserResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn suspend_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    ValidatedJson(input): ValidatedJson<SuspendRequest>,
) -> UserResult<Json<UserResponse>> {
    let user = service.suspend_user(input.user_id, input.reason).await?;
    Ok(Json(user))
}

/// Lift a suspension (admin only)
#[utoipa::path(
    patch,
    path = "/unsuspend",
    tag = "Users",
    request_body = UnsuspendRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User unsuspended", body = UserResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn unsuspend_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    ValidatedJson(input): ValidatedJson<UnsuspendRequest>,
) -> UserResult<Json<UserResponse>> {
    let user = service.unsuspend_user(input.user_id).await?;
    Ok(Json(user))
}
