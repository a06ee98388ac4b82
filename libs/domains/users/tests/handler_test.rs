//! Handler tests for the Users domain
//!
//! These drive the auth and users routers over HTTP with an in-memory
//! repository and a capturing mail provider:
//! - Status codes and the error envelope
//! - Bearer authentication and role checks in front of handlers
//! - The registration, verification, approval and login flows end to end

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum_helpers::{JwtAuth, JwtConfig};
use domain_users::*;
use email::{Mailer, MockSmtpProvider};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For oneshot()
use uuid::Uuid;

const ADMIN_SECRET: &str = "handler-test-admin-secret";
const JWT_SECRET: &str = "handler-test-jwt-secret-0123456789abcdef";

struct TestApp {
    auth: Router,
    users: Router,
    repo: Arc<InMemoryUserRepository>,
    outbox: MockSmtpProvider,
}

fn test_app_with(provider: MockSmtpProvider) -> TestApp {
    let repo = Arc::new(InMemoryUserRepository::new());
    let jwt = JwtAuth::new(&JwtConfig::new(JWT_SECRET).unwrap());
    let config = AccountsConfig::new(ADMIN_SECRET, "http://shop.test", "http://api.shop.test")
        .unwrap();
    let mailer = AccountMailer::new(Mailer::new(Arc::new(provider.clone())), &config).unwrap();

    let auth_service = AuthService::new(
        repo.clone(),
        TokenManager::new(repo.clone(), jwt.clone()),
        Arc::new(mailer),
        ADMIN_SECRET,
    );
    let guard = AccessGuard::new(repo.clone(), jwt);

    TestApp {
        auth: auth_handlers::router(auth_service, guard.clone()),
        users: handlers::router(UserService::new(repo.clone()), guard),
        repo,
        outbox: provider,
    }
}

fn test_app() -> TestApp {
    test_app_with(MockSmtpProvider::new())
}

async fn json_body(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, json_body(response.into_body()).await)
}

async fn register_admin(app: &TestApp, email: &str) -> Uuid {
    let (status, body) = send(
        &app.auth,
        json_request(
            "POST",
            "/register/admin",
            json!({
                "name": "Root",
                "email": email,
                "password": "Admin123!",
                "adminSecret": ADMIN_SECRET
            }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["user"]["id"].as_str().unwrap().parse().unwrap()
}

async fn login(app: &TestApp, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        &app.auth,
        json_request(
            "POST",
            "/login",
            json!({ "email": email, "password": password }),
            None,
        ),
    )
    .await
}

async fn login_token(app: &TestApp, email: &str, password: &str) -> String {
    let (status, body) = login(app, email, password).await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn verified_customer_token(app: &TestApp, email: &str) -> String {
    let (status, body) = send(
        &app.auth,
        json_request(
            "POST",
            "/register/customer",
            json!({ "name": "Carol", "email": email, "password": "Secret1!" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id: Uuid = body["user"]["id"].as_str().unwrap().parse().unwrap();
    let token = app.repo.raw(id).await.unwrap().verification_token.unwrap();

    let (status, _) = send(
        &app.auth,
        empty_request(
            "GET",
            &format!("/verify-email?token={}&email={}", token, email),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    login_token(app, email, "Secret1!").await
}

#[tokio::test]
async fn test_customer_walkthrough() {
    let app = test_app();

    let (status, body) = send(
        &app.auth,
        json_request(
            "POST",
            "/register/customer",
            json!({ "name": "Alice", "email": "alice@example.com", "password": "Secret1!" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "CUSTOMER");
    assert_eq!(body["user"]["isVerified"], false);
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("verificationToken").is_none());
    assert!(app.outbox.last_sent_to("alice@example.com").await.is_some());

    let (status, body) = login(&app, "alice@example.com", "Secret1!").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    let id: Uuid = app
        .repo
        .find_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap()
        .id;
    let token = app.repo.raw(id).await.unwrap().verification_token.unwrap();

    let (status, _) = send(
        &app.auth,
        empty_request(
            "GET",
            &format!("/verify-email?token={}&email=alice@example.com", token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = login(&app, "ALICE@example.com", "Secret1!").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["isVerified"], true);

    // Token is single use
    let (status, body) = send(
        &app.auth,
        empty_request(
            "GET",
            &format!("/verify-email?token={}&email=alice@example.com", token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_register_validation_uses_error_envelope() {
    let app = test_app();

    let (status, body) = send(
        &app.auth,
        json_request(
            "POST",
            "/register/customer",
            json!({ "name": "Alice", "email": "not-an-email", "password": "short" }),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(body["code"].is_number());
    assert!(body["details"].get("email").is_some());
    assert!(body["details"].get("password").is_some());
    assert_eq!(app.outbox.sent_count().await, 0);
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let app = test_app();
    let body = json!({ "name": "Alice", "email": "alice@example.com", "password": "Secret1!" });

    let (status, _) = send(
        &app.auth,
        json_request("POST", "/register/customer", body.clone(), None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let mut again = body;
    again["email"] = json!("  Alice@Example.com ");
    let (status, body) = send(
        &app.auth,
        json_request("POST", "/register/customer", again, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already registered");
}

#[tokio::test]
async fn test_admin_registration_requires_secret() {
    let app = test_app();

    let (status, body) = send(
        &app.auth,
        json_request(
            "POST",
            "/register/admin",
            json!({
                "name": "Mallory",
                "email": "mallory@example.com",
                "password": "Admin123!",
                "adminSecret": "guess"
            }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Invalid admin secret key");

    register_admin(&app, "root@example.com").await;
    let token = login_token(&app, "root@example.com", "Admin123!").await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_seller_approval_flow() {
    let app = test_app();
    register_admin(&app, "root@example.com").await;
    let admin_token = login_token(&app, "root@example.com", "Admin123!").await;

    let (status, body) = send(
        &app.auth,
        json_request(
            "POST",
            "/register/seller",
            json!({
                "name": "Sam",
                "email": "sam@shop.test",
                "password": "Seller1!",
                "businessName": "Sam's Goods"
            }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["isApproved"], false);
    let seller_id: Uuid = body["user"]["id"].as_str().unwrap().parse().unwrap();

    let (status, _) = login(&app, "sam@shop.test", "Seller1!").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app.auth,
        empty_request(
            "PATCH",
            &format!("/approve-seller?sellerId={}", seller_id),
            Some(&admin_token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["isApproved"], true);

    let approval = app.repo.raw(seller_id).await.unwrap().approval_token.unwrap();
    let mail = app.outbox.last_sent_to("sam@shop.test").await.unwrap();
    assert!(
        mail.body_html
            .unwrap_or_default()
            .contains("http://api.shop.test/api/auth/verify-email")
    );

    let (status, _) = send(
        &app.auth,
        empty_request("GET", &format!("/verify-email?token={}", approval), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let token = login_token(&app, "sam@shop.test", "Seller1!").await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_approve_seller_guards() {
    let app = test_app();
    register_admin(&app, "root@example.com").await;
    let admin_token = login_token(&app, "root@example.com", "Admin123!").await;
    let customer_token = verified_customer_token(&app, "carol@example.com").await;

    let (status, body) = send(
        &app.auth,
        empty_request("PATCH", "/approve-seller?sellerId=abc", None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized: No token provided");

    let (status, _) = send(
        &app.auth,
        empty_request("PATCH", "/approve-seller?sellerId=abc", Some(&customer_token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app.auth,
        empty_request("PATCH", "/approve-seller?sellerId=abc", Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Seller ID format");

    let (status, _) = send(
        &app.auth,
        empty_request(
            "PATCH",
            &format!("/approve-seller?sellerId={}", Uuid::now_v7()),
            Some(&admin_token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_approval_email_failure_rolls_back() {
    let app = test_app_with(MockSmtpProvider::failing("relay down"));
    register_admin(&app, "root@example.com").await;
    let admin_token = login_token(&app, "root@example.com", "Admin123!").await;

    let (_, body) = send(
        &app.auth,
        json_request(
            "POST",
            "/register/seller",
            json!({
                "name": "Sam",
                "email": "sam@shop.test",
                "password": "Seller1!",
                "businessName": "Sam's Goods"
            }),
            None,
        ),
    )
    .await;
    let seller_id: Uuid = body["user"]["id"].as_str().unwrap().parse().unwrap();

    let (status, body) = send(
        &app.auth,
        empty_request(
            "PATCH",
            &format!("/approve-seller?sellerId={}", seller_id),
            Some(&admin_token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "EMAIL_DELIVERY");

    let seller = app.repo.raw(seller_id).await.unwrap();
    assert_eq!(seller.is_approved, Some(false));
    assert!(seller.approval_token.is_none());
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = test_app();
    verified_customer_token(&app, "carol@example.com").await;

    let (status, _) = send(
        &app.auth,
        json_request(
            "POST",
            "/forgot-password",
            json!({ "email": "nobody@example.com" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.auth,
        json_request(
            "POST",
            "/forgot-password",
            json!({ "email": "carol@example.com" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let id = app
        .repo
        .find_by_email("carol@example.com")
        .await
        .unwrap()
        .unwrap()
        .id;
    let token = app.repo.raw(id).await.unwrap().reset_password_token.unwrap();

    let (status, _) = send(
        &app.auth,
        json_request(
            "POST",
            "/reset-password",
            json!({ "token": token, "newPassword": "weak" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.auth,
        json_request(
            "POST",
            "/reset-password",
            json!({ "token": token, "newPassword": "Changed9?" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = login(&app, "carol@example.com", "Secret1!").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    login_token(&app, "carol@example.com", "Changed9?").await;
}

#[tokio::test]
async fn test_list_users_requires_admin() {
    let app = test_app();
    let customer_token = verified_customer_token(&app, "carol@example.com").await;

    let (status, body) = send(&app.users, empty_request("GET", "/", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, body) = send(&app.users, empty_request("GET", "/", Some("garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized: Invalid token");

    let (status, body) = send(
        &app.users,
        empty_request("GET", "/", Some(&customer_token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden: Access denied");
}

#[tokio::test]
async fn test_list_users_rejects_page_beyond_limit() {
    let app = test_app();
    register_admin(&app, "root@example.com").await;
    let admin_token = login_token(&app, "root@example.com", "Admin123!").await;

    let (status, body) = send(
        &app.users,
        empty_request(
            "GET",
            "/?page=18446744073709551615&limit=100",
            Some(&admin_token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(body["details"].get("page").is_some());
}

#[tokio::test]
async fn test_admin_user_management() {
    let app = test_app();
    register_admin(&app, "root@example.com").await;
    let admin_token = login_token(&app, "root@example.com", "Admin123!").await;
    verified_customer_token(&app, "carol@example.com").await;
    let carol = app
        .repo
        .find_by_email("carol@example.com")
        .await
        .unwrap()
        .unwrap();

    let (status, body) = send(
        &app.users,
        empty_request("GET", "/?role=CUSTOMER&limit=5", Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalUsers"], 1);
    assert_eq!(body["users"][0]["email"], "carol@example.com");

    let (status, body) = send(
        &app.users,
        json_request(
            "PATCH",
            "/suspend",
            json!({ "userId": carol.id }),
            Some(&admin_token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isSuspended"], true);

    let (status, body) = login(&app, "carol@example.com", "Secret1!").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Your account has been suspended. Reason: Policy violation"
    );

    let (status, _) = send(
        &app.users,
        json_request(
            "PATCH",
            "/unsuspend",
            json!({ "userId": carol.id }),
            Some(&admin_token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    login_token(&app, "carol@example.com", "Secret1!").await;

    let (status, _) = send(
        &app.users,
        empty_request("DELETE", &format!("/{}", carol.id), Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app.users,
        empty_request("GET", &format!("/{}", carol.id), Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = login(&app, "carol@example.com", "Secret1!").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_member_routes_open_to_every_role() {
    let app = test_app();
    register_admin(&app, "root@example.com").await;
    let admin_token = login_token(&app, "root@example.com", "Admin123!").await;
    let customer_token = verified_customer_token(&app, "carol@example.com").await;
    let carol = app
        .repo
        .find_by_email("carol@example.com")
        .await
        .unwrap()
        .unwrap();
    let uri = format!("/{}", carol.id);

    for token in [&admin_token, &customer_token] {
        let (status, body) = send(&app.users, empty_request("GET", &uri, Some(token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "carol@example.com");
    }

    let (status, body) = send(&app.users, empty_request("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_profile_update_and_bad_uuid() {
    let app = test_app();
    let token = verified_customer_token(&app, "carol@example.com").await;

    let (status, body) = send(
        &app.users,
        json_request(
            "PATCH",
            "/profile",
            json!({ "name": "Caroline", "phone": "+1 555 0100" }),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Caroline");
    assert_eq!(body["phone"], "+1 555 0100");

    let (status, body) = send(
        &app.users,
        empty_request("GET", "/not-a-uuid", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
}
