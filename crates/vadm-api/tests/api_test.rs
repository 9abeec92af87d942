//! Router-level tests exercising auth, scoping, validation, and the
//! unavailable-dependency paths. The pool connects lazily, so every case
//! here must fail (or succeed) before the first database query.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use vadm_api::state::{AppConfig, AppState};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "test-secret";
const TENANT: &str = "tenant-1";
const CUST_A: &str = "550e8400-e29b-41d4-a716-446655440000";
const CUST_B: &str = "7f8e9a10-1b2c-43d4-a5e6-778899aabbcc";
const ORG_A: &str = "0a1b2c3d-4e5f-4678-9abc-def012345678";

fn test_app() -> Router {
    let state = AppState {
        db: vadm_api::db::init_pool().expect("lazy pool"),
        directory: None,
        credentials: None,
        config: AppConfig {
            port: 0,
            auth_token: Some(SECRET.to_string()),
            verifier_expiry_days: 30,
        },
    };
    vadm_api::app(state)
}

fn test_app_with_directory(base_url: &str) -> Router {
    let config = vadm_directory_client::DirectoryConfig::local_mock(base_url, TENANT)
        .expect("mock directory config");
    let directory = vadm_directory_client::DirectoryClient::new(config).expect("directory client");
    let state = AppState {
        db: vadm_api::db::init_pool().expect("lazy pool"),
        directory: Some(directory),
        credentials: None,
        config: AppConfig {
            port: 0,
            auth_token: Some(SECRET.to_string()),
            verifier_expiry_days: 30,
        },
    };
    vadm_api::app(state)
}

fn sysadmin() -> String {
    format!("Bearer {SECRET}")
}

fn scoped(role: &str, customer: &str, org: &str) -> String {
    format!("Bearer {role}:{customer}:{org}:{SECRET}")
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn error_code(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    value["error"]["code"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn health_probes_skip_auth() {
    let app = test_app();
    let response = app
        .oneshot(request("GET", "/health/liveness", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_token_rejected() {
    let app = test_app();
    let response = app
        .oneshot(request("GET", "/customers", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_secret_rejected() {
    let app = test_app();
    let response = app
        .oneshot(request("GET", "/customers", Some("Bearer nope"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn orgadmin_cannot_create_customer() {
    let app = test_app();
    let token = scoped("orgadmin", CUST_A, ORG_A);
    let response = app
        .oneshot(request(
            "POST",
            "/customers",
            Some(&token),
            Some(json!({"name": "Acme"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(response).await, "FORBIDDEN");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = test_app();
    let token = sysadmin();
    let req = Request::builder()
        .method("POST")
        .uri("/customers")
        .header(header::AUTHORIZATION, &token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_customer_name_fails_validation() {
    let app = test_app();
    let token = sysadmin();
    let response = app
        .oneshot(request(
            "POST",
            "/customers",
            Some(&token),
            Some(json!({"name": "   "})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(response).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn custadmin_scope_blocks_other_customer() {
    let app = test_app();
    let token = scoped("custadmin", CUST_A, "*");
    let response = app
        .oneshot(request(
            "POST",
            &format!("/customers/{CUST_B}/orgs"),
            Some(&token),
            Some(json!({"name": "Clinic"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn verifier_expiry_must_be_positive() {
    let app = test_app();
    let token = sysadmin();
    let response = app
        .oneshot(request(
            "POST",
            &format!("/customers/{CUST_A}/orgs/{ORG_A}/verifiers"),
            Some(&token),
            Some(json!({
                "name": "Front desk",
                "verifierType": "scanner",
                "daysTillExpiry": 0
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_credential_format_rejected() {
    let app = test_app();
    let token = sysadmin();
    let verifier = "0b1b2c3d-4e5f-4678-9abc-def012345678";
    let response = app
        .oneshot(request(
            "GET",
            &format!("/customers/{CUST_A}/orgs/{ORG_A}/verifiers/{verifier}/credential?type=png"),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn master_profile_read_forbidden() {
    let app = test_app();
    let token = scoped("orgadmin", CUST_A, ORG_A);
    let response = app
        .oneshot(request("GET", "/profiles/-1", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn master_profile_delete_forbidden() {
    let app = test_app();
    let token = sysadmin();
    let response = app
        .oneshot(request("DELETE", "/profiles/-1", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_validates_email_shape() {
    let app = test_app();
    let token = sysadmin();
    let response = app
        .oneshot(request(
            "POST",
            "/users/login",
            Some(&token),
            Some(json!({"email": "not-an-email", "password": "pw"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn login_returns_directory_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/oauth/v4/{TENANT}/token")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-123",
            "id_token": "idt-456",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let app = test_app_with_directory(&server.uri());
    let token = sysadmin();
    let response = app
        .oneshot(request(
            "POST",
            "/users/login",
            Some(&token),
            Some(json!({"email": "ada@example.com", "password": "pw"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["access_token"], "at-123");
    assert_eq!(body["id_token"], "idt-456");
    assert_eq!(body["expires_in"], 3600);
}

#[tokio::test]
async fn login_hides_bad_credential_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/oauth/v4/{TENANT}/token")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "user does not exist in tenant"
        })))
        .mount(&server)
        .await;

    let app = test_app_with_directory(&server.uri());
    let token = sysadmin();
    let response = app
        .oneshot(request(
            "POST",
            "/users/login",
            Some(&token),
            Some(json!({"email": "ada@example.com", "password": "wrong"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let message = body["error"]["message"].as_str().unwrap_or_default();
    assert!(message.contains("invalid credentials"), "{message}");
    assert!(!message.contains("tenant"));
}

#[tokio::test]
async fn onboard_rejects_unknown_role() {
    let app = test_app();
    let token = sysadmin();
    let response = app
        .oneshot(request(
            "POST",
            "/users",
            Some(&token),
            Some(json!({
                "email": "admin@example.com",
                "firstName": "Ada",
                "lastName": "Admin",
                "role": "superadmin"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn onboarding_rolls_back_directory_account_on_attribute_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/oauth/v4/{TENANT}/token")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/management/v4/{TENANT}/cloud_directory/Users"
        )))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"totalResults": 0, "Resources": []})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/management/v4/{TENANT}/cloud_directory/sign_up"
        )))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "dir-u1", "profileId": "prof-1"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/management/v4/{TENANT}/roles")))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"roles": [{"id": "r1", "name": "verifier-sysadmin"}]}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/management/v4/{TENANT}/users/prof-1/roles")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"roles": []})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/management/v4/{TENANT}/users/prof-1/roles")))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    // The attribute write is the first step to fail.
    Mock::given(method("PUT"))
        .and(path("/api/v1/attributes/customer_id"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "forbidden"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!(
            "/management/v4/{TENANT}/cloud_directory/remove/dir-u1"
        )))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app_with_directory(&server.uri());
    let token = sysadmin();
    let response = app
        .oneshot(request(
            "POST",
            "/users",
            Some(&token),
            Some(json!({
                "email": "ada@example.com",
                "firstName": "Ada",
                "lastName": "Admin",
                "role": "sysadmin"
            })),
        ))
        .await
        .unwrap();
    assert!(response.status().is_server_error());

    // The account created by sign-up must be removed again so the email
    // is free for a retry.
    let requests = server.received_requests().await.unwrap();
    let signups = requests
        .iter()
        .filter(|r| r.url.path().ends_with("/cloud_directory/sign_up"))
        .count();
    let removals = requests
        .iter()
        .filter(|r| r.url.path().ends_with("/cloud_directory/remove/dir-u1"))
        .count();
    assert_eq!(signups, 1);
    assert_eq!(removals, 1);
}

#[tokio::test]
async fn user_list_requires_a_filter() {
    let app = test_app();
    let token = sysadmin();
    let response = app
        .oneshot(request("GET", "/users", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn app_setup_unavailable_without_directory() {
    let app = test_app();
    let token = sysadmin();
    let response = app
        .oneshot(request("POST", "/users/app-setup", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(response).await, "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn reconcile_unavailable_without_credential_service() {
    let app = test_app();
    let token = sysadmin();
    let response = app
        .oneshot(request(
            "POST",
            "/verifiers/reconcile-revocations",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn reconcile_requires_sysadmin() {
    let app = test_app();
    let token = scoped("custadmin", CUST_A, "*");
    let response = app
        .oneshot(request(
            "POST",
            "/verifiers/reconcile-revocations",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = test_app();
    let token = sysadmin();
    let response = app
        .oneshot(request("GET", "/openapi.json", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let spec: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(spec["paths"]["/customers"].is_object());
    assert!(spec["paths"]["/users/login"].is_object());
}
