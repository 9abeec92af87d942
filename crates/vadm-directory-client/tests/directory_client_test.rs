//! Contract tests for DirectoryClient against a mocked identity provider.
//!
//! wiremock stands in for the cloud-directory auth server; every path and
//! body shape mirrors the tenant management API.

use vadm_directory_client::{DirectoryClient, DirectoryConfig, NewDirectoryUser};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TENANT: &str = "tenant-abc";

fn test_client(mock_server: &MockServer) -> DirectoryClient {
    let config = DirectoryConfig::local_mock(&mock_server.uri(), TENANT).unwrap();
    DirectoryClient::new(config).unwrap()
}

// ── Token grants ─────────────────────────────────────────────────────

#[tokio::test]
async fn login_password_grant_returns_tokens() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/oauth/v4/{TENANT}/token")))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=admin%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "at-123",
            "id_token": "idt-456",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let tokens = client.login("admin@example.com", "hunter2").await.unwrap();
    assert_eq!(tokens.access_token, "at-123");
    assert_eq!(tokens.id_token.as_deref(), Some("idt-456"));
    assert_eq!(tokens.expires_in, Some(3600));
}

#[tokio::test]
async fn login_bad_credentials_surfaces_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/oauth/v4/{TENANT}/token")))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"error":"invalid_grant","error_description":"wrong password"}"#),
        )
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.login("admin@example.com", "nope").await.unwrap_err();
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn management_token_uses_client_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/oauth/v4/{TENANT}/token")))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "mgmt-token"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let tokens = client.management_token().await.unwrap();
    assert_eq!(tokens.access_token, "mgmt-token");
}

// ── Cloud directory users ────────────────────────────────────────────

#[tokio::test]
async fn find_user_by_email_returns_match() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/management/v4/{TENANT}/cloud_directory/Users"
        )))
        .and(query_param("query", "admin@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "totalResults": 1,
            "Resources": [{
                "id": "user-1",
                "userName": "admin@example.com",
                "emails": [{"value": "admin@example.com", "primary": true}],
                "name": {"givenName": "Ada", "familyName": "Admin"}
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let user = client
        .find_user_by_email("mgmt", "admin@example.com")
        .await
        .unwrap()
        .expect("user should be found");
    assert_eq!(user.id, "user-1");
    assert_eq!(user.primary_email(), Some("admin@example.com"));
}

#[tokio::test]
async fn find_user_by_email_returns_none_when_no_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/management/v4/{TENANT}/cloud_directory/Users"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "totalResults": 0,
            "Resources": []
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let user = client
        .find_user_by_email("mgmt", "ghost@example.com")
        .await
        .unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn sign_up_sends_scim_body_and_profile_flag() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!(
            "/management/v4/{TENANT}/cloud_directory/sign_up"
        )))
        .and(query_param("shouldCreateProfile", "true"))
        .and(query_param("language", "en"))
        .and(body_string_contains("\"givenName\":\"New\""))
        .and(body_string_contains("\"status\":\"CONFIRMED\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "user-9",
            "profileId": "profile-9",
            "userName": "new@example.com",
            "emails": [{"value": "new@example.com", "primary": true}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let new_user = NewDirectoryUser {
        email: "new@example.com".into(),
        given_name: "New".into(),
        family_name: "User".into(),
        password: None,
    };
    let created = client.sign_up("mgmt", &new_user, "Secret123").await.unwrap();
    assert_eq!(created.id, "user-9");
    assert_eq!(created.profile_id.as_deref(), Some("profile-9"));
}

#[tokio::test]
async fn delete_user_returns_false_on_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!(
            "/management/v4/{TENANT}/cloud_directory/remove/user-1"
        )))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let deleted = client.delete_user("mgmt", "user-1").await.unwrap();
    assert!(!deleted);
}

#[tokio::test]
async fn reset_password_email_posts_uuid_form() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!(
            "/management/v4/{TENANT}/cloud_directory/resend/RESET_PASSWORD"
        )))
        .and(body_string_contains("uuid=user-7"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    client
        .send_reset_password_email("mgmt", "user-7")
        .await
        .unwrap();
}

// ── Roles & scopes ───────────────────────────────────────────────────

#[tokio::test]
async fn create_role_short_circuits_when_role_exists() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/management/v4/{TENANT}/roles")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "roles": [{"id": "role-1", "name": "verifier-orgadmin"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    // No POST mock mounted — a create attempt would fail the test.
    let client = test_client(&mock_server);
    let id = client
        .create_role("mgmt", "verifier-orgadmin", "verifier.orgadmin")
        .await
        .unwrap();
    assert_eq!(id, "role-1");
}

#[tokio::test]
async fn create_role_posts_access_block_when_missing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/management/v4/{TENANT}/roles")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"roles": []})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/management/v4/{TENANT}/roles")))
        .and(body_string_contains("\"scopes\":[\"verifier.custadmin\"]"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "role-2",
            "name": "verifier-custadmin"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let id = client
        .create_role("mgmt", "verifier-custadmin", "verifier.custadmin")
        .await
        .unwrap();
    assert_eq!(id, "role-2");
}

#[tokio::test]
async fn create_scope_is_noop_when_present() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/management/v4/{TENANT}/applications/test-client/scopes"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "scopes": ["verifier.sysadmin", "meter.reporter"]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    // No PUT mock — a write attempt would fail the test.
    let client = test_client(&mock_server);
    client.create_scope("mgmt", "meter.reporter").await.unwrap();
}

#[tokio::test]
async fn assign_roles_merges_with_existing_assignments() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/management/v4/{TENANT}/users/profile-1/roles"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "roles": [{"id": "existing-role", "name": "meter-reporter"}]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path(format!(
            "/management/v4/{TENANT}/users/profile-1/roles"
        )))
        .and(body_string_contains("existing-role"))
        .and(body_string_contains("new-role"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    client
        .assign_roles_to_profile("mgmt", "profile-1", &["new-role".to_string()])
        .await
        .unwrap();
}
