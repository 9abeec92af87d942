//! Contract tests for CredentialClient against a mocked credential service.

use chrono::{TimeZone, Utc};
use vadm_credential_client::{CredentialClient, CredentialConfig, VerifierCredentialData};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(mock_server: &MockServer) -> CredentialClient {
    let config = CredentialConfig::local_mock(&mock_server.uri()).unwrap();
    CredentialClient::new(config).unwrap()
}

fn sample_data() -> VerifierCredentialData {
    VerifierCredentialData {
        credential_type: VerifierCredentialData::credential_type().to_string(),
        name: "Front desk".into(),
        verifier_type: "scanner".into(),
        organization_id: "org-1".into(),
        customer_id: "cust-1".into(),
        config_id: "cfg-1".into(),
        config_name: "default".into(),
        customer: "Acme Health".into(),
        organization: "Acme Clinic East".into(),
    }
}

async fn mount_health_authorities(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/health-authorities"))
        .and(query_param("own", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "payload": [{"id": "did:example:authority"}]
        })))
        .mount(mock_server)
        .await;
}

// ── Issuance ─────────────────────────────────────────────────────────

#[tokio::test]
async fn issue_resolves_schema_and_returns_did() {
    let mock_server = MockServer::start().await;
    mount_health_authorities(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/credentials"))
        .and(query_param("type", "string"))
        .and(header("x-hpass-issuer-id", "test-issuer"))
        .and(header("x-hpass-txn-id", "txn-42"))
        .and(body_string_contains(
            "\"schemaID\":\"did:example:authority;verifier-credential\"",
        ))
        .and(body_string_contains("\"type\":[\"VerifierCredential\"]"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "payload": {
                "id": "did:example:123#vc-1",
                "issuer": "did:example:authority",
                "credentialSubject": {"configId": "cfg-1"}
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let expiry = Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap();
    let issued = client
        .issue_verifier_credential("caller-token", "txn-42", &sample_data(), expiry)
        .await
        .unwrap();

    assert_eq!(issued.did, "did:example:123#vc-1");
    assert_eq!(issued.issuer.as_deref(), Some("did:example:authority"));
    assert_eq!(issued.document["credentialSubject"]["configId"], "cfg-1");
}

#[tokio::test]
async fn issue_without_credential_id_is_incomplete() {
    let mock_server = MockServer::start().await;
    mount_health_authorities(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/credentials"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "payload": {"issuer": "did:example:authority"}
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let expiry = Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap();
    let err = client
        .issue_verifier_credential("caller-token", "txn-1", &sample_data(), expiry)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("incomplete"), "got: {err}");
}

#[tokio::test]
async fn schema_resolution_fails_on_ambiguous_authorities() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/health-authorities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "payload": [
                {"id": "did:example:one"},
                {"id": "did:example:two"}
            ]
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.resolve_schema_id("caller-token").await.unwrap_err();
    assert!(err.to_string().contains("schema resolution"), "got: {err}");
}

#[tokio::test]
async fn configured_schema_id_skips_resolution() {
    let mock_server = MockServer::start().await;
    // No health-authorities mock — a lookup would fail the test.
    let mut config = CredentialConfig::local_mock(&mock_server.uri()).unwrap();
    config.schema_id = Some("did:example:fixed;verifier-credential".into());
    let client = CredentialClient::new(config).unwrap();

    let schema = client.resolve_schema_id("caller-token").await.unwrap();
    assert_eq!(schema, "did:example:fixed;verifier-credential");
}

// ── Revocation ───────────────────────────────────────────────────────

#[tokio::test]
async fn revoke_posts_credential_id_and_reason() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/credentials/revoke"))
        .and(header("x-hpass-issuer-id", "test-issuer"))
        .and(body_string_contains("\"credentialID\":\"did:example:123#vc-1\""))
        .and(body_string_contains("\"reason\":\"verifier deleted\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "payload": {"status": "revoked"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    client
        .revoke_credential("caller-token", "did:example:123#vc-1", "verifier deleted")
        .await
        .unwrap();
}

#[tokio::test]
async fn duplicate_revoke_error_exposes_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/credentials/revoke"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"message":"revocation already exists"}"#),
        )
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .revoke_credential("caller-token", "did:example:123#vc-1", "cleanup")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(err.body().unwrap_or_default().contains("already exists"));
}

// ── Revoke status ────────────────────────────────────────────────────

#[tokio::test]
async fn is_revoked_encodes_did_fragment_in_path() {
    let mock_server = MockServer::start().await;

    // The '#' fragment separator must reach the server as %23.
    Mock::given(method("GET"))
        .and(path(
            "/api/v1/credentials/did:example:123%23vc-1/revoke_status/optional",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "payload": {"id": "did:example:123#vc-1", "reason": "verifier deleted"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let revoked = client
        .is_revoked("caller-token", "did:example:123#vc-1")
        .await
        .unwrap();
    assert!(revoked);
}

#[tokio::test]
async fn is_revoked_false_when_payload_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(
            "/api/v1/credentials/did:example:456/revoke_status/optional",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "payload": null
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let revoked = client
        .is_revoked("caller-token", "did:example:456")
        .await
        .unwrap();
    assert!(!revoked);
}
