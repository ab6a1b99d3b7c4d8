//! HTTP-level tests for the Opsgenie heartbeat client.

use opsgenie_heartbeat::{
    HeartbeatApi, HeartbeatSpec, IntervalUnit, OpsgenieClient, ProvisionError,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";
const HEARTBEAT_PATH: &str = "/v1/json/heartbeat";

fn client(server: &MockServer) -> OpsgenieClient {
    OpsgenieClient::new(API_KEY.to_string()).with_base_url(&format!("{}/v1/json", server.uri()))
}

fn not_found(name: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "error": format!("Heartbeat with name [{name}] does not exist"),
        "code": 17,
    }))
}

async fn mount_lookup(server: &MockServer, name: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(HEARTBEAT_PATH))
        .and(query_param("name", name))
        .and(query_param("apiKey", API_KEY))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn exists_is_true_on_success() {
    let server = MockServer::start().await;
    mount_lookup(&server, "svc-a", ResponseTemplate::new(200)).await;

    assert!(client(&server).exists("svc-a").await.unwrap());
}

#[tokio::test]
async fn exists_is_false_on_documented_not_found() {
    let server = MockServer::start().await;
    mount_lookup(&server, "svc-a", not_found("svc-a")).await;

    assert!(!client(&server).exists("svc-a").await.unwrap());
}

#[tokio::test]
async fn exists_surfaces_other_bad_requests() {
    let server = MockServer::start().await;
    // A not-found message for a different name is not a match
    mount_lookup(&server, "svc-a", not_found("svc-b")).await;

    let err = client(&server).exists("svc-a").await.unwrap_err();
    match err {
        ProvisionError::RemoteApi { status, body } => {
            assert_eq!(status.as_u16(), 400);
            assert!(body.contains("svc-b"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn exists_surfaces_auth_failure() {
    let server = MockServer::start().await;
    mount_lookup(
        &server,
        "svc-a",
        ResponseTemplate::new(401).set_body_string("Invalid apiKey"),
    )
    .await;

    let err = client(&server).exists("svc-a").await.unwrap_err();
    assert!(matches!(err, ProvisionError::RemoteApi { status, .. } if status.as_u16() == 401));
}

#[tokio::test]
async fn create_submits_full_spec_when_absent() {
    let server = MockServer::start().await;
    mount_lookup(&server, "svc-a", not_found("svc-a")).await;
    Mock::given(method("POST"))
        .and(path(HEARTBEAT_PATH))
        .and(body_json(json!({
            "apiKey": API_KEY,
            "name": "svc-a",
            "interval": 5,
            "intervalUnit": "minutes",
            "description": "Nightly batch",
            "enabled": true,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let spec = HeartbeatSpec::new("svc-a")
        .with_interval(5)
        .with_interval_unit(IntervalUnit::Minutes)
        .with_description("Nightly batch");
    client(&server).create(&spec).await.unwrap();
}

#[tokio::test]
async fn create_fails_when_name_taken() {
    let server = MockServer::start().await;
    mount_lookup(&server, "svc-a", ResponseTemplate::new(200)).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server)
        .create(&HeartbeatSpec::new("svc-a"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::AlreadyExists { ref name } if name == "svc-a"));
    assert_eq!(err.to_string(), "Heartbeat already exists: svc-a");
}

#[tokio::test]
async fn create_reports_remote_error_body() {
    let server = MockServer::start().await;
    mount_lookup(&server, "svc-a", not_found("svc-a")).await;
    Mock::given(method("POST"))
        .and(path(HEARTBEAT_PATH))
        .respond_with(ResponseTemplate::new(422).set_body_string("interval must be positive"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .create(&HeartbeatSpec::new("svc-a").with_interval(0))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("interval must be positive"));
}

#[tokio::test]
async fn update_skips_existence_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(HEARTBEAT_PATH))
        .and(body_json(json!({
            "apiKey": API_KEY,
            "name": "svc-a",
            "interval": null,
            "intervalUnit": null,
            "description": null,
            "enabled": false,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .update(&HeartbeatSpec::new("svc-a").with_enabled(false))
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_removes_existing_heartbeat() {
    let server = MockServer::start().await;
    mount_lookup(&server, "svc-a", ResponseTemplate::new(200)).await;
    Mock::given(method("DELETE"))
        .and(path(HEARTBEAT_PATH))
        .and(query_param("name", "svc-a"))
        .and(query_param("apiKey", API_KEY))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).delete("svc-a").await.unwrap();
}

#[tokio::test]
async fn delete_fails_when_absent() {
    let server = MockServer::start().await;
    mount_lookup(&server, "svc-a", not_found("svc-a")).await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server).delete("svc-a").await.unwrap_err();
    assert!(matches!(err, ProvisionError::NotFound { .. }));
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn unreachable_api_is_transport_error() {
    // Nothing listens on port 1
    let client = OpsgenieClient::new(API_KEY.to_string()).with_base_url("http://127.0.0.1:1");

    let err = client.exists("svc-a").await.unwrap_err();
    assert!(matches!(err, ProvisionError::Transport(_)));
}
