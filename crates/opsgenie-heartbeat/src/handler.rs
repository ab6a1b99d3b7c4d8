//! Invocation boundary.
//!
//! Every event gets exactly one completion callback, whatever happens while it
//! is reconciled. Errors are reported through the callback and then returned
//! so the hosting process also fails.

use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ProvisionError, Result};
use crate::event::LifecycleEvent;
use crate::heartbeat::{HeartbeatApi, OpsgenieClient};
use crate::reconciler::{self, Outcome};
use crate::response::{CompletionNotifier, CompletionResponse, ResponseData, ResponseStatus};

/// Reconciles lifecycle events against a heartbeat store and reports back.
pub struct Provisioner<A> {
    api: A,
    notifier: CompletionNotifier,
}

impl<A: HeartbeatApi> Provisioner<A> {
    #[must_use]
    pub fn new(api: A, notifier: CompletionNotifier) -> Self {
        Self { api, notifier }
    }

    /// Handle one event and send its completion callback.
    #[instrument(
        skip_all,
        fields(
            request_id = %event.request_id,
            request_type = ?event.request_type,
            logical_resource_id = %event.logical_resource_id,
        )
    )]
    pub async fn handle(&self, event: &LifecycleEvent) -> Result<Outcome> {
        match reconciler::reconcile(&self.api, event).await {
            Ok(outcome) => {
                info!(
                    name = %outcome.name,
                    physical_resource_id = %outcome.physical_resource_id,
                    "Heartbeat reconciled"
                );
                let response = self.notifier.build_response(
                    event,
                    ResponseStatus::Success,
                    Some(ResponseData {
                        name: outcome.name.clone(),
                    }),
                    outcome.physical_resource_id.clone(),
                    None,
                );
                deliver(&self.notifier, event, &response).await;
                Ok(outcome)
            }
            Err(err) => {
                report_failure(&self.notifier, event, &err).await;
                Err(err)
            }
        }
    }
}

/// Send a FAILED callback for `err`.
///
/// The physical resource id is the event's own when present, otherwise a
/// fresh one, so the orchestrator never records the failed name as provisioned.
pub async fn report_failure(
    notifier: &CompletionNotifier,
    event: &LifecycleEvent,
    err: &ProvisionError,
) {
    error!(error = %err, "Heartbeat provisioning failed");

    let physical_resource_id = event
        .physical_resource_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let response = notifier.build_response(
        event,
        ResponseStatus::Failed,
        None,
        physical_resource_id,
        Some(err.to_string()),
    );
    deliver(notifier, event, &response).await;
}

// Callback errors are logged and dropped; the caller still returns its own result.
async fn deliver(
    notifier: &CompletionNotifier,
    event: &LifecycleEvent,
    response: &CompletionResponse,
) {
    if let Err(e) = notifier.send(event, response).await {
        error!(error = %e, "Failed to send completion response");
    }
}

/// Process one event against the Opsgenie API described by `config`.
///
/// Client setup happens inside the failure boundary, so a missing API key is
/// reported through the callback like any other error.
pub async fn run(config: &Config, event: &LifecycleEvent) -> Result<Outcome> {
    let notifier = CompletionNotifier::new(&config.log_stream_name);

    match OpsgenieClient::from_config(config) {
        Ok(client) => Provisioner::new(client, notifier).handle(event).await,
        Err(err) => {
            report_failure(&notifier, event, &err).await;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RESOURCE_TYPE;
    use crate::heartbeat::MockHeartbeatApi;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn callback_server(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/callback"))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    fn event(server: &MockServer, body: Value) -> LifecycleEvent {
        let mut base = json!({
            "ResourceType": RESOURCE_TYPE,
            "ResponseURL": format!("{}/callback", server.uri()),
            "StackId": "stack-1",
            "RequestId": "req-1",
            "LogicalResourceId": "Heartbeat",
        });
        for (key, value) in body.as_object().unwrap() {
            base[key] = value.clone();
        }
        serde_json::from_value(base).unwrap()
    }

    async fn callback_body(server: &MockServer) -> Value {
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        serde_json::from_slice(&requests[0].body).unwrap()
    }

    #[tokio::test]
    async fn test_success_sends_one_success_callback() {
        let server = callback_server(200).await;
        let mut api = MockHeartbeatApi::new();
        api.expect_create().times(1).returning(|_| Ok(()));

        let ev = event(
            &server,
            json!({"RequestType": "Create", "ResourceProperties": {"Name": "svc-a"}}),
        );
        let provisioner = Provisioner::new(api, CompletionNotifier::new("stream-1"));
        let outcome = provisioner.handle(&ev).await.unwrap();
        assert_eq!(outcome.physical_resource_id, "svc-a");

        let body = callback_body(&server).await;
        assert_eq!(body["Status"], "SUCCESS");
        assert_eq!(body["PhysicalResourceId"], "svc-a");
        assert_eq!(body["Data"], json!({"Name": "svc-a"}));
        assert_eq!(
            body["Reason"],
            "See the details in CloudWatch Log Stream: stream-1"
        );
    }

    #[tokio::test]
    async fn test_failure_sends_failed_callback_and_returns_error() {
        let server = callback_server(200).await;
        let mut api = MockHeartbeatApi::new();
        api.expect_delete().times(1).returning(|name| {
            Err(ProvisionError::NotFound {
                name: name.to_string(),
            })
        });

        let ev = event(
            &server,
            json!({
                "RequestType": "Delete",
                "PhysicalResourceId": "svc-a",
                "ResourceProperties": {"Name": "svc-a"},
            }),
        );
        let provisioner = Provisioner::new(api, CompletionNotifier::new("stream-1"));
        let err = provisioner.handle(&ev).await.unwrap_err();
        assert!(matches!(err, ProvisionError::NotFound { .. }));

        let body = callback_body(&server).await;
        assert_eq!(body["Status"], "FAILED");
        assert_eq!(body["PhysicalResourceId"], "svc-a");
        assert!(body["Reason"].as_str().unwrap().contains("does not exist"));
        assert!(body["Data"].is_null());
    }

    #[tokio::test]
    async fn test_failure_without_physical_id_generates_one() {
        let server = callback_server(200).await;
        let api = MockHeartbeatApi::new();

        let ev = event(
            &server,
            json!({"RequestType": "Create", "ResourceType": "Custom::Other",
                   "ResourceProperties": {"Name": "svc-a"}}),
        );
        let provisioner = Provisioner::new(api, CompletionNotifier::new("stream-1"));
        let err = provisioner.handle(&ev).await.unwrap_err();
        assert!(matches!(err, ProvisionError::UnsupportedResourceType(_)));

        let body = callback_body(&server).await;
        assert_eq!(body["Status"], "FAILED");
        let id = body["PhysicalResourceId"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_rejected_callback_does_not_change_result() {
        let server = callback_server(500).await;
        let mut api = MockHeartbeatApi::new();
        api.expect_update().times(1).returning(|_| Ok(()));

        let ev = event(
            &server,
            json!({
                "RequestType": "Update",
                "PhysicalResourceId": "svc-a",
                "ResourceProperties": {"Name": "svc-a", "Enabled": "false"},
                "OldResourceProperties": {"Name": "svc-a"},
            }),
        );
        let provisioner = Provisioner::new(api, CompletionNotifier::new("stream-1"));
        assert!(provisioner.handle(&ev).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_without_api_key_reports_failure() {
        let server = callback_server(200).await;
        let config = Config {
            api_key: None,
            api_url: server.uri(),
            log_stream_name: "stream-1".to_string(),
        };

        let ev = event(
            &server,
            json!({"RequestType": "Create", "ResourceProperties": {"Name": "svc-a"}}),
        );
        let err = run(&config, &ev).await.unwrap_err();
        assert!(matches!(err, ProvisionError::MissingApiKey(_)));

        let body = callback_body(&server).await;
        assert_eq!(body["Status"], "FAILED");
        assert_eq!(body["Reason"], "OPSGENIE_HEARTBEAT_API_KEY not set");
    }
}
