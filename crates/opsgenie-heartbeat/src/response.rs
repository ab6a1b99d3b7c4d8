//! Completion callback sent back to the stack orchestrator.

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ProvisionError, Result};
use crate::event::LifecycleEvent;

/// Outcome reported to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Payload returned on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseData {
    pub name: String,
}

/// Body of the completion callback.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompletionResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub data: Option<ResponseData>,
}

/// Delivers the single completion callback for an event.
#[derive(Debug, Clone)]
pub struct CompletionNotifier {
    log_stream_name: String,
    client: reqwest::Client,
}

impl CompletionNotifier {
    /// Create a notifier whose default reason points at `log_stream_name`.
    #[must_use]
    pub fn new(log_stream_name: impl Into<String>) -> Self {
        Self {
            log_stream_name: log_stream_name.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build the callback body. Without an explicit `reason` the body points
    /// at the invocation's log stream.
    #[must_use]
    pub fn build_response(
        &self,
        event: &LifecycleEvent,
        status: ResponseStatus,
        data: Option<ResponseData>,
        physical_resource_id: String,
        reason: Option<String>,
    ) -> CompletionResponse {
        CompletionResponse {
            status,
            reason: reason.unwrap_or_else(|| {
                format!(
                    "See the details in CloudWatch Log Stream: {}",
                    self.log_stream_name
                )
            }),
            physical_resource_id,
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            data,
        }
    }

    /// `PUT` the response to the event's callback URL.
    ///
    /// Failures are returned, not raised. Callers log and drop them so a
    /// broken callback never masks the invocation's own error.
    pub async fn send(
        &self,
        event: &LifecycleEvent,
        response: &CompletionResponse,
    ) -> Result<()> {
        let body = serde_json::to_string(response)?;

        debug!(
            status = ?response.status,
            physical_resource_id = %response.physical_resource_id,
            "Sending completion response"
        );

        let result = self
            .client
            .put(&event.response_url)
            .header(CONTENT_TYPE, "")
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await?;

        let status = result.status();
        if status.is_success() {
            debug!("Completion response delivered");
            Ok(())
        } else {
            let body = result.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Completion callback rejected");
            Err(ProvisionError::RemoteApi { status, body })
        }
    }
}
