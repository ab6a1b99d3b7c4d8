//! Opsgenie heartbeat API client.
//!
//! Heartbeats are keyed by name. The API exposes a single upsert endpoint, so
//! the client checks existence itself before a create or a delete and turns a
//! duplicate create or a delete of nothing into an explicit error.
//!
//! The check and the mutation are two separate requests. A concurrent change to
//! the same name between them is not detected.
//!
//! # Usage
//!
//! ```no_run
//! use opsgenie_heartbeat::heartbeat::{HeartbeatApi, HeartbeatSpec, IntervalUnit, OpsgenieClient};
//!
//! # async fn example() -> opsgenie_heartbeat::Result<()> {
//! let client = OpsgenieClient::new("api-key".to_string());
//!
//! let spec = HeartbeatSpec::new("svc-a")
//!     .with_interval(5)
//!     .with_interval_unit(IntervalUnit::Minutes);
//!
//! client.create(&spec).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, DEFAULT_API_URL, ENV_API_KEY};
use crate::error::{ProvisionError, Result};

/// Unit of a heartbeat interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Minutes,
    Hours,
    Days,
}

impl IntervalUnit {
    /// Wire name sent to the API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntervalUnit {
    type Err = String;

    /// Accepts singular and plural forms, case-insensitively.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" | "minutes" => Ok(Self::Minutes),
            "hour" | "hours" => Ok(Self::Hours),
            "day" | "days" => Ok(Self::Days),
            other => Err(format!("unknown interval unit: {other:?}")),
        }
    }
}

impl<'de> Deserialize<'de> for IntervalUnit {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Desired state of one heartbeat.
///
/// `name` is the identity; every other field may change through an update.
/// Unset optional fields are sent as `null` and left to the API's defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatSpec {
    pub name: String,
    pub interval: Option<u32>,
    pub interval_unit: Option<IntervalUnit>,
    pub description: Option<String>,
    /// Defaults to `true`.
    pub enabled: bool,
}

impl HeartbeatSpec {
    /// Create a spec with only the name set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interval: None,
            interval_unit: None,
            description: None,
            enabled: true,
        }
    }

    /// Set the interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: u32) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set the interval unit.
    #[must_use]
    pub const fn with_interval_unit(mut self, unit: IntervalUnit) -> Self {
        self.interval_unit = Some(unit);
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set whether the heartbeat is enabled.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Operations against the remote heartbeat store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HeartbeatApi: Send + Sync {
    /// Whether a heartbeat with this name exists.
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Create a heartbeat. Fails with [`ProvisionError::AlreadyExists`] if the
    /// name is taken.
    async fn create(&self, spec: &HeartbeatSpec) -> Result<()>;

    /// Submit the full spec without an existence check.
    async fn update(&self, spec: &HeartbeatSpec) -> Result<()>;

    /// Delete a heartbeat. Fails with [`ProvisionError::NotFound`] if the name
    /// is not held.
    async fn delete(&self, name: &str) -> Result<()>;
}

/// HTTP client for the Opsgenie v1 heartbeat API.
#[derive(Clone)]
pub struct OpsgenieClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpsgenieClient {
    /// Create a client against the public Opsgenie API.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_API_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from handler configuration.
    ///
    /// # Errors
    /// Returns [`ProvisionError::MissingApiKey`] if no API key is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(ProvisionError::MissingApiKey(ENV_API_KEY))?;

        debug!(api_url = %config.api_url, "Opsgenie client initialized");

        Ok(Self::new(api_key).with_base_url(&config.api_url))
    }

    /// Point the client at a different API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/heartbeat", self.base_url)
    }

    async fn submit(&self, spec: &HeartbeatSpec) -> Result<()> {
        let payload = ApiPayload {
            api_key: &self.api_key,
            name: &spec.name,
            interval: spec.interval,
            interval_unit: spec.interval_unit,
            description: spec.description.as_deref(),
            enabled: spec.enabled,
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await?;

        check_response(response).await
    }
}

#[async_trait]
impl HeartbeatApi for OpsgenieClient {
    #[instrument(skip(self))]
    async fn exists(&self, name: &str) -> Result<bool> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&[("name", name), ("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("Heartbeat exists");
            return Ok(true);
        }

        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::BAD_REQUEST && is_missing_heartbeat(&body, name) {
            debug!("Heartbeat does not exist");
            return Ok(false);
        }

        warn!(status = %status, body = %body, "Heartbeat lookup failed");
        Err(ProvisionError::RemoteApi { status, body })
    }

    #[instrument(skip(self, spec), fields(name = %spec.name))]
    async fn create(&self, spec: &HeartbeatSpec) -> Result<()> {
        if self.exists(&spec.name).await? {
            return Err(ProvisionError::AlreadyExists {
                name: spec.name.clone(),
            });
        }

        self.submit(spec).await?;
        info!("Heartbeat created");
        Ok(())
    }

    #[instrument(skip(self, spec), fields(name = %spec.name))]
    async fn update(&self, spec: &HeartbeatSpec) -> Result<()> {
        self.submit(spec).await?;
        info!("Heartbeat updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, name: &str) -> Result<()> {
        if !self.exists(name).await? {
            return Err(ProvisionError::NotFound {
                name: name.to_string(),
            });
        }

        let response = self
            .client
            .delete(self.endpoint())
            .query(&[("apiKey", self.api_key.as_str()), ("name", name)])
            .send()
            .await?;

        check_response(response).await?;
        info!("Heartbeat deleted");
        Ok(())
    }
}

async fn check_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    warn!(status = %status, body = %body, "Heartbeat API request failed");
    Err(ProvisionError::RemoteApi { status, body })
}

/// The API answers a lookup of an unknown name with a 400 and this message.
fn is_missing_heartbeat(body: &str, name: &str) -> bool {
    let needle = format!("Heartbeat with name [{name}] does not exist");
    serde_json::from_str::<ApiError>(body).is_ok_and(|e| e.error.contains(&needle))
}

// =============================================================================
// API types (internal)
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiPayload<'a> {
    api_key: &'a str,
    name: &'a str,
    interval: Option<u32>,
    interval_unit: Option<IntervalUnit>,
    description: Option<&'a str>,
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}
