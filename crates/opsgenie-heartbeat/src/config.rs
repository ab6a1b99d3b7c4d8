//! Configuration for the heartbeat handler.

use std::env;

/// Environment variable holding the Opsgenie heartbeat API key.
pub const ENV_API_KEY: &str = "OPSGENIE_HEARTBEAT_API_KEY";

/// Environment variable overriding the heartbeat API base URL.
pub const ENV_API_URL: &str = "OPSGENIE_API_URL";

/// Environment variable set by the hosting runtime to the invocation's log stream.
pub const ENV_LOG_STREAM_NAME: &str = "AWS_LAMBDA_LOG_STREAM_NAME";

/// Default Opsgenie heartbeat API base URL.
pub const DEFAULT_API_URL: &str = "https://api.opsgenie.com/v1/json";

/// Handler configuration, read once at process start.
#[derive(Clone)]
pub struct Config {
    /// Opsgenie API key. Checked when the client is built, inside the
    /// failure boundary, so a missing key still produces a FAILED callback.
    pub api_key: Option<String>,
    /// Base URL of the heartbeat API (without the `/heartbeat` suffix).
    pub api_url: String,
    /// Log stream referenced by the default callback reason.
    pub log_stream_name: String,
}

impl Config {
    /// Build the configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_key: env::var(ENV_API_KEY).ok().filter(|s| !s.is_empty()),
            api_url: env::var(ENV_API_URL)
                .ok()
                .filter(|s| !s.is_empty())
                .map_or_else(
                    || DEFAULT_API_URL.to_string(),
                    |s| s.trim_end_matches('/').to_string(),
                ),
            log_stream_name: env::var(ENV_LOG_STREAM_NAME)
                .unwrap_or_else(|_| "unknown".to_string()),
        }
    }

    /// Override the log stream name (e.g. from the command line).
    #[must_use]
    pub fn with_log_stream_name(mut self, name: impl Into<String>) -> Self {
        self.log_stream_name = name.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

// Keep the key out of debug output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("log_stream_name", &self.log_stream_name)
            .finish()
    }
}
