//! Error types for heartbeat provisioning.

use thiserror::Error;

/// Errors that can occur while handling a lifecycle event.
///
/// The `Display` text of every variant doubles as the `Reason` of a FAILED
/// completion callback, so messages are written for the stack operator.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Create attempted on a name the remote service already holds
    #[error("Heartbeat already exists: {name}")]
    AlreadyExists { name: String },

    /// Delete attempted on a name the remote service does not hold
    #[error("Heartbeat does not exist: {name}")]
    NotFound { name: String },

    /// Unexpected non-2xx response from a remote endpoint
    #[error("Remote API returned {status}: {body}")]
    RemoteApi {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The event declares a resource type this handler does not manage
    #[error("Unexpected resource type: {0}")]
    UnsupportedResourceType(String),

    /// Network-level failure reaching a remote endpoint
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The event is missing a field or carries a malformed value
    #[error("Invalid lifecycle event: {0}")]
    InvalidEvent(String),

    /// The remote API key was not supplied
    #[error("{0} not set")]
    MissingApiKey(&'static str),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = ProvisionError> = std::result::Result<T, E>;
