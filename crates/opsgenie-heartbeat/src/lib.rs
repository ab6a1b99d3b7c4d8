//! Opsgenie heartbeat provisioning for stack custom resources.
//!
//! The stack orchestrator sends one lifecycle event per invocation (Create,
//! Update or Delete of a `Custom::OpsGenieHeartbeat` resource). This crate
//! decides which heartbeat operation the event calls for, runs it against the
//! Opsgenie heartbeat API, and always answers the orchestrator's callback URL
//! exactly once.
//!
//! # Usage
//!
//! ```no_run
//! use opsgenie_heartbeat::{handler, Config, LifecycleEvent};
//!
//! # async fn example(raw: &str) -> anyhow::Result<()> {
//! let config = Config::from_env();
//! let event = LifecycleEvent::from_json(raw)?;
//!
//! handler::run(&config, &event).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! - `OPSGENIE_HEARTBEAT_API_KEY`: Opsgenie API key (required)
//! - `OPSGENIE_API_URL`: heartbeat API base URL (default: `https://api.opsgenie.com/v1/json`)
//! - `AWS_LAMBDA_LOG_STREAM_NAME`: log stream named in callback reasons
//!
//! # Architecture
//!
//! - [`reconciler`] maps an event to a single [`Action`]
//! - [`HeartbeatApi`] abstracts the remote store; [`OpsgenieClient`] implements it
//! - [`CompletionNotifier`] delivers the callback
//! - [`handler`] ties them together behind one failure boundary

pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod heartbeat;
pub mod reconciler;
pub mod response;

pub use config::Config;
pub use error::{ProvisionError, Result};
pub use event::{HeartbeatProperties, LifecycleEvent, RequestType, RESOURCE_TYPE};
pub use handler::Provisioner;
pub use heartbeat::{HeartbeatApi, HeartbeatSpec, IntervalUnit, OpsgenieClient};
pub use reconciler::{Action, Outcome};
pub use response::{CompletionNotifier, CompletionResponse, ResponseData, ResponseStatus};
