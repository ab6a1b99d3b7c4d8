//! Lifecycle event to heartbeat action resolution.
//!
//! [`decide`] is pure: it looks only at the event. [`reconcile`] runs the
//! chosen action against a [`HeartbeatApi`] and reports the identity the
//! orchestrator should record.

use tracing::info;

use crate::error::{ProvisionError, Result};
use crate::event::{LifecycleEvent, RequestType, RESOURCE_TYPE};
use crate::heartbeat::{HeartbeatApi, HeartbeatSpec};

/// The single remote action taken for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create(HeartbeatSpec),
    Update(HeartbeatSpec),
    Delete(String),
    NoOp,
}

/// Result of a successfully reconciled event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Heartbeat name from the event's current properties.
    pub name: String,
    /// Identity reported back to the orchestrator.
    pub physical_resource_id: String,
}

/// Resolve the action for an event.
///
/// Rules, in order:
/// - Create: create from the current properties.
/// - Update with an unchanged name: update in place.
/// - Update whose new name equals the physical resource id: the orchestrator
///   is rolling back a failed replacement, so the original heartbeat still
///   exists and is updated.
/// - Any other Update: a rename, modelled as a replacement. The old heartbeat
///   is removed by a later Delete event.
/// - Delete: only when the name is bound to the physical resource id.
///   Otherwise the heartbeat was never created and nothing is removed.
///   Only the name is read, so properties that failed an earlier Create do
///   not fail the cleanup.
/// - Anything else: no-op.
pub fn decide(event: &LifecycleEvent) -> Result<Action> {
    if event.resource_type != RESOURCE_TYPE {
        return Err(ProvisionError::UnsupportedResourceType(
            event.resource_type.clone(),
        ));
    }

    let Some(request_type) = event.request_type else {
        return Err(ProvisionError::InvalidEvent(
            "RequestType missing or malformed".to_string(),
        ));
    };

    let action = match request_type {
        RequestType::Create => Action::Create(event.properties()?.to_spec()),
        RequestType::Update => {
            let properties = event.properties()?;
            let name = &properties.name;
            let old_name = event.old_resource_name()?;
            info!(name = %name, old_name = %old_name, "Resolving update");

            if *name == old_name {
                Action::Update(properties.to_spec())
            } else if event.is_physical_resource(name) {
                info!("Detected update triggered by rollback");
                Action::Update(properties.to_spec())
            } else {
                Action::Create(properties.to_spec())
            }
        }
        RequestType::Delete => {
            let name = event.resource_name()?;
            if event.is_physical_resource(&name) {
                Action::Delete(name)
            } else {
                info!(
                    name = %name,
                    physical_resource_id = ?event.physical_resource_id,
                    "Not deleting heartbeat, it was never successfully created"
                );
                Action::NoOp
            }
        }
        RequestType::Other => {
            info!("Unhandled request type, doing nothing");
            Action::NoOp
        }
    };

    Ok(action)
}

/// Run one action against the remote store.
pub async fn execute<A>(api: &A, action: &Action) -> Result<()>
where
    A: HeartbeatApi + ?Sized,
{
    match action {
        Action::Create(spec) => api.create(spec).await,
        Action::Update(spec) => api.update(spec).await,
        Action::Delete(name) => api.delete(name).await,
        Action::NoOp => Ok(()),
    }
}

/// Resolve and execute the action for an event.
///
/// The physical resource id is the heartbeat name, except for a skipped
/// delete, which echoes the incoming id unchanged.
pub async fn reconcile<A>(api: &A, event: &LifecycleEvent) -> Result<Outcome>
where
    A: HeartbeatApi + ?Sized,
{
    let action = decide(event)?;
    let name = event.resource_name()?;

    info!(action = ?action, "Executing heartbeat action");
    execute(api, &action).await?;

    let physical_resource_id = match action {
        Action::NoOp if event.request_type == Some(RequestType::Delete) => event
            .physical_resource_id
            .clone()
            .unwrap_or_else(|| name.clone()),
        _ => name.clone(),
    };

    Ok(Outcome {
        name,
        physical_resource_id,
    })
}
