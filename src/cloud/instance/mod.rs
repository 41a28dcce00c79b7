// ABOUTME: Capability contract every cloud instance implements.
// ABOUTME: Defines the Instance trait, the factory seam, and a serializable snapshot.

mod local;

pub use local::{LocalInstance, LocalInstanceFactory};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::{ErrorInfo, ImageHandle, InstanceError, InstanceStatus, UserData};
use crate::types::InstanceId;

/// Which instance variant an image mints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReusePolicy {
    /// Instances return to a stopped, startable state after use.
    Restartable,
    /// Instances are forgotten by their image once stopped.
    SingleUse,
}

impl ReusePolicy {
    pub fn is_restartable(&self) -> bool {
        matches!(self, ReusePolicy::Restartable)
    }
}

/// One provisioned unit tracked by an [`Image`](super::Image).
///
/// Implementations own their provisioning mechanics. The image only relies on
/// this capability set to decide reuse and to dispose of instances.
pub trait Instance: Send + Sync + fmt::Debug {
    fn id(&self) -> &InstanceId;

    fn status(&self) -> InstanceStatus;

    fn error_info(&self) -> Option<ErrorInfo>;

    /// Fixed at construction by the variant.
    fn is_restartable(&self) -> bool;

    fn start(&self, data: &UserData) -> Result<(), InstanceError>;

    /// Best-effort shutdown. Callers disposing an image ignore failures.
    fn terminate(&self) -> Result<(), InstanceError>;

    fn restart(&self) -> Result<(), InstanceError> {
        Err(InstanceError::Unsupported("restart"))
    }

    fn started_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn network_identity(&self) -> Option<String> {
        None
    }

    /// Name of the agent this instance was last started for.
    fn agent_name(&self) -> Option<String> {
        None
    }
}

/// Constructs new instances for an image.
pub trait InstanceFactory: Send + Sync {
    fn create(
        &self,
        id: InstanceId,
        image: ImageHandle,
        policy: ReusePolicy,
    ) -> Arc<dyn Instance>;
}

impl<F> InstanceFactory for F
where
    F: Fn(InstanceId, ImageHandle, ReusePolicy) -> Arc<dyn Instance> + Send + Sync,
{
    fn create(
        &self,
        id: InstanceId,
        image: ImageHandle,
        policy: ReusePolicy,
    ) -> Arc<dyn Instance> {
        self(id, image, policy)
    }
}

/// Point-in-time view of an instance, suitable for display and JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceSnapshot {
    pub id: InstanceId,
    pub status: InstanceStatus,
    pub restartable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl InstanceSnapshot {
    pub fn of(instance: &dyn Instance) -> Self {
        Self {
            id: instance.id().clone(),
            status: instance.status(),
            restartable: instance.is_restartable(),
            agent_name: instance.agent_name(),
            started_at: instance.started_at(),
            network_identity: instance.network_identity(),
            error: instance.error_info(),
        }
    }
}
