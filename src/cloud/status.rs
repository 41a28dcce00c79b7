// ABOUTME: Lifecycle states reported by cloud instances.
// ABOUTME: Mirrors the status set a build-agent orchestrator expects.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceStatus {
    #[default]
    Unknown,
    ScheduledToStart,
    Starting,
    Running,
    Restarting,
    ScheduledToStop,
    Stopping,
    Stopped,
    Error,
}

impl InstanceStatus {
    pub fn is_stopped(&self) -> bool {
        matches!(self, InstanceStatus::Stopped)
    }

    /// Starting, running or restarting: the instance hosts a live agent.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            InstanceStatus::Starting | InstanceStatus::Running | InstanceStatus::Restarting
        )
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstanceStatus::Unknown => "unknown",
            InstanceStatus::ScheduledToStart => "scheduled-to-start",
            InstanceStatus::Starting => "starting",
            InstanceStatus::Running => "running",
            InstanceStatus::Restarting => "restarting",
            InstanceStatus::ScheduledToStop => "scheduled-to-stop",
            InstanceStatus::Stopping => "stopping",
            InstanceStatus::Stopped => "stopped",
            InstanceStatus::Error => "error",
        };
        f.pad(s)
    }
}
