// ABOUTME: In-memory build-agent instance started from an image's agent home.
// ABOUTME: Restartable instances idle in Stopped; single-use ones forget themselves when stopped.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

use super::{Instance, InstanceFactory, ReusePolicy};
use crate::cloud::{ErrorInfo, ImageHandle, InstanceError, InstanceStatus, UserData};
use crate::types::InstanceId;

#[derive(Debug, Default)]
struct State {
    status: InstanceStatus,
    error: Option<ErrorInfo>,
    started_at: Option<DateTime<Utc>>,
    user_data: Option<UserData>,
}

/// A local agent instance tracked entirely in memory.
#[derive(Debug)]
pub struct LocalInstance {
    id: InstanceId,
    image: ImageHandle,
    policy: ReusePolicy,
    network_identity: String,
    state: Mutex<State>,
}

impl LocalInstance {
    pub fn new(id: InstanceId, image: ImageHandle, policy: ReusePolicy) -> Self {
        Self {
            id,
            image,
            policy,
            network_identity: gethostname::gethostname().to_string_lossy().into_owned(),
            state: Mutex::new(State {
                status: InstanceStatus::ScheduledToStart,
                ..Default::default()
            }),
        }
    }

    pub fn policy(&self) -> ReusePolicy {
        self.policy
    }

    /// Data the instance was last started with.
    pub fn user_data(&self) -> Option<UserData> {
        self.state.lock().user_data.clone()
    }

    /// Stop a running agent.
    pub fn stop(&self) -> Result<(), InstanceError> {
        if !self.state.lock().status.is_running() {
            return Err(InstanceError::NotRunning(self.id.clone()));
        }
        self.shut_down();
        Ok(())
    }

    /// Record an error reported by the agent. Errored instances are never reused.
    pub fn fail(&self, error: ErrorInfo) {
        tracing::warn!("Instance {} reported an error: {}", self.id, error);
        let mut state = self.state.lock();
        state.status = InstanceStatus::Error;
        state.error = Some(error);
    }

    fn shut_down(&self) {
        {
            let mut state = self.state.lock();
            if state.status.is_stopped() {
                return;
            }
            state.status = InstanceStatus::Stopping;
            tracing::debug!("Stopping instance {}", self.id);
            state.status = InstanceStatus::Stopped;
        }

        // The registry lock must not be taken while holding our own state lock.
        if !self.policy.is_restartable() && self.image.forget(&self.id) {
            tracing::debug!("Single-use instance {} forgotten by its image", self.id);
        }
    }
}

impl Instance for LocalInstance {
    fn id(&self) -> &InstanceId {
        &self.id
    }

    fn status(&self) -> InstanceStatus {
        self.state.lock().status
    }

    fn error_info(&self) -> Option<ErrorInfo> {
        self.state.lock().error.clone()
    }

    fn is_restartable(&self) -> bool {
        self.policy.is_restartable()
    }

    fn start(&self, data: &UserData) -> Result<(), InstanceError> {
        let image = self
            .image
            .upgrade()
            .ok_or_else(|| InstanceError::ImageGone(self.id.clone()))?;

        if let Some(error) = image.error_info() {
            {
                let mut state = self.state.lock();
                state.status = InstanceStatus::Error;
                state.error = Some(error.clone());
            }
            // A single-use instance can never run, so it does not stay registered.
            if !self.policy.is_restartable() {
                image.forget_instance(&self.id);
            }
            return Err(InstanceError::ImageDegraded {
                image: image.id().clone(),
                reason: error.clone(),
            });
        }

        let mut state = self.state.lock();

        if state.status.is_running() {
            return Err(InstanceError::AlreadyRunning(self.id.clone()));
        }

        if state.status.is_stopped() && !self.policy.is_restartable() {
            return Err(InstanceError::NotRestartable(self.id.clone()));
        }

        state.status = InstanceStatus::Starting;
        tracing::debug!(
            "Starting agent {} on instance {} from {}",
            data.agent_name,
            self.id,
            image.agent_home().display()
        );

        state.status = InstanceStatus::Running;
        state.started_at = Some(Utc::now());
        state.user_data = Some(data.clone());
        Ok(())
    }

    fn terminate(&self) -> Result<(), InstanceError> {
        self.shut_down();
        Ok(())
    }

    fn restart(&self) -> Result<(), InstanceError> {
        let mut state = self.state.lock();
        if !state.status.is_running() {
            return Err(InstanceError::NotRunning(self.id.clone()));
        }
        state.status = InstanceStatus::Restarting;
        tracing::debug!("Restarting instance {}", self.id);
        state.status = InstanceStatus::Running;
        state.started_at = Some(Utc::now());
        Ok(())
    }

    fn started_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().started_at
    }

    fn network_identity(&self) -> Option<String> {
        Some(self.network_identity.clone())
    }

    fn agent_name(&self) -> Option<String> {
        self.state
            .lock()
            .user_data
            .as_ref()
            .map(|data| data.agent_name.clone())
    }
}

/// Default factory producing [`LocalInstance`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalInstanceFactory;

impl InstanceFactory for LocalInstanceFactory {
    fn create(
        &self,
        id: InstanceId,
        image: ImageHandle,
        policy: ReusePolicy,
    ) -> Arc<dyn Instance> {
        Arc::new(LocalInstance::new(id, image, policy))
    }
}
