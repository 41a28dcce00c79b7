// ABOUTME: Provisioning data handed to an instance when it starts.
// ABOUTME: Carries the agent name, server address, and custom agent parameters.

use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Caller-supplied data for starting an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserData {
    pub agent_name: String,
    pub server_address: String,
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    pub profile_id: Option<String>,
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,
    pub custom_parameters: HashMap<String, String>,
}

impl UserData {
    pub fn new(agent_name: impl Into<String>, server_address: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            server_address: server_address.into(),
            ..Default::default()
        }
    }

    pub fn profile(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_parameters.insert(key.into(), value.into());
        self
    }
}
