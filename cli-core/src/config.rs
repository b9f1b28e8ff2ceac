//! Construction-time configuration of a bridge.

use crate::notify::ServiceId;
use cli_engine::{CliUint, EngineConfig};

/// How a bridge is set up.
#[derive(Debug, Default)]
pub struct ServiceConfig {
    /// Identity carried in notifications.
    pub id: ServiceId,
    /// Statically provisioned engine storage. `None` lets the engine allocate.
    pub buffer: Option<&'static mut [CliUint]>,
    /// Maximum user bindings; `0` keeps the engine default.
    pub max_binding_count: u16,
    /// Prompt; `None` keeps the engine default (`"> "`).
    pub invitation: Option<&'static str>,
}

impl ServiceConfig {
    /// Configuration with engine defaults and no static buffer.
    #[must_use]
    pub const fn new(id: ServiceId) -> Self {
        Self {
            id,
            buffer: None,
            max_binding_count: 0,
            invitation: None,
        }
    }

    /// Supply a static buffer.
    #[must_use]
    pub fn with_buffer(mut self, buffer: &'static mut [CliUint]) -> Self {
        self.buffer = Some(buffer);
        self
    }

    /// Override the maximum number of user bindings.
    #[must_use]
    pub const fn with_max_binding_count(mut self, count: u16) -> Self {
        self.max_binding_count = count;
        self
    }

    /// Override the prompt.
    #[must_use]
    pub const fn with_invitation(mut self, invitation: &'static str) -> Self {
        self.invitation = Some(invitation);
        self
    }

    /// The engine configuration with every override applied.
    ///
    /// Size static buffers from this, never from a partially applied config:
    /// both the prompt and the binding count change the requirement.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig<'static> {
        let mut config = EngineConfig::new();
        if let Some(invitation) = self.invitation {
            config.invitation = invitation;
        }
        if self.max_binding_count != 0 {
            config.max_binding_count = self.max_binding_count;
        }
        config
    }
}
