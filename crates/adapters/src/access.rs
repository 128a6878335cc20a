//! Owner capability adapter.

use console_relay_config::RelayConfig;
use console_relay_ports::AccessPort;

/// Fixed owner capability, usually taken from the `owner` config flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAccess {
    owner: bool,
}

impl StaticAccess {
    /// Build with an explicit capability.
    #[must_use]
    pub const fn new(owner: bool) -> Self {
        Self { owner }
    }

    /// Build from the relay config.
    #[must_use]
    pub const fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.owner)
    }
}

impl AccessPort for StaticAccess {
    fn is_owner(&self) -> bool {
        self.owner
    }
}
