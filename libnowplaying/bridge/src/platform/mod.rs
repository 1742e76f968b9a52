mod mock_platform;
#[cfg(feature = "souvlaki")]
mod souvlaki_platform;

use std::sync::Arc;

pub use mock_platform::*;
#[cfg(feature = "souvlaki")]
pub use souvlaki_platform::*;

use crate::dto::bridge_error::BridgeError;
use crate::dto::display_state::DisplayState;
use crate::dto::transport_command::{CommandStatus, TransportCommand};

pub type TransportHandler = Arc<dyn Fn() -> CommandStatus + Send + Sync>;

/// The OS-visible now-playing surface.
pub trait NowPlayingDisplay: Send + 'static {
    /// `None` removes the now-playing entry entirely.
    fn publish(&mut self, state: Option<&DisplayState>) -> Result<(), BridgeError>;
}

/// Subscription points for OS transport buttons.
pub trait TransportSource {
    /// Replaces any handler previously set for `command`.
    fn set_handler(
        &mut self,
        command: TransportCommand,
        handler: TransportHandler,
    ) -> Result<(), BridgeError>;

    fn set_enabled(&mut self, command: TransportCommand, enabled: bool)
    -> Result<(), BridgeError>;
}
