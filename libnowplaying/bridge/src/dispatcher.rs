use std::sync::Arc;

use strum::IntoEnumIterator;
use tracing::{info, warn};

use crate::dto::bridge_error::BridgeError;
use crate::dto::command::{BridgeResponse, Command};
use crate::dto::transport_command::{CommandStatus, TransportCommand};
use crate::platform::TransportSource;
use crate::request_channel::RequestSender;

/// Hands OS transport events to the event loop without waiting on the application.
#[derive(Clone, Debug)]
pub struct CommandForwarder {
    cmd_sender: RequestSender<Command, BridgeResponse>,
}

impl CommandForwarder {
    pub(crate) fn new(cmd_sender: RequestSender<Command, BridgeResponse>) -> Self {
        Self { cmd_sender }
    }

    /// Commands that can't reach an application are dropped by the event loop but still
    /// reported as successful. Only a bridge that has shut down reports failure.
    pub fn forward(&self, command: TransportCommand) -> CommandStatus {
        match self.cmd_sender.send(Command::Transport(command)) {
            Ok(()) => CommandStatus::Success,
            Err(_) => {
                warn!("Received {command} after the bridge shut down");
                CommandStatus::Failed
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatcherState {
    Unregistered,
    Registered,
}

pub struct CommandDispatcher<T: TransportSource> {
    source: T,
    forwarder: CommandForwarder,
    state: DispatcherState,
}

impl<T: TransportSource> CommandDispatcher<T> {
    pub fn new(source: T, forwarder: CommandForwarder) -> Self {
        Self {
            source,
            forwarder,
            state: DispatcherState::Unregistered,
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// Installs and enables handlers for every transport command.
    /// Calling this again replaces the existing handlers.
    pub fn register_handlers(&mut self) -> Result<(), BridgeError> {
        for command in TransportCommand::iter() {
            let forwarder = self.forwarder.clone();
            self.source
                .set_handler(command, Arc::new(move || forwarder.forward(command)))?;
            self.source.set_enabled(command, true)?;
        }

        match self.state {
            DispatcherState::Unregistered => info!("Registered transport command handlers"),
            DispatcherState::Registered => info!("Replaced transport command handlers"),
        }
        self.state = DispatcherState::Registered;
        Ok(())
    }
}
