use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{NowPlayingDisplay, TransportHandler, TransportSource};
use crate::dto::bridge_error::BridgeError;
use crate::dto::display_state::DisplayState;
use crate::dto::transport_command::{CommandStatus, TransportCommand};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory display that records every state it was handed.
#[derive(Clone, Debug, Default)]
pub struct MockDisplay {
    history: Arc<Mutex<Vec<Option<DisplayState>>>>,
}

impl MockDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<Option<DisplayState>> {
        lock(&self.history).clone()
    }

    pub fn current(&self) -> Option<DisplayState> {
        lock(&self.history).last().cloned().flatten()
    }
}

impl NowPlayingDisplay for MockDisplay {
    fn publish(&mut self, state: Option<&DisplayState>) -> Result<(), BridgeError> {
        lock(&self.history).push(state.cloned());
        Ok(())
    }
}

#[derive(Clone)]
struct Registration {
    handler: TransportHandler,
    enabled: bool,
}

/// Transport source driven by hand, standing in for OS button presses.
#[derive(Clone, Default)]
pub struct MockTransport {
    registrations: Arc<Mutex<HashMap<TransportCommand, Registration>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presses `command`. Returns `None` if nothing is registered or the command is disabled.
    pub fn trigger(&self, command: TransportCommand) -> Option<CommandStatus> {
        let registration = lock(&self.registrations).get(&command).cloned()?;
        registration.enabled.then(|| (registration.handler)())
    }

    pub fn handler_count(&self) -> usize {
        lock(&self.registrations).len()
    }

    pub fn is_enabled(&self, command: TransportCommand) -> bool {
        lock(&self.registrations)
            .get(&command)
            .is_some_and(|r| r.enabled)
    }
}

impl TransportSource for MockTransport {
    fn set_handler(
        &mut self,
        command: TransportCommand,
        handler: TransportHandler,
    ) -> Result<(), BridgeError> {
        let mut registrations = lock(&self.registrations);
        let enabled = registrations.get(&command).is_some_and(|r| r.enabled);
        registrations.insert(command, Registration { handler, enabled });
        Ok(())
    }

    fn set_enabled(
        &mut self,
        command: TransportCommand,
        enabled: bool,
    ) -> Result<(), BridgeError> {
        match lock(&self.registrations).get_mut(&command) {
            Some(registration) => {
                registration.enabled = enabled;
                Ok(())
            }
            None => Err(BridgeError::Platform(format!(
                "No handler registered for {command}"
            ))),
        }
    }
}
