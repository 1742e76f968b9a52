use flume::TrySendError;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::artwork_fetcher::ArtworkScheduler;
use crate::dto::bridge_error::BridgeError;
use crate::dto::bridge_event::BridgeEvent;
use crate::dto::command::{BridgeResponse, Command};
use crate::dto::transport_command::TransportCommand;
use crate::platform::NowPlayingDisplay;
use crate::request_channel::RequestReceiver;
use crate::state_store::NowPlayingStore;

/// The application's end of the bridge channel, if one is attached.
struct ApplicationLink {
    signal_tx: Option<flume::Sender<TransportCommand>>,
}

impl ApplicationLink {
    fn forward(&mut self, command: TransportCommand) -> Result<(), BridgeError> {
        let signal_tx = self
            .signal_tx
            .as_ref()
            .ok_or(BridgeError::ChannelUnavailable)?;
        match signal_tx.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("Application is not keeping up with transport signals");
                Err(BridgeError::ChannelUnavailable)
            }
            Err(TrySendError::Disconnected(_)) => {
                info!("Application hung up its end of the bridge channel");
                self.signal_tx = None;
                Err(BridgeError::ChannelUnavailable)
            }
        }
    }
}

pub(crate) async fn main_loop<D: NowPlayingDisplay>(
    receiver: RequestReceiver<Command, BridgeResponse>,
    mut store: NowPlayingStore<D>,
    mut scheduler: ArtworkScheduler,
) {
    let event_tx = store.event_tx().clone();
    let mut application = ApplicationLink { signal_tx: None };
    let mut shutdown_responder = None;

    loop {
        tokio::select! {
            request = receiver.recv_async() => {
                let Ok((command, responder)) = request else {
                    info!("All bridge handles dropped");
                    break;
                };
                debug!("Got command {command:?}");

                let response = match command {
                    Command::Publish(info) => {
                        let pending_url = store.publish(info);
                        scheduler.sync(store.current_artwork_key(), pending_url);
                        BridgeResponse::Ack
                    }
                    Command::Clear => {
                        store.clear();
                        scheduler.sync(None, None);
                        BridgeResponse::Ack
                    }
                    Command::Transport(command) => {
                        forward_signal(&mut application, command, &event_tx);
                        BridgeResponse::Ack
                    }
                    Command::Attach(signal_tx) => {
                        if application.signal_tx.replace(signal_tx).is_some() {
                            info!("Replacing attached application");
                        }
                        event_tx.send(BridgeEvent::ApplicationAttached).ok();
                        BridgeResponse::Ack
                    }
                    Command::Detach => {
                        if application.signal_tx.take().is_some() {
                            event_tx.send(BridgeEvent::ApplicationDetached).ok();
                        }
                        BridgeResponse::Ack
                    }
                    Command::GetDisplayState => BridgeResponse::DisplayState(store.display_state()),
                    Command::Shutdown => {
                        store.clear();
                        scheduler.cancel_in_flight();
                        shutdown_responder = Some(responder);
                        break;
                    }
                };
                if let Err(response) = responder.respond(response) {
                    error!("Error sending bridge response {response:?}");
                }
            }
            Some(completion) = scheduler.next_completion() => {
                store.complete_fetch(completion);
            }
        }
    }
    // Transport events must start failing before shutdown is acknowledged
    drop(receiver);
    if let Some(responder) = shutdown_responder {
        responder.respond(BridgeResponse::Ack).ok();
    }
    info!("Bridge event loop completed");
}

fn forward_signal(
    application: &mut ApplicationLink,
    command: TransportCommand,
    event_tx: &broadcast::Sender<BridgeEvent>,
) {
    match application.forward(command) {
        Ok(()) => {
            info!("Forwarded {command} to application");
            event_tx.send(BridgeEvent::CommandForwarded(command)).ok();
        }
        Err(e) => {
            // The forwarder has already reported success to the OS
            info!("Dropping {command}: {e}");
            event_tx.send(BridgeEvent::CommandDropped(command)).ok();
        }
    }
}
