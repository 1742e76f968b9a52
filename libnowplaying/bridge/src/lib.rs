mod artwork_fetcher;
mod channel;
mod dispatcher;
mod dto;
mod event_loop;
mod platform;
mod request_channel;
mod settings;
mod state_store;

pub use platform::{
    MockDisplay, MockTransport, NowPlayingDisplay, TransportHandler, TransportSource,
};
#[cfg(feature = "souvlaki")]
pub use platform::SouvlakiPlatform;

pub mod now_playing {
    use std::sync::Arc;

    use tokio::sync::broadcast;
    use tracing::info;

    pub use crate::artwork_fetcher::{ArtworkFetcher, HttpArtworkFetcher};
    pub use crate::channel::{
        BridgeChannel, DEFAULT_CHANNEL_NAME, Directive, MethodCall, MethodReply, ReplyError,
    };
    pub use crate::dispatcher::{CommandDispatcher, CommandForwarder, DispatcherState};
    pub use crate::dto::artwork::Artwork;
    pub use crate::dto::bridge_error::BridgeError;
    pub use crate::dto::bridge_event::BridgeEvent;
    use crate::dto::command::{BridgeResponse, Command};
    pub use crate::dto::display_state::DisplayState;
    pub use crate::dto::fetch_error::FetchError;
    pub use crate::dto::media_info::{MediaInfo, MediaUpdate};
    pub use crate::dto::transport_command::{CommandStatus, TransportCommand};
    use crate::artwork_fetcher::ArtworkScheduler;
    use crate::event_loop::main_loop;
    use crate::platform::NowPlayingDisplay;
    use crate::request_channel::{RequestSender, request_channel};
    pub use crate::settings::Settings;
    use crate::state_store::NowPlayingStore;

    /// Handle to the now-playing bridge. Clones talk to the same event loop.
    #[derive(Clone, Debug)]
    pub struct NowPlayingBridge {
        cmd_sender: RequestSender<Command, BridgeResponse>,
        event_tx: broadcast::Sender<BridgeEvent>,
        signal_capacity: usize,
    }

    impl NowPlayingBridge {
        /// Starts the event loop. Must be called from within a tokio runtime.
        pub fn new<D, F>(display: D, fetcher: F, settings: Settings) -> Self
        where
            D: NowPlayingDisplay,
            F: ArtworkFetcher,
        {
            let (event_tx, _) = broadcast::channel(settings.event_capacity.max(1));
            let (cmd_tx, cmd_rx) = request_channel();

            let store = NowPlayingStore::new(
                display,
                event_tx.clone(),
                settings.reuse_resolved_artwork,
            );
            let scheduler = ArtworkScheduler::new(Arc::new(fetcher), &settings);
            tokio::spawn(main_loop(cmd_rx, store, scheduler));

            Self {
                cmd_sender: cmd_tx,
                event_tx,
                signal_capacity: settings.signal_capacity.max(1),
            }
        }

        pub fn with_http_fetcher<D: NowPlayingDisplay>(
            display: D,
            settings: Settings,
        ) -> Result<Self, FetchError> {
            let fetcher = HttpArtworkFetcher::new(&settings)?;
            Ok(Self::new(display, fetcher, settings))
        }

        pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
            self.event_tx.subscribe()
        }

        /// Replaces the now-playing record. Text fields are on the display once this returns;
        /// artwork follows asynchronously.
        pub async fn publish(&self, update: MediaUpdate) -> Result<(), BridgeError> {
            let info = MediaInfo::try_from(update)?;
            self.request(Command::Publish(info)).await.map(|_| ())
        }

        pub async fn clear(&self) -> Result<(), BridgeError> {
            self.request(Command::Clear).await.map(|_| ())
        }

        pub async fn display_state(&self) -> Result<Option<DisplayState>, BridgeError> {
            match self.request(Command::GetDisplayState).await? {
                BridgeResponse::DisplayState(state) => Ok(state),
                BridgeResponse::Ack => unreachable!("Should only receive DisplayState"),
            }
        }

        /// Attaches the application side of the channel, replacing any previous one.
        pub async fn attach(&self) -> Result<flume::Receiver<TransportCommand>, BridgeError> {
            let (signal_tx, signal_rx) = flume::bounded(self.signal_capacity);
            self.request(Command::Attach(signal_tx)).await?;
            Ok(signal_rx)
        }

        pub async fn detach(&self) -> Result<(), BridgeError> {
            self.request(Command::Detach).await.map(|_| ())
        }

        pub fn forwarder(&self) -> CommandForwarder {
            CommandForwarder::new(self.cmd_sender.clone())
        }

        /// Clears the display and stops the event loop. Transport events received
        /// afterwards are reported as failed.
        pub async fn shutdown(self) -> Result<(), BridgeError> {
            info!("Shutting down now playing bridge");
            self.request(Command::Shutdown).await.map(|_| ())
        }

        async fn request(&self, command: Command) -> Result<BridgeResponse, BridgeError> {
            self.cmd_sender.get_response(command).await.map_err(|e| {
                info!("Bridge request failed: {e}");
                BridgeError::Shutdown
            })
        }
    }
}
