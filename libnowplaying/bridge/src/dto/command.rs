use super::artwork::Artwork;
use super::display_state::DisplayState;
use super::media_info::MediaInfo;
use super::transport_command::TransportCommand;

#[derive(Debug)]
pub(crate) enum Command {
    Publish(MediaInfo),
    Clear,
    Transport(TransportCommand),
    Attach(flume::Sender<TransportCommand>),
    Detach,
    GetDisplayState,
    Shutdown,
}

#[derive(Debug)]
pub(crate) enum BridgeResponse {
    Ack,
    DisplayState(Option<DisplayState>),
}

/// The result of an artwork fetch, tagged with the URL it was requested for.
#[derive(Debug)]
pub(crate) struct FetchCompletion {
    pub(crate) url: String,
    pub(crate) artwork: Option<Artwork>,
}
