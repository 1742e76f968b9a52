use strum::Display;

use super::display_state::DisplayState;
use super::transport_command::TransportCommand;

#[derive(Clone, Debug, Display)]
pub enum BridgeEvent {
    Published(DisplayState),
    Cleared,
    ArtworkApplied(DisplayState),
    ArtworkDiscarded { url: String },
    ArtworkUnavailable { url: String },
    CommandForwarded(TransportCommand),
    CommandDropped(TransportCommand),
    ApplicationAttached,
    ApplicationDetached,
}
