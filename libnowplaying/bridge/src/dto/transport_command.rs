use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A transport button press originating from the OS media surface.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransportCommand {
    Play,
    Pause,
    Next,
    Previous,
}

/// What a transport handler reports back to the OS.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum CommandStatus {
    Success,
    Failed,
}
