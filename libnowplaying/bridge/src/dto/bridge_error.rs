use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Method {0} is not implemented")]
    NotImplemented(String),
    #[error("No application is attached to the bridge channel")]
    ChannelUnavailable,
    #[error("Media platform error: {0}")]
    Platform(String),
    #[error("The bridge has been shut down")]
    Shutdown,
}

impl BridgeError {
    /// Stable code sent back over the bridge channel.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::InvalidArguments(_) => "INVALID_ARGS",
            BridgeError::NotImplemented(_) => "NOT_IMPLEMENTED",
            BridgeError::ChannelUnavailable => "CHANNEL_UNAVAILABLE",
            BridgeError::Platform(_) => "PLATFORM_ERROR",
            BridgeError::Shutdown => "SHUTDOWN",
        }
    }
}
