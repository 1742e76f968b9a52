use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::dto::bridge_error::BridgeError;
use crate::dto::media_info::MediaUpdate;
use crate::dto::transport_command::TransportCommand;
use crate::now_playing::NowPlayingBridge;

pub const DEFAULT_CHANNEL_NAME: &str = "now_playing";

/// An inbound message from the application.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MethodCall {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyError {
    pub code: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MethodReply {
    Success { id: Option<Value>, result: Value },
    Failure { id: Option<Value>, error: ReplyError },
}

impl MethodReply {
    fn new(id: Option<Value>, result: Result<(), BridgeError>) -> Self {
        match result {
            Ok(()) => MethodReply::Success {
                id,
                result: Value::Null,
            },
            Err(e) => MethodReply::Failure {
                id,
                error: ReplyError {
                    code: e.code().to_owned(),
                    message: e.to_string(),
                },
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodReply::Success { .. })
    }
}

#[derive(Serialize)]
struct Signal {
    method: TransportCommand,
}

/// Directives the application can send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    Update(MediaUpdate),
    Clear,
}

impl Directive {
    pub fn from_call(method: &str, args: &Value) -> Result<Self, BridgeError> {
        match method {
            "update" | "updateNowPlaying" => Ok(Directive::Update(MediaUpdate::from_args(args))),
            "clear" | "clearNowPlaying" => Ok(Directive::Clear),
            other => Err(BridgeError::NotImplemented(other.to_owned())),
        }
    }
}

/// The named conduit between application playback logic and the bridge.
///
/// Inbound messages are JSON method calls (`{"id": 1, "method": "update", "args": {..}}`),
/// outbound transport signals are `{"method": "play"}` and friends.
#[derive(Clone, Debug)]
pub struct BridgeChannel {
    name: String,
    bridge: NowPlayingBridge,
}

impl BridgeChannel {
    pub fn new(name: impl Into<String>, bridge: NowPlayingBridge) -> Self {
        Self {
            name: name.into(),
            bridge,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn dispatch(&self, directive: Directive) -> Result<(), BridgeError> {
        match directive {
            Directive::Update(update) => self.bridge.publish(update).await,
            Directive::Clear => self.bridge.clear().await,
        }
    }

    pub async fn handle_call(&self, call: MethodCall) -> MethodReply {
        info!("[{}] Got method call {}", self.name, call.method);
        let result = match Directive::from_call(&call.method, &call.args) {
            Ok(directive) => self.dispatch(directive).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            warn!("[{}] {} failed: {e}", self.name, call.method);
        }
        MethodReply::new(call.id, result)
    }

    /// Handles one raw JSON message and returns the serialized reply.
    pub async fn handle_message(&self, message: &str) -> String {
        let reply = match serde_json::from_str::<MethodCall>(message) {
            Ok(call) => self.handle_call(call).await,
            Err(e) => {
                warn!("[{}] Malformed message: {e}", self.name);
                MethodReply::new(
                    None,
                    Err(BridgeError::InvalidArguments(format!("Malformed message: {e}"))),
                )
            }
        };
        encode(&reply)
    }

    pub fn encode_signal(command: TransportCommand) -> String {
        encode(&Signal { method: command })
    }
}

fn encode<T: Serialize>(message: &T) -> String {
    // Infallible for string and JSON value fields
    serde_json::to_string(message).unwrap_or_default()
}
