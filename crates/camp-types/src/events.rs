use serde_json::Value;

use crate::models::PushedMessage;

/// Commands sent FROM client TO server over the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCommand {
    /// Associate this connection with a user identity
    Register { user_id: String },

    /// Subscribe this connection to the user's broadcast room
    JoinRoom { user_id: String },
}

impl ChannelCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::JoinRoom { .. } => "joinRoom",
        }
    }

    /// Event arguments, in wire order.
    pub fn args(&self) -> Vec<Value> {
        match self {
            Self::Register { user_id } | Self::JoinRoom { user_id } => {
                vec![Value::String(user_id.clone())]
            }
        }
    }
}

/// Events sent FROM server TO client over the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A push notification for the bound user
    Notification(PushedMessage),
}

impl ChannelEvent {
    pub const NOTIFICATION: &'static str = "notification";

    /// Map a named event with its arguments to a typed event.
    ///
    /// Returns `None` for event names the client does not listen to, and
    /// `Some(Err(_))` when a known event carries a payload of the wrong shape.
    pub fn from_event(name: &str, args: &[Value]) -> Option<Result<Self, serde_json::Error>> {
        match name {
            Self::NOTIFICATION => {
                let payload = args.first().cloned().unwrap_or(Value::Null);
                Some(serde_json::from_value(payload).map(Self::Notification))
            }
            _ => None,
        }
    }
}
