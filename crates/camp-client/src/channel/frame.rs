//! Text framing for the realtime channel (Engine.IO v4 carrying Socket.IO v5).
//!
//! ```text
//! <engine type>[<socket type>[<attachments>-][/<namespace>,][<ack id>][<json>]]
//!
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   open
//! 2 / 3                                                      ping / pong
//! 40                                                         connect to "/"
//! 40{"sid":".."}                                             connect ack
//! 42["notification",{"userId":"42","message":"hi"}]          event
//! 42/admin,7["register","42"]                                event with namespace and ack id
//! 41                                                         disconnect
//! ```
//!
//! Only text frames are handled; binary attachments are counted and skipped.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ChannelError;

pub const DEFAULT_NAMESPACE: &str = "/";

/// Engine.IO protocol revision sent in the connect URL.
pub const ENGINE_IO_VERSION: u8 = 4;

/// Engine.IO session parameters from the open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default = "Handshake::default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "Handshake::default_ping_timeout")]
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl Handshake {
    const fn default_ping_interval() -> u64 {
        25_000
    }

    const fn default_ping_timeout() -> u64 {
        20_000
    }

    /// Longest the server may stay silent before the connection counts as dead.
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

/// Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Socket.IO packet kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPacketKind {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
    BinaryEvent,
    BinaryAck,
}

impl SocketPacketKind {
    fn from_digit(d: u8) -> Option<Self> {
        Some(match d {
            b'0' => Self::Connect,
            b'1' => Self::Disconnect,
            b'2' => Self::Event,
            b'3' => Self::Ack,
            b'4' => Self::ConnectError,
            b'5' => Self::BinaryEvent,
            b'6' => Self::BinaryAck,
            _ => return None,
        })
    }

    fn digit(self) -> char {
        match self {
            Self::Connect => '0',
            Self::Disconnect => '1',
            Self::Event => '2',
            Self::Ack => '3',
            Self::ConnectError => '4',
            Self::BinaryEvent => '5',
            Self::BinaryAck => '6',
        }
    }

    fn is_binary(self) -> bool {
        matches!(self, Self::BinaryEvent | Self::BinaryAck)
    }
}

/// Socket.IO packet, carried inside an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    pub kind: SocketPacketKind,
    pub namespace: String,
    pub attachments: u32,
    pub ack_id: Option<u64>,
    pub data: Option<Value>,
}

impl SocketPacket {
    pub fn connect() -> Self {
        Self::bare(SocketPacketKind::Connect)
    }

    pub fn disconnect() -> Self {
        Self::bare(SocketPacketKind::Disconnect)
    }

    /// `[name, ...args]` event on the default namespace.
    pub fn event(name: &str, args: Vec<Value>) -> Self {
        let mut items = Vec::with_capacity(args.len() + 1);
        items.push(Value::String(name.to_string()));
        items.extend(args);
        Self {
            data: Some(Value::Array(items)),
            ..Self::bare(SocketPacketKind::Event)
        }
    }

    fn bare(kind: SocketPacketKind) -> Self {
        Self {
            kind,
            namespace: DEFAULT_NAMESPACE.to_string(),
            attachments: 0,
            ack_id: None,
            data: None,
        }
    }

    /// Event name and arguments, for event packets with a well-formed payload.
    pub fn as_event(&self) -> Option<(&str, &[Value])> {
        if !matches!(self.kind, SocketPacketKind::Event | SocketPacketKind::BinaryEvent) {
            return None;
        }
        let items = self.data.as_ref()?.as_array()?;
        let (name, args) = items.split_first()?;
        Some((name.as_str()?, args))
    }

    /// Error message of a connect-error packet.
    pub fn error_message(&self) -> String {
        match &self.data {
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("connection refused")
                .to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => "connection refused".to_string(),
        }
    }
}

pub fn encode(packet: &EnginePacket) -> String {
    match packet {
        // not sent by clients
        EnginePacket::Open(h) => format!(
            "0{{\"sid\":{},\"pingInterval\":{},\"pingTimeout\":{}}}",
            Value::String(h.sid.clone()),
            h.ping_interval,
            h.ping_timeout
        ),
        EnginePacket::Close => "1".to_string(),
        EnginePacket::Ping(probe) => format!("2{probe}"),
        EnginePacket::Pong(probe) => format!("3{probe}"),
        EnginePacket::Message(p) => format!("4{}", encode_socket(p)),
        EnginePacket::Upgrade => "5".to_string(),
        EnginePacket::Noop => "6".to_string(),
    }
}

fn encode_socket(p: &SocketPacket) -> String {
    let mut out = String::new();
    out.push(p.kind.digit());
    if p.kind.is_binary() {
        out.push_str(&p.attachments.to_string());
        out.push('-');
    }
    if p.namespace != DEFAULT_NAMESPACE {
        out.push_str(&p.namespace);
        out.push(',');
    }
    if let Some(id) = p.ack_id {
        out.push_str(&id.to_string());
    }
    if let Some(data) = &p.data {
        out.push_str(&data.to_string());
    }
    out
}

pub fn decode(text: &str) -> Result<EnginePacket, ChannelError> {
    let bytes = text.as_bytes();
    let (&kind, rest) = bytes
        .split_first()
        .ok_or_else(|| frame_err("empty frame"))?;
    if !kind.is_ascii_digit() {
        return Err(frame_err("packet type is not a digit"));
    }
    let rest_str = &text[1..];

    match kind {
        b'0' => {
            let handshake: Handshake = serde_json::from_str(rest_str)
                .map_err(|e| frame_err(&format!("bad open packet: {e}")))?;
            Ok(EnginePacket::Open(handshake))
        }
        b'1' => Ok(EnginePacket::Close),
        b'2' => Ok(EnginePacket::Ping(rest_str.to_string())),
        b'3' => Ok(EnginePacket::Pong(rest_str.to_string())),
        b'4' if !rest.is_empty() => Ok(EnginePacket::Message(decode_socket(rest_str)?)),
        b'4' => Err(frame_err("empty message packet")),
        b'5' => Ok(EnginePacket::Upgrade),
        b'6' => Ok(EnginePacket::Noop),
        other => Err(frame_err(&format!("unknown packet type {:?}", other as char))),
    }
}

fn decode_socket(text: &str) -> Result<SocketPacket, ChannelError> {
    let bytes = text.as_bytes();
    let kind = SocketPacketKind::from_digit(bytes[0])
        .ok_or_else(|| frame_err(&format!("unknown socket packet type {:?}", bytes[0] as char)))?;
    let mut pos = 1;

    let mut attachments = 0;
    if kind.is_binary() {
        let dash = text[pos..]
            .find('-')
            .ok_or_else(|| frame_err("binary packet without attachment count"))?;
        attachments = text[pos..pos + dash]
            .parse()
            .map_err(|_| frame_err("bad attachment count"))?;
        pos += dash + 1;
    }

    let mut namespace = DEFAULT_NAMESPACE.to_string();
    if bytes.get(pos) == Some(&b'/') {
        let end = text[pos..].find(',').map(|i| pos + i).unwrap_or(text.len());
        namespace = text[pos..end].to_string();
        pos = (end + 1).min(text.len());
    }

    let digits = bytes[pos..].iter().take_while(|b| b.is_ascii_digit()).count();
    let ack_id = if digits > 0 {
        let id = text[pos..pos + digits]
            .parse()
            .map_err(|_| frame_err("bad ack id"))?;
        pos += digits;
        Some(id)
    } else {
        None
    };

    let data = if pos < text.len() {
        Some(
            serde_json::from_str(&text[pos..])
                .map_err(|e| frame_err(&format!("bad payload: {e}")))?,
        )
    } else {
        None
    };

    Ok(SocketPacket {
        kind,
        namespace,
        attachments,
        ack_id,
        data,
    })
}

fn frame_err(msg: &str) -> ChannelError {
    ChannelError::Frame(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_open_packet() {
        let p = decode(r#"0{"sid":"abc","upgrades":[],"pingInterval":300,"pingTimeout":200}"#)
            .unwrap();
        let EnginePacket::Open(h) = p else {
            panic!("expected open packet");
        };
        assert_eq!(h.sid, "abc");
        assert_eq!(h.liveness_window(), Duration::from_millis(500));
    }

    #[test]
    fn decode_notification_event() {
        let p = decode(r#"42["notification",{"userId":"42","message":"New match!"}]"#).unwrap();
        let EnginePacket::Message(sp) = p else {
            panic!("expected message");
        };
        let (name, args) = sp.as_event().unwrap();
        assert_eq!(name, "notification");
        assert_eq!(args, &[json!({ "userId": "42", "message": "New match!" })]);
        assert_eq!(sp.namespace, "/");
        assert_eq!(sp.ack_id, None);
    }

    #[test]
    fn decode_namespace_and_ack_id() {
        let EnginePacket::Message(sp) = decode(r#"42/admin,17["x"]"#).unwrap() else {
            panic!("expected message");
        };
        assert_eq!(sp.namespace, "/admin");
        assert_eq!(sp.ack_id, Some(17));
        assert_eq!(sp.as_event().unwrap().0, "x");
    }

    #[test]
    fn decode_binary_event_counts_attachments() {
        let EnginePacket::Message(sp) =
            decode(r#"451-["upload",{"_placeholder":true,"num":0}]"#).unwrap()
        else {
            panic!("expected message");
        };
        assert_eq!(sp.kind, SocketPacketKind::BinaryEvent);
        assert_eq!(sp.attachments, 1);
        assert_eq!(sp.as_event().unwrap().0, "upload");
    }

    #[test]
    fn decode_connect_ack_and_error() {
        let EnginePacket::Message(ack) = decode(r#"40{"sid":"s1"}"#).unwrap() else {
            panic!("expected message");
        };
        assert_eq!(ack.kind, SocketPacketKind::Connect);

        let EnginePacket::Message(err) = decode(r#"44{"message":"Not authorized"}"#).unwrap()
        else {
            panic!("expected message");
        };
        assert_eq!(err.kind, SocketPacketKind::ConnectError);
        assert_eq!(err.error_message(), "Not authorized");
    }

    #[test]
    fn control_packets() {
        assert_eq!(decode("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(decode("3probe").unwrap(), EnginePacket::Pong("probe".into()));
        assert_eq!(decode("1").unwrap(), EnginePacket::Close);
        assert_eq!(decode("6").unwrap(), EnginePacket::Noop);
        assert_eq!(encode(&EnginePacket::Pong(String::new())), "3");
    }

    #[test]
    fn malformed_frames_are_errors() {
        for bad in ["", "4", "9", "47", r#"42["unterminated"#, "0not-json", "45x-[]"] {
            assert!(decode(bad).is_err(), "{bad:?} should not decode");
        }
    }

    #[test]
    fn encode_client_packets() {
        assert_eq!(encode(&EnginePacket::Message(SocketPacket::connect())), "40");
        assert_eq!(encode(&EnginePacket::Message(SocketPacket::disconnect())), "41");
        assert_eq!(
            encode(&EnginePacket::Message(SocketPacket::event("register", vec![json!("42")]))),
            r#"42["register","42"]"#
        );

        let mut with_ns = SocketPacket::event("joinRoom", vec![json!("42")]);
        with_ns.namespace = "/camp".into();
        with_ns.ack_id = Some(3);
        assert_eq!(
            encode(&EnginePacket::Message(with_ns)),
            r#"42/camp,3["joinRoom","42"]"#
        );
    }
}
