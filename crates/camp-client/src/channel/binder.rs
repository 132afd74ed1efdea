use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use url::Url;

use camp_types::events::{ChannelCommand, ChannelEvent};
use camp_types::models::PushedMessage;

use crate::channel::frame::{self, DEFAULT_NAMESPACE, EnginePacket, Handshake, SocketPacket, SocketPacketKind};
use crate::config::ChannelConfig;
use crate::error::ChannelError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle of a binding, as seen by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    /// Registered and subscribed to the user's room
    Joined,
    /// Waiting before reconnection attempt `attempt` (1-based)
    Reconnecting { attempt: u32 },
    Closed,
}

/// Opens realtime channel bindings. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ChannelBinder {
    config: ChannelConfig,
}

impl ChannelBinder {
    pub fn new(config: ChannelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Open a connection bound to `user_id`.
    ///
    /// Returns immediately; connecting, registering and joining happen on a
    /// background task. Must be called from within a Tokio runtime.
    pub fn bind(&self, user_id: &str) -> ChannelBinding {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ChannelStatus::Connecting);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run_binding(
            self.config.clone(),
            user_id.to_string(),
            msg_tx,
            status_tx,
            shutdown_rx,
        ));

        ChannelBinding {
            user_id: user_id.to_string(),
            messages: msg_rx,
            status: status_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

/// A live connection bound to one user identity.
///
/// Dropping the binding detaches it: the background task sends a disconnect,
/// closes the socket and stops delivering messages. [`ChannelBinding::release`]
/// does the same and waits for the task to finish.
pub struct ChannelBinding {
    user_id: String,
    messages: mpsc::UnboundedReceiver<PushedMessage>,
    status: watch::Receiver<ChannelStatus>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ChannelBinding {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    /// Wait until the channel has joined the user's room. Returns `false` if
    /// the binding closed first.
    pub async fn joined(&mut self) -> bool {
        match self
            .status
            .wait_for(|s| matches!(s, ChannelStatus::Joined | ChannelStatus::Closed))
            .await
        {
            Ok(status) => *status == ChannelStatus::Joined,
            Err(_) => false,
        }
    }

    /// Next pushed message, in arrival order. `None` once the binding has
    /// closed and every delivered message was consumed.
    pub async fn recv(&mut self) -> Option<PushedMessage> {
        self.messages.recv().await
    }

    /// Pushed message already delivered, without waiting.
    pub fn try_recv(&mut self) -> Option<PushedMessage> {
        self.messages.try_recv().ok()
    }

    /// Detach from the channel and wait for the connection to close.
    pub async fn release(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.messages.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Channel task for user {} ended abnormally: {}", self.user_id, e);
            }
        }
        debug!("Channel binding for user {} released", self.user_id);
    }
}

impl Drop for ChannelBinding {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Build the websocket endpoint for a realtime server base URL.
pub fn endpoint(base: &str) -> Result<Url, ChannelError> {
    let mut url = Url::parse(base)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(ChannelError::Scheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|_| ChannelError::Scheme(scheme.to_string()))?;
    url.set_path("/socket.io/");
    url.set_query(Some(&format!(
        "EIO={}&transport=websocket",
        frame::ENGINE_IO_VERSION
    )));
    Ok(url)
}

/// How a single connection ended.
enum SessionEnd {
    /// The owner released the binding (or stopped listening)
    Released,
    /// The transport went away; eligible for reconnection
    Dropped,
    /// The server disconnected this socket on purpose; no reconnection
    Kicked,
}

async fn run_binding(
    config: ChannelConfig,
    user_id: String,
    messages: mpsc::UnboundedSender<PushedMessage>,
    status: watch::Sender<ChannelStatus>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let url = match endpoint(&config.url) {
        Ok(url) => url,
        Err(e) => {
            warn!("Channel for user {} not started: {}", user_id, e);
            status.send_replace(ChannelStatus::Closed);
            return;
        }
    };

    let mut attempt: u32 = 0;
    loop {
        match run_session(&config, &url, &user_id, &messages, &status, &mut shutdown).await {
            Ok(SessionEnd::Released) => break,
            Ok(SessionEnd::Kicked) => {
                info!("Server disconnected channel for user {}", user_id);
                break;
            }
            Ok(SessionEnd::Dropped) => {
                info!("Channel for user {} dropped", user_id);
                attempt = 0;
            }
            Err(e) => warn!("Channel connection error for user {}: {}", user_id, e),
        }

        if attempt >= config.reconnection_attempts {
            warn!(
                "Channel for user {} giving up after {} reconnection attempts",
                user_id, attempt
            );
            break;
        }
        attempt += 1;
        status.send_replace(ChannelStatus::Reconnecting { attempt });

        tokio::select! {
            _ = tokio::time::sleep(config.reconnection_delay) => {}
            _ = &mut shutdown => break,
        }
    }

    status.send_replace(ChannelStatus::Closed);
    debug!("Channel task for user {} finished", user_id);
}

enum Step {
    Shutdown,
    Frame(Result<Option<Result<Message, tokio_tungstenite::tungstenite::Error>>, tokio::time::error::Elapsed>),
}

async fn run_session(
    config: &ChannelConfig,
    url: &Url,
    user_id: &str,
    messages: &mpsc::UnboundedSender<PushedMessage>,
    status: &watch::Sender<ChannelStatus>,
    shutdown: &mut oneshot::Receiver<()>,
) -> Result<SessionEnd, ChannelError> {
    if !matches!(*status.borrow(), ChannelStatus::Reconnecting { .. }) {
        status.send_replace(ChannelStatus::Connecting);
    }

    let opened = tokio::select! {
        res = tokio::time::timeout(config.connect_timeout, open(url, user_id)) => res,
        _ = &mut *shutdown => return Ok(SessionEnd::Released),
    };
    let (mut ws, handshake) = opened.map_err(|_| ChannelError::Timeout(config.connect_timeout))??;

    status.send_replace(ChannelStatus::Joined);
    info!("Channel joined room for user {} (sid {})", user_id, handshake.sid);

    let window = handshake.liveness_window();
    loop {
        let step = tokio::select! {
            _ = &mut *shutdown => Step::Shutdown,
            frame = tokio::time::timeout(window, ws.next()) => Step::Frame(frame),
        };

        let msg = match step {
            Step::Shutdown => {
                close(&mut ws).await;
                return Ok(SessionEnd::Released);
            }
            Step::Frame(Err(_)) => {
                warn!("No traffic from server for {:?}, dropping connection", window);
                return Ok(SessionEnd::Dropped);
            }
            Step::Frame(Ok(None)) => return Ok(SessionEnd::Dropped),
            Step::Frame(Ok(Some(Err(e)))) => {
                warn!("Channel read error: {}", e);
                return Ok(SessionEnd::Dropped);
            }
            Step::Frame(Ok(Some(Ok(msg)))) => msg,
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => return Ok(SessionEnd::Dropped),
            _ => continue,
        };

        let packet = match frame::decode(text.as_str()) {
            Ok(packet) => packet,
            Err(e) => {
                let raw: String = text.as_str().chars().take(200).collect();
                warn!("Skipping frame: {} -- raw: {}", e, raw);
                continue;
            }
        };

        match packet {
            EnginePacket::Ping(probe) => {
                if send(&mut ws, &EnginePacket::Pong(probe)).await.is_err() {
                    return Ok(SessionEnd::Dropped);
                }
            }
            EnginePacket::Close => return Ok(SessionEnd::Dropped),
            EnginePacket::Message(p) if p.namespace != DEFAULT_NAMESPACE => {
                trace!("Ignoring packet for namespace {}", p.namespace);
            }
            EnginePacket::Message(p) if p.kind == SocketPacketKind::Disconnect => {
                return Ok(SessionEnd::Kicked);
            }
            EnginePacket::Message(p) => {
                if !deliver(&p, messages) {
                    close(&mut ws).await;
                    return Ok(SessionEnd::Released);
                }
            }
            _ => {}
        }
    }
}

/// Connect, complete the Engine.IO and Socket.IO handshakes, then bind the
/// connection to `user_id`.
async fn open(url: &Url, user_id: &str) -> Result<(WsStream, Handshake), ChannelError> {
    let (mut ws, _) = connect_async(url.as_str()).await?;

    let handshake = loop {
        match next_packet(&mut ws).await? {
            EnginePacket::Open(h) => break h,
            EnginePacket::Noop => continue,
            other => {
                return Err(ChannelError::Frame(format!(
                    "expected open packet, got {other:?}"
                )));
            }
        }
    };
    debug!("Engine session {} opened", handshake.sid);

    send(&mut ws, &EnginePacket::Message(SocketPacket::connect())).await?;
    loop {
        match next_packet(&mut ws).await? {
            EnginePacket::Message(p) if p.kind == SocketPacketKind::Connect => break,
            EnginePacket::Message(p) if p.kind == SocketPacketKind::ConnectError => {
                return Err(ChannelError::Refused(p.error_message()));
            }
            EnginePacket::Ping(probe) => send(&mut ws, &EnginePacket::Pong(probe)).await?,
            EnginePacket::Close => return Err(ChannelError::Closed),
            _ => {}
        }
    }

    // Sent on every connect, reconnects included, so the server always knows
    // which user this socket belongs to.
    let commands = [
        ChannelCommand::Register {
            user_id: user_id.to_string(),
        },
        ChannelCommand::JoinRoom {
            user_id: user_id.to_string(),
        },
    ];
    for cmd in &commands {
        let packet = SocketPacket::event(cmd.name(), cmd.args());
        send(&mut ws, &EnginePacket::Message(packet)).await?;
    }

    Ok((ws, handshake))
}

/// Hand a pushed message to the binding owner. Returns `false` once the
/// owner has stopped listening.
fn deliver(packet: &SocketPacket, messages: &mpsc::UnboundedSender<PushedMessage>) -> bool {
    let Some((name, args)) = packet.as_event() else {
        trace!("Ignoring {:?} packet", packet.kind);
        return true;
    };

    match ChannelEvent::from_event(name, args) {
        Some(Ok(ChannelEvent::Notification(msg))) => {
            debug!("Received notification for user {}", msg.user_id);
            messages.send(msg).is_ok()
        }
        Some(Err(e)) => {
            warn!("Bad {} payload: {}", name, e);
            true
        }
        None => {
            trace!("Ignoring event {}", name);
            true
        }
    }
}

async fn next_packet(ws: &mut WsStream) -> Result<EnginePacket, ChannelError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return frame::decode(text.as_str()),
            Some(Ok(Message::Close(_))) | None => return Err(ChannelError::Closed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

async fn send(ws: &mut WsStream, packet: &EnginePacket) -> Result<(), ChannelError> {
    ws.send(Message::Text(frame::encode(packet).into())).await?;
    Ok(())
}

async fn close(ws: &mut WsStream) {
    let _ = send(ws, &EnginePacket::Message(SocketPacket::disconnect())).await;
    let _ = ws.close(None).await;
}
