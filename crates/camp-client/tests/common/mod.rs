//! In-process mock of the camping backend: REST routes plus a websocket
//! endpoint speaking the Socket.IO text framing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tokio::sync::broadcast;

use camp_client::config::{ChannelConfig, ClientConfig};

pub const SECRET: &str = "mock-secret";

/// Server-side actions the test can trigger on every open socket.
#[derive(Debug, Clone)]
pub enum Control {
    /// Emit a `notification` event with this payload
    Push(Value),
    /// Drop the TCP connection without a close handshake
    Drop,
    /// Socket.IO server-side disconnect
    Kick,
}

#[derive(Default)]
pub struct Recorded {
    /// Client events as (name, first argument)
    pub events: Vec<(String, Value)>,
    pub register_bodies: Vec<Value>,
    pub verification_emails: Vec<String>,
}

/// Engine.IO behaviour of the realtime endpoint.
#[derive(Debug, Clone)]
pub struct SocketOptions {
    pub ping_interval: u64,
    pub ping_timeout: u64,
    /// Send one ping right after the connect ack, then stay silent
    pub ping_after_connect: bool,
    /// Hang up straight after the websocket upgrade, before the open packet
    pub hang_up: bool,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            ping_interval: 25_000,
            ping_timeout: 20_000,
            ping_after_connect: false,
            hang_up: false,
        }
    }
}

pub struct MockState {
    pub socket: SocketOptions,
    pub users: Mutex<HashMap<String, Value>>,
    pub recorded: Mutex<Recorded>,
    /// `{"user": ...}` body returned by the register route
    pub register_reply: Mutex<Value>,
    pub verification_token: Mutex<Option<String>>,
    /// Tokens the verify route accepts
    pub valid_tokens: Mutex<Vec<String>>,
    pub control: broadcast::Sender<Control>,
    pub connections: AtomicUsize,
    pub closed: AtomicUsize,
    pub client_disconnects: AtomicUsize,
    pub pongs: AtomicUsize,
}

pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockServer {
    pub async fn start() -> Self {
        Self::start_with(SocketOptions::default()).await
    }

    pub async fn start_with(socket: SocketOptions) -> Self {
        let (control, _) = broadcast::channel(64);
        let state = Arc::new(MockState {
            socket,
            users: Mutex::new(HashMap::new()),
            recorded: Mutex::new(Recorded::default()),
            register_reply: Mutex::new(json!({ "user": { "id": 101 } })),
            verification_token: Mutex::new(Some("vt-1".to_string())),
            valid_tokens: Mutex::new(vec!["vt-1".to_string()]),
            control,
            connections: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            client_disconnects: AtomicUsize::new(0),
            pongs: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/api/users/{id}", get(get_user))
            .route("/api/users/register", post(register))
            .route("/api/email/request-verification", post(request_verification))
            .route("/api/email/verify-email", get(verify_email))
            .route("/socket.io/", get(ws_upgrade))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            api_url: self.url(),
            channel: ChannelConfig {
                url: self.url(),
                reconnection_attempts: 3,
                connect_timeout: Duration::from_secs(2),
                reconnection_delay: Duration::from_millis(50),
            },
            jwt_secret: SECRET.to_string(),
            store_path: std::env::temp_dir().join("camp-mock-unused.json"),
        }
    }

    pub fn add_user(&self, user: Value) {
        let id = match &user["id"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.state.users.lock().unwrap().insert(id, user);
    }

    pub fn push(&self, payload: Value) {
        let _ = self.state.control.send(Control::Push(payload));
    }

    pub fn control(&self, c: Control) {
        let _ = self.state.control.send(c);
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.state.recorded.lock().unwrap().events.clone()
    }

    /// Poll until `pred` holds, failing the test after two seconds.
    pub async fn wait_until(&self, what: &str, pred: impl Fn(&MockState) -> bool) {
        for _ in 0..200 {
            if pred(&self.state) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {what}");
    }
}

pub fn token_for(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn user_json(id: &str, name: &str, notifications: &[&str]) -> Value {
    let records: Vec<Value> = notifications
        .iter()
        .enumerate()
        .map(|(i, text)| {
            json!({
                "userId": id,
                "postId": i + 1,
                "rating": null,
                "reviews": null,
                "favorite": "No",
                "notification": text,
                "status": "PENDING"
            })
        })
        .collect();
    json!({
        "id": id,
        "email": format!("{name}@camp.io").to_lowercase(),
        "name": name,
        "imagesProfile": [format!("https://img/{id}.png")],
        "joinCampingPosts": records,
        "posts": []
    })
}

// -- REST handlers --

async fn get_user(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> impl IntoResponse {
    match state.users.lock().unwrap().get(&id) {
        Some(user) => (StatusCode::OK, Json(json!({ "user": user }))),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "User not found" }))),
    }
}

async fn register(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> impl IntoResponse {
    state.recorded.lock().unwrap().register_bodies.push(body);
    let reply = state.register_reply.lock().unwrap().clone();
    (StatusCode::CREATED, Json(reply))
}

async fn request_verification(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    state.recorded.lock().unwrap().verification_emails.push(email);
    match state.verification_token.lock().unwrap().clone() {
        Some(token) => Json(json!({ "token": token })),
        None => Json(json!({ "message": "sent" })),
    }
}

async fn verify_email(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let token = params.get("token").cloned().unwrap_or_default();
    if state.valid_tokens.lock().unwrap().contains(&token) {
        (StatusCode::OK, Json(json!({ "message": "Email verified" })))
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Invalid or expired token" })),
        )
    }
}

// -- Realtime endpoint --

async fn ws_upgrade(State(state): State<Arc<MockState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<MockState>) {
    let mut control = state.control.subscribe();
    state.connections.fetch_add(1, Ordering::SeqCst);
    if state.socket.hang_up {
        state.closed.fetch_add(1, Ordering::SeqCst);
        return;
    }

    let open = format!(
        "0{}",
        json!({
            "sid": "mock",
            "upgrades": [],
            "pingInterval": state.socket.ping_interval,
            "pingTimeout": state.socket.ping_timeout,
            "maxPayload": 1_000_000
        })
    );
    if socket.send(Message::Text(open.into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let text = text.as_str();
                        if text == "40" {
                            if socket.send(Message::Text(r#"40{"sid":"mock-socket"}"#.into())).await.is_err() {
                                break;
                            }
                            if state.socket.ping_after_connect
                                && socket.send(Message::Text("2".into())).await.is_err()
                            {
                                break;
                            }
                        } else if text == "3" {
                            state.pongs.fetch_add(1, Ordering::SeqCst);
                        } else if text == "41" {
                            state.client_disconnects.fetch_add(1, Ordering::SeqCst);
                        } else if let Some(payload) = text.strip_prefix("42") {
                            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(payload) {
                                let name = items.first().and_then(Value::as_str).unwrap_or_default().to_string();
                                let arg = items.get(1).cloned().unwrap_or(Value::Null);
                                state.recorded.lock().unwrap().events.push((name, arg));
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            ctl = control.recv() => {
                match ctl {
                    Ok(Control::Push(payload)) => {
                        let frame = format!("42{}", json!(["notification", payload]));
                        if socket.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    Ok(Control::Drop) => break,
                    Ok(Control::Kick) => {
                        let _ = socket.send(Message::Text("41".into())).await;
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    state.closed.fetch_add(1, Ordering::SeqCst);
}
