//! Realtime channel client.
//!
//! One live WebSocket per authenticated session, owned by a connection
//! actor task. Callers interact through a command channel: correlated
//! request/response operations with a hard deadline, and fire-and-forget
//! emits that silently no-op while disconnected.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::tungstenite::http::Request;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use tracing::{debug, error, info, warn};

use crate::wire::{
    EV_ACTIVITY_UPDATE, EV_AUTHENTICATE, EV_COURSE_COMPLETE, EV_COURSE_ENROLL, EV_TOKEN_UPDATE,
    Frame, ServerEvent,
};
use crate::{ChannelError, Result};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);

/// How often the actor sweeps the pending map for expired requests.
const PENDING_SWEEP_INTERVAL: Duration = Duration::from_millis(100);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// WebSocket URL of the marketplace server.
    pub url: String,
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    pub request_timeout: Duration,
}

impl ChannelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_reconnect(mut self, attempts: u32, delay: Duration) -> Self {
        self.reconnect_attempts = attempts;
        self.reconnect_delay = delay;
        self
    }
}

/// Lifecycle of the one channel a session owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

enum Command {
    Request {
        event: &'static str,
        data: Value,
        reply: oneshot::Sender<Result<Value>>,
    },
    Emit {
        event: &'static str,
        data: Value,
    },
    Shutdown,
}

struct PendingRequest {
    reply: oneshot::Sender<Result<Value>>,
    deadline: Instant,
}

/// Handle to the connection actor. Cloning shares the same channel.
#[derive(Clone)]
pub struct ChannelClient {
    commands: mpsc::Sender<Command>,
    state_rx: watch::Receiver<ChannelState>,
    events_tx: broadcast::Sender<ServerEvent>,
}

impl ChannelClient {
    /// Spawn the connection actor for `(url, token)` and return immediately;
    /// the channel moves through `Connecting` in the background.
    pub fn open(config: ChannelConfig, token: impl Into<String>) -> Self {
        let (commands, command_rx) = mpsc::channel(64);
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let (events_tx, _) = broadcast::channel(64);

        let actor_events = events_tx.clone();
        let token = token.into();
        tokio::spawn(async move {
            connection_loop(config, token, command_rx, state_tx, actor_events).await;
        });

        Self {
            commands,
            state_rx,
            events_tx,
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.state_rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    /// Server pushes (balance updates, refresh nudges). Responses to
    /// in-flight requests are never published here.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ServerEvent> {
        self.events_tx.subscribe()
    }

    /// Wait until the channel reaches `Connected`, bounded by `timeout`.
    pub async fn wait_connected(&self, timeout: Duration) -> bool {
        let mut rx = self.state_rx.clone();
        tokio::time::timeout(timeout, async {
            loop {
                if *rx.borrow_and_update() == ChannelState::Connected {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        })
        .await
        .is_ok()
            && self.is_connected()
    }

    /// Request enrollment in a course. Resolves with the server payload,
    /// rejects with the server message, or times out after the configured
    /// request deadline. Fails fast without emitting when not connected.
    pub async fn enroll_in_course(&self, course_id: i64, tokens_required: i64) -> Result<Value> {
        self.request(
            EV_COURSE_ENROLL,
            json!({ "course_id": course_id, "tokens_required": tokens_required }),
        )
        .await
    }

    /// Report a course completion. Same settlement semantics as enroll.
    pub async fn complete_course(
        &self,
        course_id: i64,
        time_spent_hours: f64,
        tokens_earned: i64,
    ) -> Result<Value> {
        self.request(
            EV_COURSE_COMPLETE,
            json!({
                "course_id": course_id,
                "time_spent": time_spent_hours,
                "tokens_earned": tokens_earned,
            }),
        )
        .await
    }

    /// Fire-and-forget balance hint to the server; silent no-op offline.
    pub async fn emit_token_update(&self, data: Value) {
        self.emit(EV_TOKEN_UPDATE, data).await;
    }

    /// Fire-and-forget activity hint to the server; silent no-op offline.
    pub async fn emit_activity_update(&self, data: Value) {
        self.emit(EV_ACTIVITY_UPDATE, data).await;
    }

    /// Tear the channel down. In-flight requests settle with `Closed`.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }

    async fn request(&self, event: &'static str, data: Value) -> Result<Value> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Request { event, data, reply })
            .await
            .map_err(|_| ChannelError::NotConnected)?;
        // The actor settles every pending request: response, deadline
        // eviction, or teardown. A dropped sender means the loop is gone.
        rx.await.map_err(|_| ChannelError::Closed)?
    }

    async fn emit(&self, event: &'static str, data: Value) {
        if !self.is_connected() {
            return;
        }
        let _ = self.commands.send(Command::Emit { event, data }).await;
    }
}

enum SessionEnd {
    /// Command channel closed or explicit shutdown; the actor exits.
    Shutdown,
    /// Transport dropped; the loop decides whether to retry.
    TransportLost,
}

async fn connection_loop(
    config: ChannelConfig,
    token: String,
    mut commands: mpsc::Receiver<Command>,
    state_tx: watch::Sender<ChannelState>,
    events_tx: broadcast::Sender<ServerEvent>,
) {
    let mut pending: HashMap<u64, PendingRequest> = HashMap::new();
    let mut next_request_id: u64 = 1;
    let mut attempts: u32 = 0;
    let mut ever_connected = false;

    loop {
        let _ = state_tx.send(if ever_connected {
            ChannelState::Reconnecting
        } else {
            ChannelState::Connecting
        });

        match connect_ws(&config.url).await {
            Ok((mut sink, stream)) => {
                if let Err(err) = authenticate(&mut sink, &token).await {
                    error!("channel authentication failed: {err}");
                } else {
                    info!("realtime channel connected to {}", config.url);
                    ever_connected = true;
                    attempts = 0;
                    let _ = state_tx.send(ChannelState::Connected);

                    let end = run_session(
                        sink,
                        stream,
                        &config,
                        &mut commands,
                        &mut pending,
                        &mut next_request_id,
                        &events_tx,
                    )
                    .await;

                    match end {
                        SessionEnd::Shutdown => {
                            fail_pending(&mut pending, || ChannelError::Closed);
                            let _ = state_tx.send(ChannelState::Disconnected);
                            return;
                        }
                        SessionEnd::TransportLost => {
                            fail_pending(&mut pending, || {
                                ChannelError::Transport("connection lost".to_string())
                            });
                        }
                    }
                }
            }
            Err(err) => {
                error!("failed to connect realtime channel: {err}");
            }
        }

        attempts += 1;
        if attempts >= config.reconnect_attempts {
            warn!(
                "giving up after {} failed connection attempts; channel is down",
                attempts
            );
            let _ = state_tx.send(ChannelState::Disconnected);
            return;
        }
        warn!("retrying realtime channel in {:?}", config.reconnect_delay);
        tokio::time::sleep(config.reconnect_delay).await;
    }
}

async fn run_session(
    mut sink: WsSink,
    mut stream: WsStream,
    config: &ChannelConfig,
    commands: &mut mpsc::Receiver<Command>,
    pending: &mut HashMap<u64, PendingRequest>,
    next_request_id: &mut u64,
    events_tx: &broadcast::Sender<ServerEvent>,
) -> SessionEnd {
    let mut sweep = tokio::time::interval(PENDING_SWEEP_INTERVAL);

    loop {
        tokio::select! {
            cmd = commands.recv() => match cmd {
                None | Some(Command::Shutdown) => return SessionEnd::Shutdown,
                Some(Command::Request { event, data, reply }) => {
                    let id = *next_request_id;
                    *next_request_id += 1;
                    let frame = Frame::request(event, id, data);
                    match send_frame(&mut sink, &frame).await {
                        Ok(()) => {
                            pending.insert(id, PendingRequest {
                                reply,
                                deadline: Instant::now() + config.request_timeout,
                            });
                        }
                        Err(err) => {
                            let _ = reply.send(Err(ChannelError::Transport(err)));
                            return SessionEnd::TransportLost;
                        }
                    }
                }
                Some(Command::Emit { event, data }) => {
                    let frame = Frame::push(event, data);
                    if send_frame(&mut sink, &frame).await.is_err() {
                        return SessionEnd::TransportLost;
                    }
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    handle_frame(&text, pending, events_tx);
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = sink.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    info!("server closed realtime channel: {frame:?}");
                    return SessionEnd::TransportLost;
                }
                Some(Err(err)) => {
                    error!("realtime channel transport error: {err}");
                    return SessionEnd::TransportLost;
                }
                None => return SessionEnd::TransportLost,
                _ => {}
            },
            _ = sweep.tick() => {
                evict_expired(pending);
            }
        }
    }
}

fn handle_frame(
    text: &str,
    pending: &mut HashMap<u64, PendingRequest>,
    events_tx: &broadcast::Sender<ServerEvent>,
) {
    let frame: Frame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!("unreadable frame from server: {err}");
            return;
        }
    };

    if frame.is_response() {
        let id = frame.request_id.unwrap_or_default();
        match pending.remove(&id) {
            Some(request) => {
                let outcome = if frame.is_error_response() {
                    Err(ChannelError::Rejected {
                        message: frame.error_message(),
                    })
                } else {
                    Ok(frame.data)
                };
                let _ = request.reply.send(outcome);
            }
            None => {
                // Already settled (timed out) or never ours.
                debug!("late response for request {id}: {}", frame.event);
            }
        }
        return;
    }

    match ServerEvent::from_frame(&frame) {
        Some(event) => {
            let _ = events_tx.send(event);
        }
        None => debug!("ignoring frame: {}", frame.event),
    }
}

fn evict_expired(pending: &mut HashMap<u64, PendingRequest>) {
    let now = Instant::now();
    let expired: Vec<u64> = pending
        .iter()
        .filter(|(_, request)| request.deadline <= now)
        .map(|(id, _)| *id)
        .collect();
    for id in expired {
        if let Some(request) = pending.remove(&id) {
            debug!("request {id} expired without a response");
            let _ = request.reply.send(Err(ChannelError::Timeout));
        }
    }
}

fn fail_pending(pending: &mut HashMap<u64, PendingRequest>, err: impl Fn() -> ChannelError) {
    for (_, request) in pending.drain() {
        let _ = request.reply.send(Err(err()));
    }
}

async fn send_frame(sink: &mut WsSink, frame: &Frame) -> std::result::Result<(), String> {
    let raw = serde_json::to_string(frame).map_err(|err| err.to_string())?;
    sink.send(Message::Text(raw.into()))
        .await
        .map_err(|err| err.to_string())
}

/// First frame after the handshake carries the session token as the
/// connection credential.
async fn authenticate(sink: &mut WsSink, token: &str) -> std::result::Result<(), String> {
    let frame = Frame::push(EV_AUTHENTICATE, json!({ "token": token }));
    send_frame(sink, &frame).await
}

async fn connect_ws(url: &str) -> std::result::Result<(WsSink, WsStream), String> {
    let host = url.split("//").last().unwrap_or("localhost");
    let request = Request::builder()
        .uri(url)
        .header("Host", host)
        .header("Connection", "Upgrade")
        .header("Upgrade", "websocket")
        .header("Sec-WebSocket-Version", "13")
        .header("Sec-WebSocket-Key", generate_key())
        .body(())
        .map_err(|err| format!("failed to build request: {err}"))?;

    let (ws, _) = connect_async_with_config(request, None, false)
        .await
        .map_err(|err| format!("websocket connect failed: {err}"))?;

    Ok(ws.split())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_request_timeout_is_five_seconds() {
        let config = ChannelConfig::new("ws://localhost:5000");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.reconnect_attempts, 5);
        assert_eq!(config.reconnect_delay, Duration::from_millis(1000));
    }

    #[test]
    fn config_builders_override_defaults() {
        let config = ChannelConfig::new("ws://localhost:5000")
            .with_request_timeout(Duration::from_millis(250))
            .with_reconnect(2, Duration::from_millis(50));
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.reconnect_attempts, 2);
        assert_eq!(config.reconnect_delay, Duration::from_millis(50));
    }
}
