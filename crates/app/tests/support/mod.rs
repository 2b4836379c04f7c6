use std::path::PathBuf;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::Message;

use skillswap_app::{SessionHandle, SyncEngine};
use skillswap_core::UserProfile;
use skillswap_realtime::ChannelConfig;
use skillswap_store::{ActivityLogStore, UpdateSignal};

pub type ServerWs = WebSocketStream<TcpStream>;

pub struct TestEngine {
    _dir: TempDir,
    pub engine: SyncEngine,
    pub session: SessionHandle,
    pub signal: UpdateSignal,
    pub db_path: PathBuf,
}

pub async fn bind_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

pub async fn accept_ws(listener: &TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

/// Read the next JSON frame, transparently answering pings.
pub async fn read_frame(ws: &mut ServerWs) -> Value {
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(payload) => ws.send(Message::Pong(payload)).await.unwrap(),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

pub async fn push_frame(ws: &mut ServerWs, event: &str, data: Value) {
    let raw = serde_json::to_string(&json!({ "event": event, "data": data })).unwrap();
    ws.send(Message::Text(raw.into())).await.unwrap();
}

pub fn setup_engine(url: &str) -> TestEngine {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("skillswap.sqlite");
    let signal = UpdateSignal::new();
    let store = ActivityLogStore::open(&db_path, signal.clone()).unwrap();
    let session = SessionHandle::new();
    let config = ChannelConfig::new(url)
        .with_request_timeout(Duration::from_millis(500))
        .with_reconnect(5, Duration::from_millis(30));
    let engine = SyncEngine::new(store, session.clone(), config);
    TestEngine {
        _dir: dir,
        engine,
        session,
        signal,
        db_path,
    }
}

pub fn open_store(test: &TestEngine) -> ActivityLogStore {
    ActivityLogStore::open(&test.db_path, test.signal.clone()).unwrap()
}

pub fn user(id: i64, tokens: i64) -> UserProfile {
    UserProfile {
        id,
        name: format!("user-{id}"),
        tokens,
    }
}

/// Let the engine drain the session watch before the next mutation; the
/// watch coalesces rapid writes, and these tests need each snapshot seen.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(120)).await;
}

/// Poll until `check` holds or three seconds pass.
pub async fn wait_for(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while !check() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
