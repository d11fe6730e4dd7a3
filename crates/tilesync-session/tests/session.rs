//! Integration tests for a running session.
//!
//! The session is driven against an in-memory connector so every channel
//! the client opens can be inspected from the "server" side. Time is
//! paused: reconnect delays elapse as soon as the runtime goes idle, and
//! `Instant` differences are exact.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tilesync_protocol::{Direction, Intent, JsonCodec, Tile};
use tilesync_session::{ConnectionState, SessionConfig, SessionError, SessionHandle};
use tilesync_transport::{Connection, Connector};
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

// =========================================================================
// In-memory connector
// =========================================================================

#[derive(Debug, thiserror::Error)]
#[error("mock transport: {0}")]
struct MockError(&'static str);

/// What the server side can push down a channel.
enum Frame {
    Data(Vec<u8>),
    Close,
    Error,
}

#[derive(Default)]
struct Stats {
    attempts: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    refuse: AtomicBool,
}

impl Stats {
    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

struct MockConnector {
    accepted: mpsc::UnboundedSender<ServerSide>,
    stats: Arc<Stats>,
}

struct MockConnection {
    sent: mpsc::UnboundedSender<Vec<u8>>,
    inbound: Mutex<mpsc::UnboundedReceiver<Frame>>,
    stats: Arc<Stats>,
}

/// The server's end of one channel.
struct ServerSide {
    sent: mpsc::UnboundedReceiver<Vec<u8>>,
    push: mpsc::UnboundedSender<Frame>,
}

impl MockConnector {
    fn new() -> (Self, mpsc::UnboundedReceiver<ServerSide>, Arc<Stats>) {
        let (accepted, accepted_rx) = mpsc::unbounded_channel();
        let stats = Arc::new(Stats::default());
        let connector = Self {
            accepted,
            stats: Arc::clone(&stats),
        };
        (connector, accepted_rx, stats)
    }
}

impl Connector for MockConnector {
    type Connection = MockConnection;
    type Error = MockError;

    async fn connect(&self) -> Result<MockConnection, MockError> {
        self.stats.attempts.fetch_add(1, Ordering::SeqCst);
        if self.stats.refuse.load(Ordering::SeqCst) {
            return Err(MockError("connection refused"));
        }

        let (sent, sent_rx) = mpsc::unbounded_channel();
        let (push, inbound) = mpsc::unbounded_channel();
        let live = self.stats.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_live.fetch_max(live, Ordering::SeqCst);

        let _ = self.accepted.send(ServerSide {
            sent: sent_rx,
            push,
        });
        Ok(MockConnection {
            sent,
            inbound: Mutex::new(inbound),
            stats: Arc::clone(&self.stats),
        })
    }

    fn endpoint(&self) -> &str {
        "mock://game"
    }
}

impl Connection for MockConnection {
    type Error = MockError;

    async fn send(&self, data: &[u8]) -> Result<(), MockError> {
        self.sent
            .send(data.to_vec())
            .map_err(|_| MockError("server gone"))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, MockError> {
        match self.inbound.lock().await.recv().await {
            Some(Frame::Data(data)) => Ok(Some(data)),
            Some(Frame::Close) | None => Ok(None),
            Some(Frame::Error) => Err(MockError("connection reset")),
        }
    }

    async fn close(&self) -> Result<(), MockError> {
        Ok(())
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ServerSide {
    async fn next_frame(&mut self) -> Value {
        let bytes = self.sent.recv().await.expect("client should send a frame");
        serde_json::from_slice(&bytes).expect("client frames should be JSON")
    }

    fn push_json(&self, value: Value) {
        let bytes = serde_json::to_vec(&value).unwrap();
        let _ = self.push.send(Frame::Data(bytes));
    }

    fn push_raw(&self, bytes: &[u8]) {
        let _ = self.push.send(Frame::Data(bytes.to_vec()));
    }

    fn close(&self) {
        let _ = self.push.send(Frame::Close);
    }

    fn fail(&self) {
        let _ = self.push.send(Frame::Error);
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn start() -> (
    SessionHandle,
    mpsc::UnboundedReceiver<ServerSide>,
    Arc<Stats>,
) {
    let (connector, accepted, stats) = MockConnector::new();
    let handle = SessionHandle::start(connector, JsonCodec, SessionConfig::default());
    (handle, accepted, stats)
}

/// Lets every task run until the runtime is idle.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

async fn wait_for_connection(handle: &SessionHandle, want: ConnectionState) {
    handle
        .subscribe_connection()
        .wait_for(|s| *s == want)
        .await
        .expect("session should still be publishing");
}

fn snapshot(score: u64, over: bool) -> Value {
    let mut cells = vec![vec![Value::Null; 4]; 4];
    cells[0][0] = json!({"position": [0, 0], "value": 2});
    json!({
        "grid": {"size": 4, "cells": cells},
        "score": score,
        "over": over,
        "won": false,
        "keepPlaying": false,
    })
}

// =========================================================================
// Connecting
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_start_sends_init_first_on_open() {
    let (mut handle, mut accepted, stats) = start();

    let mut server = accepted.recv().await.unwrap();
    assert_eq!(server.next_frame().await, json!({"type": "init"}));
    wait_for_connection(&handle, ConnectionState::Connected).await;
    assert_eq!(stats.attempts(), 1);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_send_intent_while_connected_reaches_server() {
    let (mut handle, mut accepted, _stats) = start();
    let mut server = accepted.recv().await.unwrap();
    server.next_frame().await;
    wait_for_connection(&handle, ConnectionState::Connected).await;

    handle
        .send_intent(Intent::Move {
            direction: Direction::Left,
        })
        .unwrap();
    handle.send_intent(Intent::Restart).unwrap();

    assert_eq!(
        server.next_frame().await,
        json!({"type": "move", "direction": 3})
    );
    assert_eq!(server.next_frame().await, json!({"type": "restart"}));

    handle.stop().await;
}

// =========================================================================
// Reconciliation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_snapshot_replaces_game_state() {
    let (mut handle, mut accepted, _stats) = start();
    let mut server = accepted.recv().await.unwrap();
    server.next_frame().await;

    let mut state = handle.subscribe_state();
    server.push_json(snapshot(4, false));
    state.wait_for(|s| s.score == 4).await.unwrap();

    let current = handle.game_state();
    assert_eq!(current.grid[0][0], Some(Tile::new(0, 0, 2)));
    assert_eq!(current.tiles().count(), 1);
    assert!(!current.over);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_malformed_payload_leaves_state_unchanged() {
    let (mut handle, mut accepted, _stats) = start();
    let mut server = accepted.recv().await.unwrap();
    server.next_frame().await;

    server.push_json(snapshot(4, false));
    settle().await;
    let before = handle.game_state();

    server.push_raw(b"{not json");
    server.push_json(json!({"error": "Invalid move"}));
    settle().await;

    assert_eq!(handle.game_state(), before);
    assert_eq!(
        handle.connection_state(),
        ConnectionState::Connected,
        "bad payloads must not drop the channel"
    );

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_snapshots_apply_in_arrival_order() {
    let (mut handle, mut accepted, _stats) = start();
    let mut server = accepted.recv().await.unwrap();
    server.next_frame().await;

    for score in [2, 4, 8, 16] {
        server.push_json(snapshot(score, score == 16));
    }
    settle().await;

    let state = handle.game_state();
    assert_eq!(state.score, 16);
    assert!(state.over);

    handle.stop().await;
}

// =========================================================================
// Reconnecting
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_close_reconnects_once_after_fixed_delay() {
    let (mut handle, mut accepted, stats) = start();
    let mut server = accepted.recv().await.unwrap();
    server.next_frame().await;
    wait_for_connection(&handle, ConnectionState::Connected).await;

    let closed_at = Instant::now();
    server.close();
    wait_for_connection(&handle, ConnectionState::Disconnected).await;

    let mut second = accepted.recv().await.unwrap();
    let elapsed = closed_at.elapsed();
    assert!(elapsed >= Duration::from_millis(1000), "reconnected after {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1100), "reconnected after {elapsed:?}");

    // Every open re-requests the snapshot.
    assert_eq!(second.next_frame().await, json!({"type": "init"}));
    wait_for_connection(&handle, ConnectionState::Connected).await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(stats.attempts(), 2, "exactly one reconnect per loss");
    assert!(accepted.try_recv().is_err());

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_counts_as_close() {
    let (mut handle, mut accepted, stats) = start();
    let mut server = accepted.recv().await.unwrap();
    server.next_frame().await;

    server.fail();
    wait_for_connection(&handle, ConnectionState::Disconnected).await;

    let mut second = accepted.recv().await.unwrap();
    assert_eq!(second.next_frame().await, json!({"type": "init"}));
    assert_eq!(stats.attempts(), 2);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_connect_retries_after_delay() {
    let (connector, mut accepted, stats) = MockConnector::new();
    stats.refuse(true);
    let started = Instant::now();
    let mut handle = SessionHandle::start(connector, JsonCodec, SessionConfig::default());

    settle().await;
    assert_eq!(stats.attempts(), 1);
    assert_eq!(handle.connection_state(), ConnectionState::Disconnected);

    stats.refuse(false);
    let mut server = accepted.recv().await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(stats.attempts(), 2);
    assert_eq!(server.next_frame().await, json!({"type": "init"}));

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_intents_while_disconnected_are_dropped() {
    let (mut handle, mut accepted, _stats) = start();
    let mut server = accepted.recv().await.unwrap();
    server.next_frame().await;

    server.close();
    wait_for_connection(&handle, ConnectionState::Disconnected).await;
    handle
        .send_intent(Intent::Move {
            direction: Direction::Up,
        })
        .expect("a running session accepts intents");
    handle.send_intent(Intent::Restart).unwrap();

    let mut second = accepted.recv().await.unwrap();
    assert_eq!(second.next_frame().await, json!({"type": "init"}));
    settle().await;
    assert!(
        second.sent.try_recv().is_err(),
        "intents issued while disconnected must not be replayed"
    );

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_at_most_one_live_channel_across_reconnects() {
    let (mut handle, mut accepted, stats) = start();

    for _ in 0..3 {
        let mut server = accepted.recv().await.unwrap();
        server.next_frame().await;
        server.close();
        wait_for_connection(&handle, ConnectionState::Disconnected).await;
    }
    let mut last = accepted.recv().await.unwrap();
    last.next_frame().await;

    assert_eq!(stats.attempts(), 4);
    assert_eq!(stats.max_live(), 1);

    handle.stop().await;
}

// =========================================================================
// Stopping
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_stop_closes_live_channel() {
    let (mut handle, mut accepted, stats) = start();
    let mut server = accepted.recv().await.unwrap();
    server.next_frame().await;

    handle.stop().await;

    assert_eq!(handle.connection_state(), ConnectionState::Disconnected);
    assert!(!handle.is_running());
    assert!(server.sent.recv().await.is_none(), "channel should be closed");
    assert_eq!(stats.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_reconnect_delay_cancels_reconnect() {
    let (mut handle, mut accepted, stats) = start();
    let mut server = accepted.recv().await.unwrap();
    server.next_frame().await;

    server.close();
    wait_for_connection(&handle, ConnectionState::Disconnected).await;
    handle.stop().await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(stats.attempts(), 1, "no reconnect after stop");
    assert!(accepted.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_send_intent_after_stop_returns_stopped() {
    let (mut handle, _accepted, _stats) = start();
    handle.stop().await;

    let result = handle.send_intent(Intent::Restart);
    assert!(matches!(result, Err(SessionError::Stopped)));

    // A second stop is a no-op.
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_tears_session_down() {
    let (handle, mut accepted, stats) = start();
    let mut server = accepted.recv().await.unwrap();
    server.next_frame().await;

    drop(handle);
    settle().await;

    assert!(server.sent.recv().await.is_none());
    assert_eq!(stats.live(), 0);
}
