//! Session driver: runs a [`SessionMachine`] against real channels.
//!
//! One driver task per session. It waits on three sources with
//! `tokio::select!`, turns whatever arrives into a [`SessionEvent`], and
//! carries out the machine's [`SessionAction`]s:
//!
//! ```text
//! loop {
//!     tokio::select! {
//!         cmd   = commands.recv()      => intent / stop from the handle
//!         event = channel_events.recv() => open / message / error / close
//!         timer = reconnect sleep       => reconnect due
//!     }
//! }
//! ```
//!
//! Each channel runs in its own task ([`run_channel`]) that forwards
//! inbound payloads in arrival order and writes outbound payloads from
//! an unbounded queue. Dropping the queue's sender is how the driver
//! tells a channel to close.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tilesync_protocol::{encode_intent, Codec, Intent};
use tilesync_transport::{ChannelId, Connection, Connector};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Sleep};
use tracing::{debug, error, info, warn};

use crate::machine::{SessionAction, SessionEvent, SessionMachine, TimerId};
use crate::{ConnectionState, Reconciler, SessionConfig};

/// Requests from a [`SessionHandle`](crate::SessionHandle).
#[derive(Debug)]
pub(crate) enum Command {
    Intent(Intent),
    Stop,
}

/// What a channel task reports back to the driver.
#[derive(Debug)]
enum ChannelEvent {
    Opened,
    Message(Vec<u8>),
    Error(String),
    Closed,
}

impl ChannelEvent {
    fn into_session_event(self, id: ChannelId) -> SessionEvent {
        match self {
            ChannelEvent::Opened => SessionEvent::ChannelOpened(id),
            ChannelEvent::Message(data) => SessionEvent::ChannelMessage(id, data),
            ChannelEvent::Error(reason) => SessionEvent::ChannelError(id, reason),
            ChannelEvent::Closed => SessionEvent::ChannelClosed(id),
        }
    }
}

type ChannelEventSender = mpsc::UnboundedSender<(ChannelId, ChannelEvent)>;

struct LiveChannel {
    id: ChannelId,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    task: JoinHandle<()>,
}

struct PendingReconnect {
    id: TimerId,
    sleep: Pin<Box<Sleep>>,
}

pub(crate) struct SessionDriver<K: Connector, C: Codec> {
    connector: Arc<K>,
    codec: C,
    machine: SessionMachine,
    reconciler: Reconciler<C>,
    connection: watch::Sender<ConnectionState>,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: ChannelEventSender,
    events_rx: mpsc::UnboundedReceiver<(ChannelId, ChannelEvent)>,
    live: Option<LiveChannel>,
    /// Channels that were told to close but may still be shutting down.
    retired: Vec<JoinHandle<()>>,
    reconnect: Option<PendingReconnect>,
    shutdown_timeout: Duration,
}

impl<K, C> SessionDriver<K, C>
where
    K: Connector,
    C: Codec + Clone,
{
    pub(crate) fn new(
        connector: K,
        codec: C,
        config: &SessionConfig,
        reconciler: Reconciler<C>,
        connection: watch::Sender<ConnectionState>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connector: Arc::new(connector),
            codec,
            machine: SessionMachine::new(config),
            reconciler,
            connection,
            commands,
            events_tx,
            events_rx,
            live: None,
            retired: Vec::new(),
            reconnect: None,
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    /// Runs the session until it is stopped or every handle is dropped.
    pub(crate) async fn run(mut self) {
        info!(endpoint = self.connector.endpoint(), "session started");
        self.step(SessionEvent::Start);

        loop {
            let event = tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Intent(intent)) => SessionEvent::Intent(intent),
                    // All handles dropped counts as teardown.
                    Some(Command::Stop) | None => SessionEvent::Stop,
                },
                Some((id, event)) = self.events_rx.recv() => {
                    event.into_session_event(id)
                }
                timer = wait_for_reconnect(&mut self.reconnect) => {
                    self.reconnect = None;
                    SessionEvent::ReconnectDue(timer)
                }
            };

            let stopping = matches!(event, SessionEvent::Stop);
            self.step(event);
            if stopping {
                break;
            }
        }

        self.join_retired().await;
        debug!("session driver exited");
    }

    fn step(&mut self, event: SessionEvent) {
        for action in self.machine.handle(event) {
            self.execute(action);
        }
    }

    fn execute(&mut self, action: SessionAction) {
        match action {
            SessionAction::Open(id) => self.open(id),
            SessionAction::Send(id, intent) => self.send(id, intent),
            SessionAction::Close(id) => self.close(id),
            SessionAction::Deliver(data) => {
                // Failures are logged by the reconciler and otherwise ignored.
                let _ = self.reconciler.apply(&data);
            }
            SessionAction::ArmReconnect(id, delay) => {
                self.reconnect = Some(PendingReconnect {
                    id,
                    sleep: Box::pin(time::sleep(delay)),
                });
            }
            SessionAction::CancelReconnect(id) => {
                if self.reconnect.as_ref().is_some_and(|p| p.id == id) {
                    debug!(timer = %id, "reconnect cancelled");
                    self.reconnect = None;
                }
            }
            SessionAction::Publish(state) => {
                self.connection.send_replace(state);
            }
        }
    }

    fn open(&mut self, id: ChannelId) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_channel(
            id,
            Arc::clone(&self.connector),
            outbound_rx,
            self.events_tx.clone(),
        ));
        let previous = self.live.replace(LiveChannel { id, outbound, task });
        if let Some(old) = previous {
            // The machine only opens when nothing is live.
            error!(old = %old.id, new = %id, "opened a channel while another was live");
            self.retire(old);
        }
    }

    fn send(&mut self, id: ChannelId, intent: Intent) {
        let Some(live) = self.live.as_ref().filter(|l| l.id == id) else {
            debug!(channel = %id, "send for channel that is no longer live");
            return;
        };
        match encode_intent(&self.codec, &intent) {
            Ok(bytes) => {
                debug!(channel = %id, intent = intent.kind(), "sending intent");
                if live.outbound.send(bytes).is_err() {
                    debug!(channel = %id, "channel task already exited");
                }
            }
            Err(e) => {
                error!(channel = %id, error = %e, "failed to encode intent");
            }
        }
    }

    fn close(&mut self, id: ChannelId) {
        if let Some(live) = self.live.take_if(|l| l.id == id) {
            self.retire(live);
        }
    }

    fn retire(&mut self, channel: LiveChannel) {
        // Dropping the sender is the close signal for the channel task.
        drop(channel.outbound);
        self.retired.retain(|task| !task.is_finished());
        self.retired.push(channel.task);
    }

    /// Waits for closing channels to finish, aborting any that take longer
    /// than the shutdown timeout.
    async fn join_retired(&mut self) {
        for mut task in self.retired.drain(..) {
            match time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "channel task terminated abnormally");
                }
                Err(_) => {
                    warn!("channel did not close within timeout; aborting task");
                    task.abort();
                }
            }
        }
    }
}

/// Resolves when the pending reconnect timer elapses. Pends forever when
/// none is armed, so `select!` keeps serving the other branches.
async fn wait_for_reconnect(pending: &mut Option<PendingReconnect>) -> TimerId {
    match pending {
        Some(p) => {
            p.sleep.as_mut().await;
            p.id
        }
        None => std::future::pending().await,
    }
}

/// Owns one channel from connect to close.
///
/// Reports `Opened` once connected, then every inbound payload in order.
/// A failed connect reports `Error` then `Closed`; a transport error on an
/// open channel closes it and reports `Error` then `Closed`. The driver
/// closes the channel by dropping `outbound`.
async fn run_channel<K: Connector>(
    id: ChannelId,
    connector: Arc<K>,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    events: ChannelEventSender,
) {
    let emit = |event: ChannelEvent| {
        // The driver may already be gone during teardown.
        let _ = events.send((id, event));
    };

    debug!(channel = %id, endpoint = connector.endpoint(), "opening channel");
    let conn = tokio::select! {
        result = connector.connect() => match result {
            Ok(conn) => conn,
            Err(e) => {
                emit(ChannelEvent::Error(e.to_string()));
                emit(ChannelEvent::Closed);
                return;
            }
        },
        None = outbound.recv() => {
            debug!(channel = %id, "channel cancelled before it opened");
            return;
        }
    };
    emit(ChannelEvent::Opened);

    loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(bytes) => {
                    if let Err(e) = conn.send(&bytes).await {
                        emit(ChannelEvent::Error(e.to_string()));
                        break;
                    }
                }
                None => {
                    debug!(channel = %id, "closing channel");
                    break;
                }
            },
            incoming = conn.recv() => match incoming {
                Ok(Some(data)) => emit(ChannelEvent::Message(data)),
                Ok(None) => {
                    debug!(channel = %id, "channel closed by server");
                    emit(ChannelEvent::Closed);
                    return;
                }
                Err(e) => {
                    emit(ChannelEvent::Error(e.to_string()));
                    break;
                }
            },
        }
    }

    if let Err(e) = conn.close().await {
        debug!(channel = %id, error = %e, "close failed");
    }
    emit(ChannelEvent::Closed);
}
