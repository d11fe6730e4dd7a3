//! The connection manager's state machine.
//!
//! [`SessionMachine`] is synchronous and does no I/O. The driver feeds
//! it [`SessionEvent`]s in the order they happen and carries out the
//! [`SessionAction`]s it returns. Keeping the decisions here means every
//! lifecycle rule can be exercised without a socket or a runtime.
//!
//! # Invariants
//!
//! - At most one channel is live: `channel` holds its id while it is
//!   `Connecting` or `Connected`, and a new one is only opened when
//!   `channel` is empty.
//! - At most one reconnect timer is armed: `reconnect` holds its id, and
//!   a closure only arms a timer when none is pending.
//! - Events carrying a channel or timer id other than the current one are
//!   stale and are dropped. A second close for the same channel is stale
//!   too, because the first one already cleared `channel`.
//! - `Init` is the first thing sent on every channel.
//! - After `Stop` nothing is ever opened or armed again.

use std::fmt;
use std::time::Duration;

use tilesync_protocol::Intent;
use tilesync_transport::ChannelId;
use tracing::{debug, info, warn};

use crate::{ConnectionState, SessionConfig};

/// Identifier for one armed reconnect timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Something that happened, as seen by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session was started.
    Start,
    /// A channel finished opening.
    ChannelOpened(ChannelId),
    /// A channel delivered a payload.
    ChannelMessage(ChannelId, Vec<u8>),
    /// A channel failed, including a failed connect attempt.
    ChannelError(ChannelId, String),
    /// A channel closed, for any reason.
    ChannelClosed(ChannelId),
    /// A reconnect timer elapsed.
    ReconnectDue(TimerId),
    /// The client wants to send an intent.
    Intent(Intent),
    /// The session is being torn down.
    Stop,
}

/// Something the driver must do in response to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Start opening a new channel with this id.
    Open(ChannelId),
    /// Encode and send an intent on the channel.
    Send(ChannelId, Intent),
    /// Close the channel and forget it.
    Close(ChannelId),
    /// Hand a raw payload to the reconciler.
    Deliver(Vec<u8>),
    /// Arm a reconnect timer.
    ArmReconnect(TimerId, Duration),
    /// Disarm a pending reconnect timer.
    CancelReconnect(TimerId),
    /// The connection state changed; tell observers.
    Publish(ConnectionState),
}

/// Single-writer state machine for one client session.
#[derive(Debug)]
pub struct SessionMachine {
    reconnect_delay: Duration,
    state: ConnectionState,
    /// The live channel, if any.
    channel: Option<ChannelId>,
    /// The pending reconnect timer, if any.
    reconnect: Option<TimerId>,
    last_channel: ChannelId,
    last_timer: u64,
    started: bool,
    stopped: bool,
}

impl SessionMachine {
    /// Creates an idle machine. Nothing happens until [`SessionEvent::Start`].
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            reconnect_delay: config.reconnect_delay,
            state: ConnectionState::Connecting,
            channel: None,
            reconnect: None,
            last_channel: ChannelId::new(0),
            last_timer: 0,
            started: false,
            stopped: false,
        }
    }

    /// Processes one event and returns the actions to carry out, in order.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        match event {
            SessionEvent::Start => self.on_start(&mut actions),
            SessionEvent::ChannelOpened(id) => self.on_opened(id, &mut actions),
            SessionEvent::ChannelMessage(id, data) => {
                self.on_message(id, data, &mut actions)
            }
            SessionEvent::ChannelError(id, reason) => {
                self.on_error(id, &reason, &mut actions)
            }
            SessionEvent::ChannelClosed(id) => self.on_closed(id, &mut actions),
            SessionEvent::ReconnectDue(timer) => {
                self.on_reconnect_due(timer, &mut actions)
            }
            SessionEvent::Intent(intent) => self.on_intent(intent, &mut actions),
            SessionEvent::Stop => self.on_stop(&mut actions),
        }
        actions
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The live channel, if one is connecting or connected.
    pub fn live_channel(&self) -> Option<ChannelId> {
        self.channel
    }

    /// The armed reconnect timer, if any.
    pub fn pending_reconnect(&self) -> Option<TimerId> {
        self.reconnect
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    // -- Event handlers ---------------------------------------------------

    fn on_start(&mut self, actions: &mut Vec<SessionAction>) {
        if self.started || self.stopped {
            debug!("start ignored, session already started");
            return;
        }
        self.started = true;
        self.open_channel(actions);
    }

    fn on_opened(&mut self, id: ChannelId, actions: &mut Vec<SessionAction>) {
        if self.channel != Some(id) || self.state != ConnectionState::Connecting
        {
            debug!(channel = %id, "ignoring open of stale channel");
            return;
        }
        self.transition(ConnectionState::Connected, actions);
        info!(channel = %id, "connected, requesting snapshot");
        // The server does not push state on connect; ask for it first.
        actions.push(SessionAction::Send(id, Intent::Init));
    }

    fn on_message(
        &mut self,
        id: ChannelId,
        data: Vec<u8>,
        actions: &mut Vec<SessionAction>,
    ) {
        if self.channel != Some(id) || !self.state.is_connected() {
            debug!(channel = %id, "dropping message from stale channel");
            return;
        }
        actions.push(SessionAction::Deliver(data));
    }

    fn on_error(
        &mut self,
        id: ChannelId,
        reason: &str,
        actions: &mut Vec<SessionAction>,
    ) {
        if self.channel != Some(id) {
            debug!(channel = %id, reason, "ignoring error from stale channel");
            return;
        }
        warn!(channel = %id, reason, "channel error, closing");
        actions.push(SessionAction::Close(id));
        self.on_closed(id, actions);
    }

    fn on_closed(&mut self, id: ChannelId, actions: &mut Vec<SessionAction>) {
        if self.channel != Some(id) {
            debug!(channel = %id, "ignoring close of stale channel");
            return;
        }
        self.channel = None;
        self.transition(ConnectionState::Disconnected, actions);

        if self.stopped || self.reconnect.is_some() {
            return;
        }
        self.last_timer += 1;
        let timer = TimerId(self.last_timer);
        self.reconnect = Some(timer);
        info!(
            channel = %id,
            delay = ?self.reconnect_delay,
            "channel closed, reconnect scheduled"
        );
        actions.push(SessionAction::ArmReconnect(timer, self.reconnect_delay));
    }

    fn on_reconnect_due(
        &mut self,
        timer: TimerId,
        actions: &mut Vec<SessionAction>,
    ) {
        if self.reconnect != Some(timer) {
            debug!(%timer, "ignoring stale reconnect timer");
            return;
        }
        self.reconnect = None;
        if self.stopped || self.channel.is_some() {
            return;
        }
        debug!(%timer, "reconnecting");
        self.open_channel(actions);
    }

    fn on_intent(&mut self, intent: Intent, actions: &mut Vec<SessionAction>) {
        match (self.state, self.channel) {
            (ConnectionState::Connected, Some(id)) => {
                actions.push(SessionAction::Send(id, intent));
            }
            (state, _) => {
                warn!(
                    intent = intent.kind(),
                    %state,
                    "not connected, dropping intent"
                );
            }
        }
    }

    fn on_stop(&mut self, actions: &mut Vec<SessionAction>) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Some(timer) = self.reconnect.take() {
            actions.push(SessionAction::CancelReconnect(timer));
        }
        if let Some(id) = self.channel.take() {
            actions.push(SessionAction::Close(id));
        }
        self.transition(ConnectionState::Disconnected, actions);
        info!("session stopped");
    }

    // -- Helpers ------------------------------------------------------------

    fn open_channel(&mut self, actions: &mut Vec<SessionAction>) {
        let id = self.last_channel.next();
        self.last_channel = id;
        self.channel = Some(id);
        self.transition(ConnectionState::Connecting, actions);
        actions.push(SessionAction::Open(id));
    }

    fn transition(
        &mut self,
        next: ConnectionState,
        actions: &mut Vec<SessionAction>,
    ) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "connection state changed");
            self.state = next;
            actions.push(SessionAction::Publish(next));
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
