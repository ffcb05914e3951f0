//! Per-channel connection ownership and the reconnect state machine.
//!
//! A manager owns at most one live transport and one retry counter. Every
//! transition happens on the polling thread: transport reader threads only
//! queue raw events, and reconnect timers are deadlines checked against the
//! `now` passed into [`ConnectionManager::poll`], which keeps the whole
//! machine drivable by a fake clock in tests.

use std::{
    sync::mpsc::{Receiver, TryRecvError, channel},
    time::Instant,
};

use serde_json::Value;

use crate::stream::ReconnectPolicy;
use crate::stream::backoff::MAX_ATTEMPT;
use crate::stream::transport::{
    TransportEvent, TransportFactory, TransportHandle, TransportKind, TransportTarget,
};

/// Lifecycle of one logical channel's connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport, nothing scheduled.
    Idle,
    /// A transport was constructed and has not yet reported open.
    Connecting,
    /// The transport is delivering messages.
    Open,
    /// An orderly shutdown is in progress.
    Closing,
    /// The transport failed; a reconnect may be pending.
    Errored,
}

/// Immutable per-channel configuration.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Connection targets in preference order (primary first).
    pub targets: Vec<TransportTarget>,
    /// Whether failures schedule automatic reconnects.
    pub auto_reconnect: bool,
}

/// Retry counter owned by exactly one manager.
#[derive(Clone, Copy, Debug, Default)]
struct RetryState {
    attempt: u32,
}

impl RetryState {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn bump(&mut self) {
        self.attempt = (self.attempt + 1).min(MAX_ATTEMPT);
    }
}

struct ActiveTransport {
    handle: Box<dyn TransportHandle>,
    events: Receiver<TransportEvent>,
    kind: TransportKind,
    url: String,
}

/// Owns one logical channel: its transport, state, retry counter and
/// pending reconnect deadline.
pub struct ConnectionManager {
    name: &'static str,
    config: StreamConfig,
    policy: ReconnectPolicy,
    state: ConnectionState,
    retry: RetryState,
    active: Option<ActiveTransport>,
    pending_reconnect: Option<Instant>,
    status: String,
}

impl ConnectionManager {
    /// Create an idle manager for the named channel.
    pub fn new(name: &'static str, config: StreamConfig, policy: ReconnectPolicy) -> Self {
        Self {
            name,
            config,
            policy,
            state: ConnectionState::Idle,
            retry: RetryState::default(),
            active: None,
            pending_reconnect: None,
            status: format!("{name}: idle"),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Latest human-readable status line.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Current retry attempt counter.
    pub fn attempt(&self) -> u32 {
        self.retry.attempt
    }

    /// Deadline of the pending reconnect, if one is scheduled.
    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.pending_reconnect
    }

    /// Kind of the currently owned transport, if any.
    pub fn active_transport(&self) -> Option<TransportKind> {
        self.active.as_ref().map(|active| active.kind)
    }

    /// Enable or disable automatic reconnection. Disabling cancels a pending
    /// reconnect immediately; re-enabling does not retroactively resume it.
    pub fn set_auto_reconnect(&mut self, enabled: bool) {
        self.config.auto_reconnect = enabled;
        if !enabled {
            self.pending_reconnect = None;
        }
    }

    /// Attempt to connect, trying each configured target in preference
    /// order. A synchronous constructor failure of the primary immediately
    /// moves on to the fallback. Valid from `Idle` or `Errored`; ignored in
    /// any other state.
    pub fn open(&mut self, factory: &dyn TransportFactory, now: Instant) {
        match self.state {
            ConnectionState::Idle | ConnectionState::Errored => {}
            other => {
                tracing::debug!(channel = self.name, state = ?other, "open ignored");
                return;
            }
        }
        self.pending_reconnect = None;

        for target in self.config.targets.clone() {
            let (tx, rx) = channel();
            match factory.connect(&target, tx) {
                Ok(handle) => {
                    self.state = ConnectionState::Connecting;
                    self.status = format!(
                        "{}: {} connecting: {}",
                        self.name,
                        target.kind.label(),
                        target.url
                    );
                    tracing::info!(
                        channel = self.name,
                        transport = target.kind.label(),
                        url = %target.url,
                        "transport constructed"
                    );
                    self.active = Some(ActiveTransport {
                        handle,
                        events: rx,
                        kind: target.kind,
                        url: target.url,
                    });
                    return;
                }
                Err(err) => {
                    tracing::warn!(
                        channel = self.name,
                        transport = target.kind.label(),
                        url = %target.url,
                        "transport construction failed: {err}"
                    );
                }
            }
        }

        self.fail(now, "no transport could be established");
    }

    /// Drain pending transport events and fire a due reconnect. Decoded
    /// message payloads are handed to `on_payload`; undecodable payloads are
    /// dropped silently without touching the connection.
    pub fn poll(
        &mut self,
        factory: &dyn TransportFactory,
        now: Instant,
        on_payload: &mut dyn FnMut(&Value),
    ) {
        if self.pending_reconnect.is_some_and(|deadline| now >= deadline) {
            self.pending_reconnect = None;
            if self.config.auto_reconnect && self.state == ConnectionState::Errored {
                self.open(factory, now);
            }
        }

        loop {
            let event = match &self.active {
                Some(active) => match active.events.try_recv() {
                    Ok(event) => event,
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                },
                None => break,
            };
            match event {
                TransportEvent::Opened => self.handle_opened(),
                TransportEvent::Message(payload) => self.handle_message(&payload, on_payload),
                TransportEvent::Failed(reason) => {
                    self.fail(now, &reason);
                    break;
                }
                TransportEvent::Closed => {
                    self.fail(now, "connection closed by remote");
                    break;
                }
            }
        }
    }

    /// Stop the channel: cancel any pending reconnect first (so a close
    /// signal racing with teardown cannot schedule a zombie reconnect), then
    /// close the transport and reset the retry counter. Idempotent and valid
    /// from any state.
    pub fn stop(&mut self) {
        self.pending_reconnect = None;
        if let Some(mut active) = self.active.take() {
            self.state = ConnectionState::Closing;
            active.handle.close();
        }
        self.state = ConnectionState::Idle;
        self.retry.reset();
        self.status = format!("{}: stream stopped", self.name);
    }

    fn handle_opened(&mut self) {
        let Some(active) = &self.active else {
            return;
        };
        self.state = ConnectionState::Open;
        self.retry.reset();
        self.status = format!(
            "{}: {} connected: {}",
            self.name,
            active.kind.label(),
            active.url
        );
        tracing::info!(channel = self.name, status = %self.status, "channel open");
    }

    fn handle_message(&mut self, payload: &str, on_payload: &mut dyn FnMut(&Value)) {
        if self.state != ConnectionState::Open {
            return;
        }
        match serde_json::from_str::<Value>(payload) {
            Ok(value) => on_payload(&value),
            Err(_) => {
                // Malformed payloads are dropped; the connection stays up.
                tracing::debug!(channel = self.name, "dropping undecodable payload");
            }
        }
    }

    fn fail(&mut self, now: Instant, reason: &str) {
        if let Some(mut active) = self.active.take() {
            active.handle.close();
        }
        self.state = ConnectionState::Errored;
        tracing::warn!(channel = self.name, "transport failed: {reason}");

        if self.config.auto_reconnect {
            let attempt = self.retry.attempt;
            let delay = self.policy.next_delay(attempt);
            self.pending_reconnect = Some(now + delay);
            self.status = format!(
                "{}: reconnect in {}ms (attempt {})",
                self.name,
                delay.as_millis(),
                attempt + 1
            );
            self.retry.bump();
        } else {
            self.status = format!("{}: stream failed: {reason}", self.name);
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("attempt", &self.retry.attempt)
            .field("pending_reconnect", &self.pending_reconnect)
            .finish_non_exhaustive()
    }
}
