//! Transport abstraction shared by the push-stream and socket clients.
//!
//! A transport is constructed synchronously (so a failing primary can fall
//! back to the secondary immediately) and then delivers events over an mpsc
//! channel from its reader thread. All state transitions happen on the
//! polling side; reader threads only forward raw events.

use std::sync::mpsc::Sender;

use thiserror::Error;

use crate::stream::{sse, ws};

/// The two supported transport kinds, in the order they usually appear in a
/// channel's preference list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
    /// Unidirectional server-sent events over a long-lived HTTP request.
    Push,
    /// Bidirectional websocket fallback.
    Socket,
}

impl TransportKind {
    /// Short label used in status strings and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Push => "SSE",
            Self::Socket => "WS",
        }
    }
}

/// A resolved connection target: which transport to use and where.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportTarget {
    /// Transport kind to construct.
    pub kind: TransportKind,
    /// Fully resolved URL (http(s) for push, ws(s) for socket).
    pub url: String,
}

/// Raw signals emitted by a transport's reader thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established and delivering data.
    Opened,
    /// One complete message payload, still undecoded.
    Message(String),
    /// The transport failed; carries a human-readable reason.
    Failed(String),
    /// The remote side closed the connection.
    Closed,
}

/// Errors surfaced by synchronous transport construction.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP request backing the push stream could not be established.
    #[error("push stream unavailable: {0}")]
    Push(String),
    /// The websocket handshake failed.
    #[error("socket unavailable: {0}")]
    Socket(String),
}

/// Handle to a live transport. Dropping the handle does not tear down the
/// reader thread; call [`TransportHandle::close`] so the thread stops
/// emitting events first.
pub trait TransportHandle: Send {
    /// Which transport kind this handle belongs to.
    fn kind(&self) -> TransportKind;
    /// Ask the reader thread to stop delivering events and release the
    /// connection. Idempotent.
    fn close(&mut self);
}

/// Constructs transports. The network implementation is
/// [`NetworkTransportFactory`]; tests inject fakes.
pub trait TransportFactory {
    /// Synchronously establish a connection to `target`, delivering all
    /// subsequent events through `events`.
    fn connect(
        &self,
        target: &TransportTarget,
        events: Sender<TransportEvent>,
    ) -> Result<Box<dyn TransportHandle>, TransportError>;
}

/// Production factory dispatching to the SSE and websocket clients.
#[derive(Clone, Copy, Debug, Default)]
pub struct NetworkTransportFactory;

impl TransportFactory for NetworkTransportFactory {
    fn connect(
        &self,
        target: &TransportTarget,
        events: Sender<TransportEvent>,
    ) -> Result<Box<dyn TransportHandle>, TransportError> {
        match target.kind {
            TransportKind::Push => sse::connect(&target.url, events),
            TransportKind::Socket => ws::connect(&target.url, events),
        }
    }
}
