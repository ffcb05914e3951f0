//! Live metric streaming: transports, reconnect policy, per-channel
//! connection managers and the session orchestrator.

mod backoff;
mod manager;
mod orchestrator;
mod payload;
mod sse;
mod transport;
mod ws;

pub use backoff::{MAX_ATTEMPT, ReconnectPolicy};
pub use manager::{ConnectionManager, ConnectionState, StreamConfig};
pub use orchestrator::StreamOrchestrator;
pub use payload::{ACTIVATION_CELLS, ActivationSnapshot, decode_activation_snapshot, decode_layer_activity};
pub use transport::{
    NetworkTransportFactory, TransportError, TransportEvent, TransportFactory, TransportHandle,
    TransportKind, TransportTarget,
};
