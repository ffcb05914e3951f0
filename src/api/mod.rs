//! One-shot request surface of the remote training service, plus API base
//! resolution shared with the streaming channels.

mod base;
mod requests;

pub use base::{DEFAULT_API_BASE, join_path, resolve_api_base, websocket_base};
pub use requests::{
    ApiError, HealthReport, TrainParams, extract_prediction, health, predict, start_training,
};
