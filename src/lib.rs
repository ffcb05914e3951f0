//! Client engine for a neural-net training dashboard.
/// One-shot API requests and base resolution.
pub mod api;
/// Application directory helpers.
pub mod app_dirs;
/// Persisted dashboard settings.
pub mod config;
/// Endpoint and parsing smoke checks.
pub mod diagnostics;
/// Logging setup.
pub mod logging;
/// Metric normalization, windowing and chart math.
pub mod metrics;
/// Streaming transports, reconnect logic and session orchestration.
pub mod stream;

mod http_client;
