//! Endpoint and parsing smoke checks.
//!
//! Each check yields one report line; failures become report lines too, so
//! the diagnostics run never errors as a whole. Useful for verifying a
//! deployment without touching the training job itself.

use serde_json::json;

use crate::api::{self, TrainParams};
use crate::config::DashboardConfig;
use crate::metrics;

/// Run all smoke checks against the resolved API base and return the
/// report, one line per check.
pub fn run(config: &DashboardConfig, base: &str) -> Vec<String> {
    let ws_base = api::websocket_base(base);
    let dry_run = TrainParams {
        batch: 8,
        epochs: 1,
        ..TrainParams::default()
    };

    let mut lines = vec![format!("Resolved api base = {base}")];

    lines.push(match api::health(base) {
        Ok(report) => format!("GET /health: status={} body={}", report.status, report.body),
        Err(err) => format!("GET /health: {err}"),
    });
    lines.push(match api::start_training(base, &dry_run) {
        Ok(()) => "POST /train (dry call): accepted".to_string(),
        Err(err) => format!("POST /train (dry call): {err}"),
    });

    lines.push(format!(
        "Metrics SSE URL: {}",
        api::join_path(base, &config.metrics_stream_path)
    ));
    lines.push(format!(
        "Metrics WS URL: {}",
        api::join_path(&ws_base, &config.metrics_socket_path)
    ));
    lines.push(format!(
        "Activations SSE URL: {}",
        api::join_path(base, &config.activations_stream_path)
    ));
    lines.push(format!(
        "Layers SSE URL: {}",
        api::join_path(base, &config.layers_stream_path)
    ));

    let series: Vec<u32> = (0..1000).collect();
    lines.push(format!(
        "Downsample 1000 -> 200: out={}",
        metrics::downsample(&series, 200).len()
    ));
    lines.push(format!(
        "Extract prediction (label): {}",
        api::extract_prediction(&json!({ "label": 7, "score": 0.98 }))
    ));
    lines.push(format!(
        "Extract prediction (no label): {}",
        api::extract_prediction(&json!({ "value": 3, "confidence": 0.77 }))
    ));

    lines
}
