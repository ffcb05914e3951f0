//! One-shot requests: start-training, predict, health.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::base::join_path;
use crate::http_client;

const MAX_BODY_SNIPPET_BYTES: usize = 64 * 1024;
const MAX_PREDICT_RESPONSE_BYTES: usize = 256 * 1024;

/// Hyperparameters submitted with a start-training request.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct TrainParams {
    /// Model architecture identifier (e.g. `mlp`, `cnn`).
    pub model: String,
    /// Batch size.
    pub batch: u32,
    /// Number of epochs.
    pub epochs: u32,
    /// Learning rate.
    pub lr: f64,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            model: "mlp".to_string(),
            batch: 32,
            epochs: 5,
            lr: 0.01,
        }
    }
}

/// Outcome of a health probe; a non-success status is still a report, not an
/// error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthReport {
    /// HTTP status code.
    pub status: u16,
    /// Body text, truncated to a bounded snippet.
    pub body: String,
}

/// Errors from the one-shot request surface. These are surfaced to the user
/// as status text and never retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Body text, truncated.
        body: String,
    },
    /// The request never completed.
    #[error("HTTP error: {0}")]
    Transport(String),
    /// The response body could not be read.
    #[error("Failed to read response: {0}")]
    Body(#[from] std::io::Error),
    /// The response was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(String),
}

/// Kick off a training run. POSTs to `/train/start`; any failure there
/// falls back to the legacy `/train` path once. The fallback's error is the
/// one reported.
pub fn start_training(base: &str, params: &TrainParams) -> Result<(), ApiError> {
    match post_train(&join_path(base, "/train/start"), params) {
        Ok(()) => Ok(()),
        Err(primary) => {
            tracing::debug!("start-training primary path failed, trying fallback: {primary}");
            post_train(&join_path(base, "/train"), params)
        }
    }
}

fn post_train(url: &str, params: &TrainParams) -> Result<(), ApiError> {
    let response = http_client::agent()
        .post(url)
        .set("Content-Type", "application/json")
        .send_json(params)
        .map_err(map_request_error)?;
    // Body is irrelevant on success; drain it so the connection can be reused.
    let _ = http_client::read_response_text(response, MAX_BODY_SNIPPET_BYTES);
    Ok(())
}

/// Submit an image for inference as `multipart/form-data` under the `file`
/// field and return the extracted prediction label.
pub fn predict(base: &str, image: &[u8], filename: &str) -> Result<String, ApiError> {
    let boundary = format!("----netstudio{:016x}", rand::rng().random::<u64>());
    let body = multipart_file_body(&boundary, "file", filename, image);
    let response = http_client::agent()
        .post(&join_path(base, "/predict"))
        .set(
            "Content-Type",
            &format!("multipart/form-data; boundary={boundary}"),
        )
        .send_bytes(&body)
        .map_err(map_request_error)?;
    let text = http_client::read_response_text(response, MAX_PREDICT_RESPONSE_BYTES)?;
    let value: Value = serde_json::from_str(&text).map_err(|err| ApiError::Json(err.to_string()))?;
    Ok(extract_prediction(&value))
}

/// Probe `/health` and report the status line and a bounded body snippet.
pub fn health(base: &str) -> Result<HealthReport, ApiError> {
    let url = join_path(base, "/health");
    let (status, response) = match http_client::agent().get(&url).call() {
        Ok(response) => (response.status(), response),
        Err(ureq::Error::Status(status, response)) => (status, response),
        Err(ureq::Error::Transport(err)) => return Err(ApiError::Transport(err.to_string())),
    };
    let body = http_client::read_response_text(response, MAX_BODY_SNIPPET_BYTES)
        .unwrap_or_else(|_| "(no body)".to_string());
    Ok(HealthReport {
        status,
        body: truncate(&body, 200),
    })
}

/// Extract a display label from a predict response: the `label` field when
/// present, a bare string as-is, anything else stringified whole.
pub fn extract_prediction(data: &Value) -> String {
    if let Some(label) = data.get("label") {
        return scalar_text(label);
    }
    if let Value::String(text) = data {
        return text.clone();
    }
    data.to_string()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn multipart_file_body(boundary: &str, field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

fn map_request_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = http_client::read_response_text(response, MAX_BODY_SNIPPET_BYTES)
                .unwrap_or_else(|_| "(no body)".to_string());
            ApiError::Status {
                status,
                body: truncate(&body, 200),
            }
        }
        ureq::Error::Transport(err) => ApiError::Transport(err.to_string()),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
