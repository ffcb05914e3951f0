//! Normalization of heterogeneous stream messages into canonical samples.

use serde_json::Value;

/// A canonical metric sample as produced by the normalizer.
///
/// Either field may still be absent at this stage; default-filling from the
/// last stored value happens when the sample enters the rolling window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricSample {
    /// Training step (or epoch) the sample belongs to.
    pub step: u64,
    /// Loss value, when the message carried one.
    pub loss: Option<f64>,
    /// Accuracy in `[0, 1]`, when the message carried one.
    pub accuracy: Option<f64>,
}

/// Normalize a decoded stream message into a [`MetricSample`].
///
/// Senders differ on whether they report `step` or `epoch` and `acc` or
/// `accuracy`, so every key is optional and non-numeric values are treated
/// as absent rather than rejecting the whole message. Step resolution
/// prefers an explicit `step`, then `epoch`, then one past the buffer's
/// current length. Returns `None` when the message carries neither a loss
/// nor an accuracy value; such messages are dropped before they reach the
/// buffer.
pub fn normalize(raw: &Value, buffer_len: usize) -> Option<MetricSample> {
    let step = numeric_field(raw, "step")
        .or_else(|| numeric_field(raw, "epoch"))
        .map(|value| value.max(0.0) as u64)
        .unwrap_or(buffer_len as u64 + 1);
    let loss = numeric_field(raw, "loss");
    let accuracy = numeric_field(raw, "acc").or_else(|| numeric_field(raw, "accuracy"));

    if loss.is_none() && accuracy.is_none() {
        return None;
    }
    Some(MetricSample {
        step,
        loss,
        accuracy,
    })
}

fn numeric_field(raw: &Value, key: &str) -> Option<f64> {
    raw.get(key)
        .and_then(Value::as_f64)
        .filter(|value| value.is_finite())
}
