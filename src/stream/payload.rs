//! Tagged payload variants for the non-metric channels.
//!
//! Each channel's schema is validated at the channel boundary and routed to
//! its own handler; nothing downstream infers shapes field by field. Metric
//! payloads have their own normalizer in [`crate::metrics`].

use serde_json::Value;

/// Number of activation cells the visualizer renders.
pub const ACTIVATION_CELLS: usize = 64;

/// One activation snapshot: a full grid of cell values plus an optional
/// aggregate activity level.
#[derive(Clone, Debug, PartialEq)]
pub struct ActivationSnapshot {
    /// Exactly [`ACTIVATION_CELLS`] values, each clamped to `[0, 1]`.
    pub cells: Vec<f32>,
    /// Aggregate activity in `[0, 1]`, when reported.
    pub activity: Option<f32>,
}

/// Decode an activation-channel payload.
///
/// Snapshots must carry at least [`ACTIVATION_CELLS`] numeric values; the
/// grid is truncated to exactly that many, each value clamped to `[0, 1]`
/// with non-numeric entries read as 0. Shorter or missing arrays make the
/// snapshot invalid and it is dropped.
pub fn decode_activation_snapshot(raw: &Value) -> Option<ActivationSnapshot> {
    let values = raw.get("values")?.as_array()?;
    if values.len() < ACTIVATION_CELLS {
        return None;
    }
    let cells = values
        .iter()
        .take(ACTIVATION_CELLS)
        .map(|value| clamp_unit(value.as_f64()))
        .collect();
    Some(ActivationSnapshot {
        cells,
        activity: activity_field(raw),
    })
}

/// Decode a layer-channel payload into its activity level, if present.
pub fn decode_layer_activity(raw: &Value) -> Option<f32> {
    activity_field(raw)
}

fn activity_field(raw: &Value) -> Option<f32> {
    let activity = raw.get("activity")?.as_f64()?;
    if !activity.is_finite() {
        return None;
    }
    Some(activity.clamp(0.0, 1.0) as f32)
}

fn clamp_unit(value: Option<f64>) -> f32 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0) as f32,
        _ => 0.0,
    }
}
