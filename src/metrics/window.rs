//! Rolling window buffer over the metric stream.

use std::collections::VecDeque;

use rand::Rng;

use super::MetricSample;

/// Default number of recent samples exposed to the renderer.
pub const DEFAULT_WINDOW_SIZE: usize = 400;

/// Retention cap on stored history so multi-day runs stay bounded in memory.
/// Far larger than any practical window size, so windowed views never notice.
const MAX_HISTORY: usize = 100_000;

/// A fully-defined sample as stored in the buffer.
///
/// Unlike [`MetricSample`], both fields are always present: absent values
/// are filled from the previous stored sample on append, which is what the
/// rendering layer downstream requires.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricPoint {
    /// Training step the sample belongs to.
    pub step: u64,
    /// Loss value.
    pub loss: f64,
    /// Accuracy in `[0, 1]`.
    pub accuracy: f64,
}

/// Append-only sample history consumed through a bounded most-recent view.
#[derive(Debug, Default)]
pub struct RollingWindow {
    samples: VecDeque<MetricPoint>,
}

impl RollingWindow {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The most recently stored sample, if any.
    pub fn last(&self) -> Option<&MetricPoint> {
        self.samples.back()
    }

    /// Append a normalized sample, filling absent fields from the current
    /// last element (loss defaults to the last-known loss or 1.0 on an empty
    /// buffer; accuracy to the last-known accuracy or 0.0). This is the one
    /// place the fill policy lives.
    pub fn append(&mut self, sample: MetricSample) {
        let last = self.samples.back();
        let loss = sample
            .loss
            .unwrap_or_else(|| last.map(|p| p.loss).unwrap_or(1.0));
        let accuracy = sample
            .accuracy
            .unwrap_or_else(|| last.map(|p| p.accuracy).unwrap_or(0.0));
        self.samples.push_back(MetricPoint {
            step: sample.step,
            loss,
            accuracy,
        });
        while self.samples.len() > MAX_HISTORY {
            self.samples.pop_front();
        }
    }

    /// Return the last `min(n, len)` samples in arrival order.
    pub fn windowed(&self, n: usize) -> Vec<MetricPoint> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).copied().collect()
    }

    /// Clear the buffer and optionally reseed it with placeholder samples,
    /// so the chart is non-empty immediately after a session starts.
    pub fn reset(&mut self, seed: &[MetricPoint]) {
        self.samples.clear();
        self.samples.extend(seed.iter().copied());
    }
}

/// Placeholder series shown while a fresh session warms up: a plausible
/// decaying loss curve and a rising accuracy curve over twelve steps.
pub fn demo_series() -> Vec<MetricPoint> {
    let mut rng = rand::rng();
    (0..12)
        .map(|i| MetricPoint {
            step: i as u64 + 1,
            loss: (1.0 / (i as f64 + 1.0) + rng.random_range(0.0..0.03)).max(0.02),
            accuracy: (0.2 + i as f64 * 0.07).min(0.99),
        })
        .collect()
}
