//! Screen-space projection of a metric series.
//!
//! Pure math only; the actual drawing lives with whichever renderer consumes
//! the projected polylines.

use super::MetricPoint;

/// A projected point in screen space. Derived on demand, never stored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderPoint {
    /// Horizontal position in viewport units.
    pub x: f32,
    /// Vertical position in viewport units (down is positive).
    pub y: f32,
}

/// Viewport the series is projected into.
#[derive(Clone, Copy, Debug)]
pub struct ChartViewport {
    /// Total width in viewport units.
    pub width: f32,
    /// Total height in viewport units.
    pub height: f32,
    /// Padding applied on every edge.
    pub padding: f32,
}

impl Default for ChartViewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 240.0,
            padding: 30.0,
        }
    }
}

/// Loss and accuracy polylines for one rendered frame.
#[derive(Clone, Debug, Default)]
pub struct ChartProjection {
    /// Loss curve, scaled to the observed loss range.
    pub loss: Vec<RenderPoint>,
    /// Accuracy curve, on a fixed `[0, 1]` scale.
    pub accuracy: Vec<RenderPoint>,
}

/// Project an already windowed and downsampled series onto the viewport.
///
/// X scales linearly over the observed step range; the loss Y axis scales to
/// the observed loss range while accuracy uses a fixed `[0, 1]` axis, each
/// clamped to the padded drawing area. Degenerate ranges (a single step, or
/// a flat loss curve) fall back to a unit span instead of dividing by zero.
pub fn project_series(points: &[MetricPoint], viewport: ChartViewport) -> ChartProjection {
    if points.is_empty() {
        return ChartProjection::default();
    }

    let x_min = points.iter().map(|p| p.step).min().unwrap_or(0) as f64;
    let x_max = points.iter().map(|p| p.step).max().unwrap_or(0) as f64;
    let y_min = points.iter().map(|p| p.loss).fold(f64::INFINITY, f64::min);
    let y_max = points
        .iter()
        .map(|p| p.loss)
        .fold(f64::NEG_INFINITY, f64::max);

    let x_span = non_zero(x_max - x_min);
    let y_span = non_zero(y_max - y_min);
    let inner_w = (viewport.width - 2.0 * viewport.padding) as f64;
    let inner_h = (viewport.height - 2.0 * viewport.padding) as f64;

    let x_of = |step: u64| viewport.padding as f64 + (step as f64 - x_min) / x_span * inner_w;
    let loss_y = |loss: f64| {
        (viewport.height - viewport.padding) as f64 - (loss - y_min) / y_span * inner_h
    };
    let accuracy_y = |accuracy: f64| {
        (viewport.height - viewport.padding) as f64 - accuracy.clamp(0.0, 1.0) * inner_h
    };

    ChartProjection {
        loss: points
            .iter()
            .map(|p| RenderPoint {
                x: x_of(p.step) as f32,
                y: loss_y(p.loss) as f32,
            })
            .collect(),
        accuracy: points
            .iter()
            .map(|p| RenderPoint {
                x: x_of(p.step) as f32,
                y: accuracy_y(p.accuracy) as f32,
            })
            .collect(),
    }
}

fn non_zero(span: f64) -> f64 {
    if span == 0.0 { 1.0 } else { span }
}
