//! Training metric ingestion and presentation.
//!
//! Raw stream messages are normalized into [`MetricSample`]s, stored in a
//! [`RollingWindow`], and projected for rendering through [`downsample`] and
//! the chart projection helpers.

mod chart;
mod downsample;
mod sample;
mod window;

pub use chart::{ChartProjection, ChartViewport, RenderPoint, project_series};
pub use downsample::downsample;
pub use sample::{MetricSample, normalize};
pub use window::{DEFAULT_WINDOW_SIZE, MetricPoint, RollingWindow, demo_series};
