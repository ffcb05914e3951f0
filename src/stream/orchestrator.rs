//! Session-level coordination of the per-channel connection managers.

use std::time::Instant;

use rand::Rng;

use crate::api::{self, ApiError, TrainParams};
use crate::config::DashboardConfig;
use crate::metrics::{self, MetricPoint, RollingWindow};
use crate::stream::manager::{ConnectionManager, StreamConfig};
use crate::stream::payload::{self, ACTIVATION_CELLS};
use crate::stream::transport::{TransportFactory, TransportKind, TransportTarget};
use crate::stream::ReconnectPolicy;

/// Owns one connection manager per logical channel and the stores their
/// payloads feed: the metric rolling window, the activation grid and the
/// layer activity level.
pub struct StreamOrchestrator {
    base: String,
    window_size: usize,
    max_points: usize,
    metrics: ConnectionManager,
    activations: ConnectionManager,
    layers: ConnectionManager,
    buffer: RollingWindow,
    activation_cells: Vec<f32>,
    layer_activity: f32,
}

impl StreamOrchestrator {
    /// Build the orchestrator for a resolved API base. Channel URLs derive
    /// from the configured paths; the metrics channel prefers the push
    /// stream with the socket as fallback, the snapshot channels are
    /// push-only.
    pub fn new(config: &DashboardConfig, base: &str) -> Self {
        let metrics_targets = vec![
            TransportTarget {
                kind: TransportKind::Push,
                url: api::join_path(base, &config.metrics_stream_path),
            },
            TransportTarget {
                kind: TransportKind::Socket,
                url: api::join_path(&api::websocket_base(base), &config.metrics_socket_path),
            },
        ];
        let activations_targets = vec![TransportTarget {
            kind: TransportKind::Push,
            url: api::join_path(base, &config.activations_stream_path),
        }];
        let layers_targets = vec![TransportTarget {
            kind: TransportKind::Push,
            url: api::join_path(base, &config.layers_stream_path),
        }];

        let manager = |name, targets| {
            ConnectionManager::new(
                name,
                StreamConfig {
                    targets,
                    auto_reconnect: config.auto_reconnect,
                },
                ReconnectPolicy::new(),
            )
        };

        let mut rng = rand::rng();
        Self {
            base: base.to_string(),
            window_size: config.window_size,
            max_points: config.max_points,
            metrics: manager("metrics", metrics_targets),
            activations: manager("activations", activations_targets),
            layers: manager("layers", layers_targets),
            buffer: RollingWindow::new(),
            activation_cells: (0..ACTIVATION_CELLS).map(|_| rng.random_range(0.0..1.0)).collect(),
            layer_activity: 0.4,
        }
    }

    /// Start a training session: tear down any previous streams, reseed the
    /// chart buffer, submit the start-training request, then open all
    /// channels. A request failure leaves the streams closed; once the
    /// request succeeds each channel opens independently, so one failing
    /// channel never blocks the others.
    pub fn start_session(
        &mut self,
        factory: &dyn TransportFactory,
        now: Instant,
        params: &TrainParams,
    ) -> Result<(), ApiError> {
        self.stop_session();
        self.buffer.reset(&metrics::demo_series());
        api::start_training(&self.base, params)?;
        self.open_channels(factory, now);
        Ok(())
    }

    /// Open every channel. Each manager handles its own failures through
    /// the reconnect path.
    pub fn open_channels(&mut self, factory: &dyn TransportFactory, now: Instant) {
        self.metrics.open(factory, now);
        self.activations.open(factory, now);
        self.layers.open(factory, now);
    }

    /// Stop every channel. Buffer contents stay intact for display until
    /// the next session reset.
    pub fn stop_session(&mut self) {
        self.metrics.stop();
        self.activations.stop();
        self.layers.stop();
    }

    /// Drain transport events on all channels and route decoded payloads to
    /// their per-channel stores.
    pub fn poll(&mut self, factory: &dyn TransportFactory, now: Instant) {
        let Self {
            metrics,
            activations,
            layers,
            buffer,
            activation_cells,
            layer_activity,
            ..
        } = self;

        metrics.poll(factory, now, &mut |value| {
            if let Some(sample) = metrics::normalize(value, buffer.len()) {
                buffer.append(sample);
            }
        });
        activations.poll(factory, now, &mut |value| {
            if let Some(snapshot) = payload::decode_activation_snapshot(value) {
                activation_cells.copy_from_slice(&snapshot.cells);
                if let Some(activity) = snapshot.activity {
                    *layer_activity = activity;
                }
            }
        });
        layers.poll(factory, now, &mut |value| {
            if let Some(activity) = payload::decode_layer_activity(value) {
                *layer_activity = activity;
            }
        });
    }

    /// Enable or disable auto-reconnect on every channel; disabling cancels
    /// pending reconnects immediately.
    pub fn set_auto_reconnect(&mut self, enabled: bool) {
        self.metrics.set_auto_reconnect(enabled);
        self.activations.set_auto_reconnect(enabled);
        self.layers.set_auto_reconnect(enabled);
    }

    /// The windowed, downsampled series ready for projection.
    pub fn render_series(&self) -> Vec<MetricPoint> {
        metrics::downsample(&self.buffer.windowed(self.window_size), self.max_points)
    }

    /// Metric history buffer.
    pub fn buffer(&self) -> &RollingWindow {
        &self.buffer
    }

    /// Latest activation grid, exactly [`ACTIVATION_CELLS`] values.
    pub fn activation_cells(&self) -> &[f32] {
        &self.activation_cells
    }

    /// Latest layer activity level in `[0, 1]`.
    pub fn layer_activity(&self) -> f32 {
        self.layer_activity
    }

    /// Metrics channel manager (state and status inspection).
    pub fn metrics_channel(&self) -> &ConnectionManager {
        &self.metrics
    }

    /// Activations channel manager.
    pub fn activations_channel(&self) -> &ConnectionManager {
        &self.activations
    }

    /// Layers channel manager.
    pub fn layers_channel(&self) -> &ConnectionManager {
        &self.layers
    }

    /// One status line per channel, most interesting first.
    pub fn status_lines(&self) -> Vec<String> {
        vec![
            self.metrics.status().to_string(),
            self.activations.status().to_string(),
            self.layers.status().to_string(),
        ]
    }
}
