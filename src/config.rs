//! Persisted dashboard settings (`config.toml` under the app root).
//!
//! Load-or-default semantics: a missing file yields the defaults, a present
//! file is parsed strictly but with serde defaults per field so older
//! configs keep working as settings are added.

use std::{fs, io, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::TrainParams;
use crate::app_dirs;
use crate::metrics::DEFAULT_WINDOW_SIZE;

/// Smallest accepted rolling-window and plot-budget sizes; values below are
/// clamped up so the chart never degenerates.
const MIN_CHART_POINTS: usize = 50;
/// Default cap on points handed to the renderer per frame.
pub const DEFAULT_MAX_POINTS: usize = 200;

/// Errors that can occur while loading or saving the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The app directory could not be resolved or created.
    #[error(transparent)]
    AppDir(#[from] app_dirs::AppDirError),
    /// The settings file exists but could not be read or written.
    #[error("Failed to access settings file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    /// The settings file is not valid TOML for this schema.
    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// The settings could not be serialized (should not happen in practice).
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// All persisted dashboard settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Explicit API base override; highest priority in base resolution.
    pub api_base: Option<String>,
    /// Push-stream path for training metrics.
    pub metrics_stream_path: String,
    /// Socket path for training metrics (fallback transport).
    pub metrics_socket_path: String,
    /// Push-stream path for activation snapshots.
    pub activations_stream_path: String,
    /// Push-stream path for layer activity.
    pub layers_stream_path: String,
    /// Whether broken streams reconnect automatically.
    pub auto_reconnect: bool,
    /// Rolling window size exposed to the renderer.
    pub window_size: usize,
    /// Maximum plotted points per frame.
    pub max_points: usize,
    /// Hyperparameters last used for start-training.
    pub train: TrainParams,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            metrics_stream_path: "/train/stream".to_string(),
            metrics_socket_path: "/train/ws".to_string(),
            activations_stream_path: "/activations/stream".to_string(),
            layers_stream_path: "/layers/stream".to_string(),
            auto_reconnect: true,
            window_size: DEFAULT_WINDOW_SIZE,
            max_points: DEFAULT_MAX_POINTS,
            train: TrainParams::default(),
        }
    }
}

impl DashboardConfig {
    /// Clamp chart sizes to their minimums, mirroring what the UI inputs
    /// enforce.
    pub fn clamped(mut self) -> Self {
        self.window_size = self.window_size.max(MIN_CHART_POINTS);
        self.max_points = self.max_points.max(MIN_CHART_POINTS);
        self
    }
}

/// Load the settings file, falling back to defaults when it does not exist.
pub fn load_or_default() -> Result<DashboardConfig, ConfigError> {
    let path = app_dirs::config_file()?;
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(DashboardConfig::default());
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };
    let config: DashboardConfig =
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
    Ok(config.clamped())
}

/// Persist the settings file.
pub fn save(config: &DashboardConfig) -> Result<(), ConfigError> {
    let path = app_dirs::config_file()?;
    let text = toml::to_string_pretty(config)?;
    fs::write(&path, text).map_err(|source| ConfigError::Io { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_conventions() {
        let config = DashboardConfig::default();
        assert_eq!(config.metrics_stream_path, "/train/stream");
        assert_eq!(config.metrics_socket_path, "/train/ws");
        assert_eq!(config.window_size, 400);
        assert_eq!(config.max_points, 200);
        assert!(config.auto_reconnect);
        assert_eq!(config.api_base, None);
    }

    #[test]
    fn toml_round_trip_preserves_settings() {
        let mut config = DashboardConfig::default();
        config.api_base = Some("http://127.0.0.1:9090".to_string());
        config.auto_reconnect = false;
        config.train.epochs = 42;

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: DashboardConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_file_fills_missing_fields_with_defaults() {
        let parsed: DashboardConfig = toml::from_str("window_size = 600\n").unwrap();
        assert_eq!(parsed.window_size, 600);
        assert_eq!(parsed.max_points, DEFAULT_MAX_POINTS);
        assert!(parsed.auto_reconnect);
    }

    #[test]
    fn clamped_enforces_chart_minimums() {
        let mut config = DashboardConfig::default();
        config.window_size = 1;
        config.max_points = 0;
        let config = config.clamped();
        assert_eq!(config.window_size, MIN_CHART_POINTS);
        assert_eq!(config.max_points, MIN_CHART_POINTS);
    }
}
