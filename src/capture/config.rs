//! Session configuration file.
//!
//! Describes the camera, outputs and requests a session should be
//! configured with, in TOML.

use crate::request::RepeatingCaptureRequest;
use crate::types::{OutputType, PhotoOptions, SurfaceOutput};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Camera selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Platform camera identifier.
    pub camera_id: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            camera_id: "0".to_string(),
        }
    }
}

/// Demo run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Number of photos to take once the preview is running.
    pub photo_count: u32,
    /// Keep the preview running until interrupted.
    pub continuous: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            photo_count: 3,
            continuous: false,
        }
    }
}

/// Metrics exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Metrics server port (0 to disable).
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

fn default_outputs() -> Vec<SurfaceOutput> {
    vec![
        SurfaceOutput::new("preview", OutputType::Preview, 1920, 1080),
        SurfaceOutput::new("photo", OutputType::Photo, 4032, 3024),
    ]
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default = "default_outputs")]
    pub outputs: Vec<SurfaceOutput>,
    #[serde(default)]
    pub repeating: RepeatingCaptureRequest,
    #[serde(default)]
    pub photo: PhotoOptions,
    #[serde(default)]
    pub demo: DemoConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            outputs: default_outputs(),
            repeating: RepeatingCaptureRequest::default(),
            photo: PhotoOptions::default(),
            demo: DemoConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("camera id must not be empty")]
    EmptyCameraId,
    #[error("at least one output is required")]
    NoOutputs,
    #[error("duplicate output id: {0}")]
    DuplicateOutput(String),
    #[error("invalid output dimensions for {0}")]
    InvalidDimensions(String),
    #[error("zoom must be positive")]
    InvalidZoom,
    #[error("invalid frame rate (must be at least 1 fps)")]
    InvalidFrameRate,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    ///
    /// Only checks what can be checked without a device; format support is
    /// validated when the request is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.camera_id.trim().is_empty() {
            return Err(ConfigError::EmptyCameraId);
        }
        if self.outputs.is_empty() {
            return Err(ConfigError::NoOutputs);
        }
        let mut seen = HashSet::new();
        for output in &self.outputs {
            if !seen.insert(output.id.as_str()) {
                return Err(ConfigError::DuplicateOutput(output.id.clone()));
            }
            if output.width == 0 || output.height == 0 {
                return Err(ConfigError::InvalidDimensions(output.id.clone()));
            }
        }
        let zoom = self.repeating.base.zoom;
        if zoom.is_nan() || zoom <= 0.0 {
            return Err(ConfigError::InvalidZoom);
        }
        if self.repeating.fps == Some(0) {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}
