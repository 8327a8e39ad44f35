//! Device capabilities and formats.
//!
//! Both types are read-only snapshots produced by the platform's device
//! enumeration. The session only reads them to validate requests.

use super::VideoStabilizationMode;
use serde::{Deserialize, Serialize};

/// Digital video stabilization constants a device may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigitalStabilizationMode {
    Off,
    On,
    /// Stabilizes the preview stream as well as the recorded one.
    PreviewStabilization,
}

/// Capability snapshot of a single camera device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDeviceDetails {
    /// Platform identifier of the camera.
    pub camera_id: String,
    /// Digital stabilization modes the device supports.
    pub digital_stabilization_modes: Vec<DigitalStabilizationMode>,
    /// Whether optical image stabilization is available.
    pub supports_optical_stabilization: bool,
    /// Whether the device has a flash unit.
    pub has_flash: bool,
    /// Zoom ratio range as `(min, max)`.
    pub zoom_range: (f32, f32),
    /// Exposure compensation range in steps as `(min, max)`.
    pub exposure_range: (i32, i32),
    /// Sensor mounting orientation in degrees.
    pub sensor_orientation: u32,
    /// Whether a night/low-light scene mode is available.
    pub supports_low_light_boost: bool,
}

impl CameraDeviceDetails {
    /// Creates a snapshot with conservative defaults for `camera_id`.
    pub fn new(camera_id: impl Into<String>) -> Self {
        Self {
            camera_id: camera_id.into(),
            digital_stabilization_modes: vec![DigitalStabilizationMode::Off],
            supports_optical_stabilization: false,
            has_flash: false,
            zoom_range: (1.0, 1.0),
            exposure_range: (0, 0),
            sensor_orientation: 90,
            supports_low_light_boost: false,
        }
    }

    /// Picks the strongest digital stabilization the device supports.
    pub fn best_digital_stabilization_mode(&self) -> DigitalStabilizationMode {
        if self
            .digital_stabilization_modes
            .contains(&DigitalStabilizationMode::PreviewStabilization)
        {
            DigitalStabilizationMode::PreviewStabilization
        } else {
            DigitalStabilizationMode::On
        }
    }

    /// Clamps a requested zoom ratio into the supported range.
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        let (min, max) = self.zoom_range;
        zoom.clamp(min, max.max(min))
    }

    /// Rounds and clamps an exposure bias into the compensation range.
    pub fn clamp_exposure(&self, bias: f64) -> i32 {
        let (min, max) = self.exposure_range;
        (bias.round() as i32).clamp(min, max.max(min))
    }
}

/// A device format selected by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDeviceFormat {
    pub min_fps: u32,
    pub max_fps: u32,
    pub video_stabilization_modes: Vec<VideoStabilizationMode>,
    pub supports_video_hdr: bool,
    pub supports_photo_hdr: bool,
}

impl Default for CameraDeviceFormat {
    fn default() -> Self {
        Self {
            min_fps: 1,
            max_fps: 30,
            video_stabilization_modes: vec![VideoStabilizationMode::Off],
            supports_video_hdr: false,
            supports_photo_hdr: false,
        }
    }
}

impl CameraDeviceFormat {
    pub fn supports_stabilization(&self, mode: VideoStabilizationMode) -> bool {
        self.video_stabilization_modes.contains(&mode)
    }
}
