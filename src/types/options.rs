//! Declarative capture options supplied by the caller.
//!
//! These are plain values; the request builders translate them into
//! concrete capture request settings for a particular device.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Torch (continuous flash) state for the repeating request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Torch {
    #[default]
    Off,
    On,
}

/// Flash mode for a still capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flash {
    #[default]
    Off,
    On,
    Auto,
}

/// Video stabilization requested for the repeating request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoStabilizationMode {
    #[default]
    Off,
    Standard,
    Cinematic,
    CinematicExtended,
}

impl fmt::Display for VideoStabilizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::Standard => "standard",
            Self::Cinematic => "cinematic",
            Self::CinematicExtended => "cinematic-extended",
        };
        f.write_str(name)
    }
}

/// Trade-off between capture latency and image quality for photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityPrioritization {
    Speed,
    #[default]
    Balanced,
    Quality,
}

/// Output orientation of a still capture, relative to the device's
/// natural (portrait) orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    #[default]
    Portrait,
    LandscapeRight,
    PortraitUpsideDown,
    LandscapeLeft,
}

impl Orientation {
    /// Clockwise rotation in degrees.
    pub fn degrees(self) -> u32 {
        match self {
            Self::Portrait => 0,
            Self::LandscapeRight => 90,
            Self::PortraitUpsideDown => 180,
            Self::LandscapeLeft => 270,
        }
    }

    /// Rotation relative to a sensor mounted at `sensor_orientation` degrees.
    pub fn relative_to_sensor(self, sensor_orientation: u32) -> u32 {
        (sensor_orientation % 360 + self.degrees()) % 360
    }
}

/// Per-photo options layered on top of the repeating request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoOptions {
    pub quality_prioritization: QualityPrioritization,
    pub flash: Flash,
    pub enable_red_eye_reduction: bool,
    pub enable_auto_stabilization: bool,
    pub enable_photo_hdr: bool,
    pub orientation: Orientation,
    pub enable_shutter_sound: bool,
}

impl Default for PhotoOptions {
    fn default() -> Self {
        Self {
            quality_prioritization: QualityPrioritization::Balanced,
            flash: Flash::Off,
            enable_red_eye_reduction: false,
            enable_auto_stabilization: false,
            enable_photo_hdr: false,
            orientation: Orientation::Portrait,
            enable_shutter_sound: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_relative_to_sensor() {
        assert_eq!(Orientation::Portrait.relative_to_sensor(90), 90);
        assert_eq!(Orientation::LandscapeLeft.relative_to_sensor(90), 0);
        assert_eq!(Orientation::PortraitUpsideDown.relative_to_sensor(270), 90);
        // out-of-range sensor values wrap instead of overflowing
        assert_eq!(Orientation::LandscapeLeft.relative_to_sensor(u32::MAX), 165);
    }

    #[test]
    fn test_stabilization_mode_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: VideoStabilizationMode,
        }
        let parsed: Wrapper = toml::from_str("mode = \"cinematic-extended\"").unwrap();
        assert_eq!(parsed.mode, VideoStabilizationMode::CinematicExtended);
    }
}
