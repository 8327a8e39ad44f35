//! Capture request descriptor and the shared parameter step.
//!
//! A [`CaptureRequest`] is a plain value: the backend translates it into
//! whatever its platform expects when it is submitted. Every specialised
//! request (repeating, photo) starts from [`CameraCaptureRequest`], which
//! targets the outputs and applies torch, zoom, exposure bias, video HDR
//! and low-light boost.

use crate::capture::CameraDevice;
use crate::error::CameraError;
use crate::types::{
    CameraDeviceDetails, CameraDeviceFormat, DigitalStabilizationMode, SurfaceOutput, Torch,
};
use serde::{Deserialize, Serialize};

/// Base template a request is created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Template {
    Preview,
    Record,
    StillCapture,
    VideoSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashMode {
    Off,
    Single,
    Torch,
}

/// Auto-exposure mode, including how the flash participates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AeMode {
    On,
    OnAutoFlash,
    OnAlwaysFlash,
    OnAutoFlashRedEye,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneMode {
    Hdr,
    Night,
}

/// Noise reduction / edge enhancement quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingMode {
    Fast,
    HighQuality,
}

/// Settings carried by a request. `None` leaves the template default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSettings {
    pub ae_target_fps_range: Option<(u32, u32)>,
    pub video_stabilization_mode: Option<DigitalStabilizationMode>,
    pub optical_stabilization: Option<bool>,
    pub flash_mode: Option<FlashMode>,
    pub ae_mode: Option<AeMode>,
    pub zoom_ratio: Option<f32>,
    pub exposure_compensation: Option<i32>,
    pub scene_mode: Option<SceneMode>,
    pub jpeg_quality: Option<u8>,
    pub jpeg_orientation: Option<u32>,
    pub noise_reduction: Option<ProcessingMode>,
    pub edge_mode: Option<ProcessingMode>,
}

/// A single capture request ready to be submitted to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub template: Template,
    /// Ids of the outputs this request renders into.
    pub targets: Vec<String>,
    pub settings: RequestSettings,
}

impl CaptureRequest {
    pub fn new(template: Template) -> Self {
        Self {
            template,
            targets: Vec::new(),
            settings: RequestSettings::default(),
        }
    }

    pub fn add_target(&mut self, output: &SurfaceOutput) {
        if !self.targets.iter().any(|id| id == &output.id) {
            self.targets.push(output.id.clone());
        }
    }
}

/// Parameters every capture request shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraCaptureRequest {
    pub torch: Torch,
    pub enable_video_hdr: bool,
    pub enable_low_light_boost: bool,
    pub exposure_bias: Option<f64>,
    pub zoom: f32,
    pub format: Option<CameraDeviceFormat>,
}

impl Default for CameraCaptureRequest {
    fn default() -> Self {
        Self {
            torch: Torch::Off,
            enable_video_hdr: false,
            enable_low_light_boost: false,
            exposure_bias: None,
            zoom: 1.0,
            format: None,
        }
    }
}

impl CameraCaptureRequest {
    /// Creates a request from `template` targeting `outputs` and applies
    /// the shared parameters.
    pub fn create_capture_request(
        &self,
        template: Template,
        device: &dyn CameraDevice,
        details: &CameraDeviceDetails,
        outputs: &[SurfaceOutput],
    ) -> Result<CaptureRequest, CameraError> {
        let mut request = device.create_capture_request(template)?;
        for output in outputs {
            request.add_target(output);
        }

        if self.enable_video_hdr {
            let format = self
                .format
                .as_ref()
                .ok_or(CameraError::PropRequiresFormat("videoHdr"))?;
            if !format.supports_video_hdr {
                return Err(CameraError::InvalidVideoHdr);
            }
            request.settings.scene_mode = Some(SceneMode::Hdr);
        }

        if self.enable_low_light_boost {
            if !details.supports_low_light_boost {
                return Err(CameraError::LowLightBoostNotSupported);
            }
            request.settings.scene_mode = Some(SceneMode::Night);
        }

        if let Some(bias) = self.exposure_bias {
            request.settings.exposure_compensation = Some(details.clamp_exposure(bias));
        }

        request.settings.zoom_ratio = Some(details.clamp_zoom(self.zoom));

        if self.torch == Torch::On {
            if !details.has_flash {
                return Err(CameraError::FlashUnavailable);
            }
            request.settings.flash_mode = Some(FlashMode::Torch);
        }

        Ok(request)
    }
}
