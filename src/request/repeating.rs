//! The repeating (preview / record) request.

use super::builder::{CameraCaptureRequest, CaptureRequest, Template};
use crate::capture::CameraDevice;
use crate::error::CameraError;
use crate::types::{CameraDeviceDetails, SurfaceOutput, VideoStabilizationMode};
use serde::{Deserialize, Serialize};

/// Declarative description of the request the session keeps resubmitting.
///
/// This is recorded as-is on the session and turned into a concrete
/// [`CaptureRequest`] on every reconcile pass, against whatever device is
/// open at that moment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatingCaptureRequest {
    /// Use the record template instead of the preview one.
    pub enable_video_pipeline: bool,
    /// Fixed target frame rate.
    pub fps: Option<u32>,
    pub video_stabilization_mode: VideoStabilizationMode,
    #[serde(flatten)]
    pub base: CameraCaptureRequest,
}

impl RepeatingCaptureRequest {
    pub fn new(enable_video_pipeline: bool) -> Self {
        Self {
            enable_video_pipeline,
            ..Default::default()
        }
    }

    /// Template implied by the pipeline flag.
    pub fn template(&self) -> Template {
        if self.enable_video_pipeline {
            Template::Record
        } else {
            Template::Preview
        }
    }

    /// Builds the repeating request for `outputs`.
    pub fn create_capture_request(
        &self,
        device: &dyn CameraDevice,
        details: &CameraDeviceDetails,
        outputs: &[SurfaceOutput],
    ) -> Result<CaptureRequest, CameraError> {
        self.create_capture_request_with_template(self.template(), device, details, outputs)
    }

    /// Builds the request from an explicit template. Photo requests use
    /// this to inherit the repeating parameters.
    pub fn create_capture_request_with_template(
        &self,
        template: Template,
        device: &dyn CameraDevice,
        details: &CameraDeviceDetails,
        outputs: &[SurfaceOutput],
    ) -> Result<CaptureRequest, CameraError> {
        let mut request = self
            .base
            .create_capture_request(template, device, details, outputs)?;

        if let Some(fps) = self.fps {
            let format = self
                .base
                .format
                .as_ref()
                .ok_or(CameraError::PropRequiresFormat("fps"))?;
            if format.max_fps < fps {
                return Err(CameraError::InvalidFps(fps));
            }
            request.settings.ae_target_fps_range = Some((fps, fps));
        }

        let mode = self.video_stabilization_mode;
        if mode != VideoStabilizationMode::Off {
            let format = self
                .base
                .format
                .as_ref()
                .ok_or(CameraError::PropRequiresFormat("videoStabilizationMode"))?;
            if !format.supports_stabilization(mode) {
                return Err(CameraError::InvalidVideoStabilizationMode(mode));
            }
        }
        match mode {
            VideoStabilizationMode::Off => {}
            VideoStabilizationMode::Standard => {
                request.settings.video_stabilization_mode =
                    Some(details.best_digital_stabilization_mode());
            }
            VideoStabilizationMode::Cinematic | VideoStabilizationMode::CinematicExtended => {
                request.settings.optical_stabilization = Some(true);
            }
        }

        Ok(request)
    }
}
