//! One-shot still capture request.

use super::builder::{AeMode, CaptureRequest, FlashMode, ProcessingMode, SceneMode, Template};
use super::repeating::RepeatingCaptureRequest;
use crate::capture::CameraDevice;
use crate::error::CameraError;
use crate::types::{CameraDeviceDetails, Flash, PhotoOptions, QualityPrioritization, SurfaceOutput};

/// A still capture that inherits everything from the current repeating
/// request and layers the photo options on top.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoCaptureRequest<'a> {
    repeating: &'a RepeatingCaptureRequest,
    options: &'a PhotoOptions,
}

impl<'a> PhotoCaptureRequest<'a> {
    pub fn new(repeating: &'a RepeatingCaptureRequest, options: &'a PhotoOptions) -> Self {
        Self { repeating, options }
    }

    fn template(&self) -> Template {
        // A full still capture would interrupt an ongoing recording.
        if self.repeating.enable_video_pipeline {
            Template::VideoSnapshot
        } else {
            Template::StillCapture
        }
    }

    /// Builds the still request for all `outputs`.
    pub fn create_capture_request(
        &self,
        device: &dyn CameraDevice,
        details: &CameraDeviceDetails,
        outputs: &[SurfaceOutput],
    ) -> Result<CaptureRequest, CameraError> {
        let mut request = self.repeating.create_capture_request_with_template(
            self.template(),
            device,
            details,
            outputs,
        )?;
        let options = self.options;
        let settings = &mut request.settings;

        let (jpeg_quality, processing) = match options.quality_prioritization {
            QualityPrioritization::Speed => (85, ProcessingMode::Fast),
            QualityPrioritization::Balanced => (92, ProcessingMode::HighQuality),
            QualityPrioritization::Quality => (100, ProcessingMode::HighQuality),
        };
        settings.jpeg_quality = Some(jpeg_quality);
        settings.noise_reduction = Some(processing);
        settings.edge_mode = Some(processing);

        if options.flash != Flash::Off && !details.has_flash {
            return Err(CameraError::FlashUnavailable);
        }
        match options.flash {
            Flash::Off => {
                settings.ae_mode = Some(AeMode::On);
                // keep the torch lit if the repeating request turned it on
                if settings.flash_mode != Some(FlashMode::Torch) {
                    settings.flash_mode = Some(FlashMode::Off);
                }
            }
            Flash::On => {
                settings.ae_mode = Some(AeMode::OnAlwaysFlash);
                settings.flash_mode = Some(FlashMode::Single);
            }
            Flash::Auto => {
                settings.ae_mode = Some(if options.enable_red_eye_reduction {
                    AeMode::OnAutoFlashRedEye
                } else {
                    AeMode::OnAutoFlash
                });
            }
        }

        if options.enable_auto_stabilization && details.supports_optical_stabilization {
            settings.optical_stabilization = Some(true);
        }

        if options.enable_photo_hdr {
            let supported = self
                .repeating
                .base
                .format
                .as_ref()
                .map(|format| format.supports_photo_hdr)
                .unwrap_or(false);
            if !supported {
                return Err(CameraError::InvalidPhotoHdr);
            }
            settings.scene_mode = Some(SceneMode::Hdr);
        }

        settings.jpeg_orientation = Some(
            options
                .orientation
                .relative_to_sensor(details.sensor_orientation),
        );

        Ok(request)
    }
}
