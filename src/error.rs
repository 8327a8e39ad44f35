//! Error types surfaced by the session and the request builders.

use crate::capture::PlatformError;
use crate::types::VideoStabilizationMode;
use thiserror::Error;

/// Errors returned by [`PersistentCaptureSession`](crate::PersistentCaptureSession)
/// and the capture request builders.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CameraError {
    #[error("failed to call {method}, session is not locked! Call with_configuration() first")]
    NotLocked { method: &'static str },
    #[error("camera is not ready yet")]
    NotReady,
    #[error("no camera device has been selected")]
    NoCameraDevice,
    #[error("cannot create a capture session without outputs")]
    NoOutputs,
    #[error("{0} fps is not supported by the selected format")]
    InvalidFps(u32),
    #[error("video stabilization mode {0} is not supported by the selected format")]
    InvalidVideoStabilizationMode(VideoStabilizationMode),
    #[error("`{0}` requires a format to be selected")]
    PropRequiresFormat(&'static str),
    #[error("this device does not have a flash unit")]
    FlashUnavailable,
    #[error("video HDR is not supported by the selected format")]
    InvalidVideoHdr,
    #[error("photo HDR is not supported by the selected format")]
    InvalidPhotoHdr,
    #[error("low-light boost is not supported by this device")]
    LowLightBoostNotSupported,
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl CameraError {
    /// Returns true for failures reported by the platform camera service.
    pub fn is_platform(&self) -> bool {
        matches!(self, Self::Platform(_))
    }
}
