//! Value types shared between the caller, the request builders and the
//! platform backend.

mod device;
mod options;
mod output;

pub use device::{CameraDeviceDetails, CameraDeviceFormat, DigitalStabilizationMode};
pub use options::{
    Flash, Orientation, PhotoOptions, QualityPrioritization, Torch, VideoStabilizationMode,
};
pub use output::{OutputType, SurfaceOutput};
