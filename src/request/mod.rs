//! Capture request construction.
//!
//! Requests are rebuilt from declarative options every time they are
//! needed, against the device and outputs that are live at that moment.

mod builder;
mod photo;
mod repeating;

pub use builder::{
    AeMode, CameraCaptureRequest, CaptureRequest, FlashMode, ProcessingMode, RequestSettings,
    SceneMode, Template,
};
pub use photo::PhotoCaptureRequest;
pub use repeating::RepeatingCaptureRequest;
