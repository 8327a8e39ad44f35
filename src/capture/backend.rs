//! Platform camera abstraction.
//!
//! The session never talks to camera hardware directly. A platform binding
//! (for example one built on the Android NDK `ACameraManager` API)
//! implements these traits, and [`MockBackend`](super::MockBackend) implements
//! them in-process for tests and the demo binary.
//!
//! Closure notifications are delivered through the handlers passed to
//! [`CameraBackend::open_camera`] and [`CameraDevice::create_capture_session`].
//! Implementations may invoke them from any thread, at any time, including
//! while an open or create call is still in flight.

use super::CaptureResult;
use crate::request::{CaptureRequest, Template};
use crate::types::{CameraDeviceDetails, SurfaceOutput};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failures reported by the platform camera service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("camera device is disconnected")]
    Disconnected,
    #[error("camera device is already in use")]
    InUse,
    #[error("maximum number of open cameras reached")]
    MaxCamerasInUse,
    #[error("camera is disabled by device policy")]
    Disabled,
    #[error("camera device encountered a fatal error")]
    Device,
    #[error("camera service encountered a fatal error")]
    Service,
    #[error("capture was aborted")]
    CaptureAborted,
    #[error("camera access failed: {0}")]
    Access(String),
}

/// Called once when a device closes. Carries the error that caused the
/// closure, if any.
pub type DeviceClosedHandler = Arc<dyn Fn(Option<PlatformError>) + Send + Sync>;

/// Called once when a capture session closes.
pub type SessionClosedHandler = Arc<dyn Fn() + Send + Sync>;

/// Entry point of a platform camera service.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Opens the camera `camera_id`. `on_closed` fires when the device is
    /// closed, whether by [`CameraDevice::close`] or by the platform.
    async fn open_camera(
        &self,
        camera_id: &str,
        on_closed: DeviceClosedHandler,
    ) -> Result<Arc<dyn CameraDevice>, PlatformError>;

    /// Reads the capability snapshot of `camera_id`.
    fn device_details(&self, camera_id: &str) -> Result<CameraDeviceDetails, PlatformError>;
}

/// An open camera device.
#[async_trait]
pub trait CameraDevice: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    /// False once the device has been closed by anyone.
    fn is_valid(&self) -> bool;

    /// Closes the device and, with it, any session created from it.
    fn close(&self);

    /// Creates an empty request for `template`.
    fn create_capture_request(&self, template: Template) -> Result<CaptureRequest, PlatformError> {
        Ok(CaptureRequest::new(template))
    }

    /// Creates a session rendering into `outputs`. Creating a new session
    /// closes the previous one of this device.
    async fn create_capture_session(
        &self,
        outputs: &[SurfaceOutput],
        on_closed: SessionClosedHandler,
    ) -> Result<Arc<dyn CaptureSession>, PlatformError>;
}

/// A configured capture session.
#[async_trait]
pub trait CaptureSession: Send + Sync + fmt::Debug {
    /// Id of the device the session belongs to.
    fn device_id(&self) -> &str;

    /// Aborts in-flight captures, ignoring failures.
    fn try_abort_captures(&self);

    fn close(&self);

    fn set_repeating_request(&self, request: &CaptureRequest) -> Result<(), PlatformError>;

    fn stop_repeating(&self) -> Result<(), PlatformError>;

    /// Submits `request` once and waits for its result.
    async fn capture(
        &self,
        request: &CaptureRequest,
        enable_shutter_sound: bool,
    ) -> Result<CaptureResult, PlatformError>;
}
