//! In-process camera backend for testing.
//!
//! Mirrors the closure semantics of a real camera service: closing a device
//! closes its session, creating a session closes the previous one, and
//! closure handlers fire synchronously from whichever call caused them.
//! Faults can be armed to simulate the platform tearing things down while
//! the session is being configured.

use super::backend::{
    CameraBackend, CameraDevice, CaptureSession, DeviceClosedHandler, PlatformError,
    SessionClosedHandler,
};
use super::CaptureResult;
use crate::request::CaptureRequest;
use crate::types::{CameraDeviceDetails, DigitalStabilizationMode, SurfaceOutput};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// Something the mock backend observed.
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    DeviceOpened { camera_id: String },
    DeviceClosed { camera_id: String },
    SessionCreated { camera_id: String, outputs: Vec<String> },
    SessionClosed { camera_id: String },
    CapturesAborted { camera_id: String },
    RepeatingStarted { camera_id: String, request: CaptureRequest },
    RepeatingStopped { camera_id: String },
    Captured { camera_id: String, request: CaptureRequest },
}

#[derive(Debug, Default)]
struct Faults {
    fail_open: Option<PlatformError>,
    open_delay: Option<Duration>,
    destroy_during_session_create: bool,
    fail_repeating: Option<(PlatformError, bool)>,
}

#[derive(Default)]
struct MockState {
    cameras: HashMap<String, CameraDeviceDetails>,
    devices: Vec<Arc<MockDevice>>,
    events: Vec<MockEvent>,
    faults: Faults,
    frame_number: u64,
}

type SharedState = Arc<Mutex<MockState>>;

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn record(state: &Weak<Mutex<MockState>>, event: MockEvent) {
    if let Some(state) = state.upgrade() {
        lock(&state).events.push(event);
    }
}

/// Mock camera service with a fixed set of cameras.
#[derive(Clone)]
pub struct MockBackend {
    state: SharedState,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Creates a backend with a back camera `"0"` and a front camera `"1"`.
    pub fn new() -> Self {
        let mut back = CameraDeviceDetails::new("0");
        back.digital_stabilization_modes = vec![
            DigitalStabilizationMode::Off,
            DigitalStabilizationMode::On,
            DigitalStabilizationMode::PreviewStabilization,
        ];
        back.supports_optical_stabilization = true;
        back.has_flash = true;
        back.zoom_range = (1.0, 10.0);
        back.exposure_range = (-12, 12);
        back.supports_low_light_boost = true;

        let mut front = CameraDeviceDetails::new("1");
        front.zoom_range = (1.0, 4.0);
        front.exposure_range = (-6, 6);
        front.sensor_orientation = 270;

        Self::with_cameras([back, front])
    }

    /// Creates a backend exposing exactly `cameras`.
    pub fn with_cameras(cameras: impl IntoIterator<Item = CameraDeviceDetails>) -> Self {
        let state = MockState {
            cameras: cameras
                .into_iter()
                .map(|details| (details.camera_id.clone(), details))
                .collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Everything observed so far.
    pub fn events(&self) -> Vec<MockEvent> {
        lock(&self.state).events.clone()
    }

    pub fn clear_events(&self) {
        lock(&self.state).events.clear();
    }

    /// Number of observed events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&MockEvent) -> bool) -> usize {
        lock(&self.state).events.iter().filter(|e| predicate(e)).count()
    }

    /// Number of times a device has been opened.
    pub fn open_count(&self) -> usize {
        self.count(|e| matches!(e, MockEvent::DeviceOpened { .. }))
    }

    /// Number of sessions created so far.
    pub fn session_count(&self) -> usize {
        self.count(|e| matches!(e, MockEvent::SessionCreated { .. }))
    }

    fn device(&self, camera_id: &str) -> Option<Arc<MockDevice>> {
        lock(&self.state)
            .devices
            .iter()
            .find(|d| d.id == camera_id && d.is_valid())
            .cloned()
    }

    pub fn is_device_open(&self, camera_id: &str) -> bool {
        self.device(camera_id).is_some()
    }

    /// True if `camera_id` is open and has a live session.
    pub fn has_session(&self, camera_id: &str) -> bool {
        self.device(camera_id)
            .and_then(|d| d.current_session())
            .is_some()
    }

    /// The request currently repeating on `camera_id`, if any.
    pub fn repeating_request(&self, camera_id: &str) -> Option<CaptureRequest> {
        self.device(camera_id)
            .and_then(|d| d.current_session())
            .and_then(|s| s.repeating.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Simulates the platform closing `camera_id`, for example because
    /// another client took it over.
    pub fn disconnect(&self, camera_id: &str, error: Option<PlatformError>) {
        if let Some(device) = self.device(camera_id) {
            device.shutdown(error);
        }
    }

    /// Simulates the platform closing the session of `camera_id` while
    /// leaving the device open.
    pub fn close_session(&self, camera_id: &str) {
        if let Some(session) = self.device(camera_id).and_then(|d| d.current_session()) {
            session.close();
        }
    }

    /// Makes the next `open_camera` call fail with `error`.
    pub fn fail_next_open(&self, error: PlatformError) {
        lock(&self.state).faults.fail_open = Some(error);
    }

    /// Makes the next `open_camera` call wait `delay` before opening.
    pub fn delay_next_open(&self, delay: Duration) {
        lock(&self.state).faults.open_delay = Some(delay);
    }

    /// Makes the next session creation succeed, then disconnect its device
    /// before returning.
    pub fn destroy_during_next_session_create(&self) {
        lock(&self.state).faults.destroy_during_session_create = true;
    }

    /// Makes the next `set_repeating_request` fail with `error`. With
    /// `disconnect` set, the device is disconnected before the call fails.
    pub fn fail_next_repeating(&self, error: PlatformError, disconnect: bool) {
        lock(&self.state).faults.fail_repeating = Some((error, disconnect));
    }
}

#[async_trait]
impl CameraBackend for MockBackend {
    async fn open_camera(
        &self,
        camera_id: &str,
        on_closed: DeviceClosedHandler,
    ) -> Result<Arc<dyn CameraDevice>, PlatformError> {
        let delay = lock(&self.state).faults.open_delay.take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = lock(&self.state);
        if let Some(error) = state.faults.fail_open.take() {
            return Err(error);
        }
        if !state.cameras.contains_key(camera_id) {
            return Err(PlatformError::Access(format!("unknown camera {camera_id}")));
        }

        let device = Arc::new(MockDevice {
            id: camera_id.to_string(),
            valid: AtomicBool::new(true),
            on_closed: Some(on_closed),
            session: Mutex::new(None),
            backend: Arc::downgrade(&self.state),
        });
        state.devices.retain(|d| d.is_valid());
        state.devices.push(Arc::clone(&device));
        state.events.push(MockEvent::DeviceOpened {
            camera_id: camera_id.to_string(),
        });
        tracing::debug!(camera_id, "MockBackend opened device");
        Ok(device)
    }

    fn device_details(&self, camera_id: &str) -> Result<CameraDeviceDetails, PlatformError> {
        lock(&self.state)
            .cameras
            .get(camera_id)
            .cloned()
            .ok_or_else(|| PlatformError::Access(format!("unknown camera {camera_id}")))
    }
}

/// A device handed out by [`MockBackend`].
pub struct MockDevice {
    id: String,
    valid: AtomicBool,
    on_closed: Option<DeviceClosedHandler>,
    session: Mutex<Option<Arc<MockSession>>>,
    backend: Weak<Mutex<MockState>>,
}

impl MockDevice {
    /// A device not attached to any backend, for building requests.
    pub fn detached(camera_id: impl Into<String>) -> Self {
        Self {
            id: camera_id.into(),
            valid: AtomicBool::new(true),
            on_closed: None,
            session: Mutex::new(None),
            backend: Weak::new(),
        }
    }

    fn current_session(&self) -> Option<Arc<MockSession>> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|s| s.is_valid())
    }

    fn shutdown(&self, error: Option<PlatformError>) {
        if !self.valid.swap(false, Ordering::SeqCst) {
            return;
        }
        let session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(session) = session {
            session.close();
        }
        record(
            &self.backend,
            MockEvent::DeviceClosed {
                camera_id: self.id.clone(),
            },
        );
        if let Some(on_closed) = &self.on_closed {
            on_closed(error);
        }
    }
}

impl std::fmt::Debug for MockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDevice")
            .field("id", &self.id)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl std::fmt::Debug for MockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockState")
            .field("cameras", &self.cameras.len())
            .field("events", &self.events.len())
            .finish()
    }
}

#[async_trait]
impl CameraDevice for MockDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.shutdown(None);
    }

    async fn create_capture_session(
        &self,
        outputs: &[SurfaceOutput],
        on_closed: SessionClosedHandler,
    ) -> Result<Arc<dyn CaptureSession>, PlatformError> {
        if !self.is_valid() {
            return Err(PlatformError::Disconnected);
        }

        let session = Arc::new(MockSession {
            device_id: self.id.clone(),
            valid: AtomicBool::new(true),
            repeating: Mutex::new(None),
            on_closed,
            backend: self.backend.clone(),
        });
        let previous = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&session));
        if let Some(previous) = previous {
            previous.close();
        }
        record(
            &self.backend,
            MockEvent::SessionCreated {
                camera_id: self.id.clone(),
                outputs: outputs.iter().map(|o| o.id.clone()).collect(),
            },
        );

        let destroy = self
            .backend
            .upgrade()
            .map(|state| std::mem::take(&mut lock(&state).faults.destroy_during_session_create))
            .unwrap_or(false);
        if destroy {
            self.shutdown(Some(PlatformError::Disconnected));
        }

        Ok(session)
    }
}

/// A session handed out by [`MockDevice`].
pub struct MockSession {
    device_id: String,
    valid: AtomicBool,
    repeating: Mutex<Option<CaptureRequest>>,
    on_closed: SessionClosedHandler,
    backend: Weak<Mutex<MockState>>,
}

impl std::fmt::Debug for MockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSession")
            .field("device_id", &self.device_id)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl MockSession {
    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    fn ensure_valid(&self) -> Result<(), PlatformError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(PlatformError::Access("session has been closed".to_string()))
        }
    }
}

#[async_trait]
impl CaptureSession for MockSession {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn try_abort_captures(&self) {
        if self.is_valid() {
            record(
                &self.backend,
                MockEvent::CapturesAborted {
                    camera_id: self.device_id.clone(),
                },
            );
        }
    }

    fn close(&self) {
        if !self.valid.swap(false, Ordering::SeqCst) {
            return;
        }
        self.repeating
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        record(
            &self.backend,
            MockEvent::SessionClosed {
                camera_id: self.device_id.clone(),
            },
        );
        (self.on_closed)();
    }

    fn set_repeating_request(&self, request: &CaptureRequest) -> Result<(), PlatformError> {
        let fault = self
            .backend
            .upgrade()
            .and_then(|state| lock(&state).faults.fail_repeating.take());
        if let Some((error, disconnect)) = fault {
            if disconnect {
                if let Some(state) = self.backend.upgrade() {
                    let device = lock(&state)
                        .devices
                        .iter()
                        .find(|d| d.id == self.device_id && d.is_valid())
                        .cloned();
                    if let Some(device) = device {
                        device.shutdown(Some(PlatformError::Disconnected));
                    }
                }
            }
            return Err(error);
        }

        self.ensure_valid()?;
        *self.repeating.lock().unwrap_or_else(PoisonError::into_inner) = Some(request.clone());
        record(
            &self.backend,
            MockEvent::RepeatingStarted {
                camera_id: self.device_id.clone(),
                request: request.clone(),
            },
        );
        Ok(())
    }

    fn stop_repeating(&self) -> Result<(), PlatformError> {
        self.ensure_valid()?;
        self.repeating
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        record(
            &self.backend,
            MockEvent::RepeatingStopped {
                camera_id: self.device_id.clone(),
            },
        );
        Ok(())
    }

    async fn capture(
        &self,
        request: &CaptureRequest,
        enable_shutter_sound: bool,
    ) -> Result<CaptureResult, PlatformError> {
        self.ensure_valid()?;
        let frame_number = match self.backend.upgrade() {
            Some(state) => {
                let mut state = lock(&state);
                state.frame_number += 1;
                state.events.push(MockEvent::Captured {
                    camera_id: self.device_id.clone(),
                    request: request.clone(),
                });
                state.frame_number
            }
            None => 0,
        };
        tracing::debug!(
            camera_id = %self.device_id,
            frame_number,
            enable_shutter_sound,
            "MockSession captured still"
        );
        Ok(CaptureResult::new(request.clone(), &self.device_id, frame_number))
    }
}
