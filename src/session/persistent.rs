//! Capture session coordinator.
//!
//! Callers describe the session they want (camera, outputs, repeating
//! request, active flag) inside [`PersistentCaptureSession::with_configuration`];
//! when the block returns, the coordinator reconciles the device and session
//! with that description.
//!
//! The platform may close the device or session at any moment. Closure
//! handlers run on the platform's thread, outside the configuration lock,
//! and only touch the shared state when the generation they were registered
//! with is still current. Reconciliation rechecks the destroyed flag after
//! every await point and stops as soon as it is set.

use crate::capture::{
    CameraBackend, CameraDevice, CaptureResult, CaptureSession, DeviceClosedHandler,
    SessionClosedHandler,
};
use crate::error::CameraError;
use crate::request::{PhotoCaptureRequest, RepeatingCaptureRequest};
use crate::types::{CameraDeviceDetails, PhotoOptions, SurfaceOutput};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Receives errors the platform reports outside of any call.
pub trait SessionCallback: Send + Sync {
    fn on_error(&self, error: CameraError);
}

impl<F> SessionCallback for F
where
    F: Fn(CameraError) + Send + Sync,
{
    fn on_error(&self, error: CameraError) {
        self(error)
    }
}

/// Counters describing what the coordinator has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Reconcile passes started.
    pub reconcile_passes: u64,
    /// Passes skipped because the platform destroyed the session.
    pub skipped_passes: u64,
    pub devices_opened: u64,
    pub sessions_created: u64,
    /// Platform-initiated device or session closures.
    pub external_destructions: u64,
    pub photos_captured: u64,
    /// Platform failures ignored because the session was destroyed meanwhile.
    pub swallowed_failures: u64,
}

struct Shared {
    // requested by the caller
    camera_id: Option<String>,
    outputs: Vec<SurfaceOutput>,
    repeating_request: Option<RepeatingCaptureRequest>,
    is_active: bool,

    // derived from the above
    device: Option<Arc<dyn CameraDevice>>,
    session: Option<Arc<dyn CaptureSession>>,
    details: Option<CameraDeviceDetails>,
    device_generation: u64,
    session_generation: u64,
    is_repeating: bool,
    did_destroy_from_outside: bool,

    stats: SessionStats,
}

impl Shared {
    fn take_session(&mut self) -> Option<Arc<dyn CaptureSession>> {
        self.session_generation += 1;
        self.is_repeating = false;
        self.session.take()
    }

    fn take_device(&mut self) -> Option<Arc<dyn CameraDevice>> {
        self.device_generation += 1;
        self.device.take()
    }

    fn mark_destroyed(&mut self) {
        if !self.did_destroy_from_outside {
            self.stats.external_destructions += 1;
        }
        self.did_destroy_from_outside = true;
        self.is_active = false;
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A capture session that survives platform-initiated teardown and
/// reopens itself whenever it is configured as active.
pub struct PersistentCaptureSession {
    backend: Arc<dyn CameraBackend>,
    callback: Arc<dyn SessionCallback>,
    config_lock: tokio::sync::Mutex<()>,
    shared: Arc<Mutex<Shared>>,
}

impl PersistentCaptureSession {
    pub fn new(backend: Arc<dyn CameraBackend>, callback: Arc<dyn SessionCallback>) -> Self {
        let shared = Shared {
            camera_id: None,
            outputs: Vec::new(),
            repeating_request: None,
            is_active: false,
            device: None,
            session: None,
            details: None,
            device_generation: 0,
            session_generation: 0,
            is_repeating: false,
            did_destroy_from_outside: false,
            stats: SessionStats::default(),
        };
        Self {
            backend,
            callback,
            config_lock: tokio::sync::Mutex::new(()),
            shared: Arc::new(Mutex::new(shared)),
        }
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        lock(&self.shared)
    }

    /// True while the repeating request is running on a live session.
    pub fn is_running(&self) -> bool {
        let shared = self.shared();
        shared.is_active
            && shared.session.is_some()
            && shared.device.is_some()
            && shared.is_repeating
            && !shared.did_destroy_from_outside
    }

    /// True once the platform closed the device or session, until the
    /// session is set active again.
    pub fn is_destroyed(&self) -> bool {
        self.shared().did_destroy_from_outside
    }

    pub fn stats(&self) -> SessionStats {
        self.shared().stats
    }

    /// Aborts outstanding captures and closes the device, which also
    /// closes its session.
    pub fn close(&self) {
        let (session, device) = {
            let mut shared = self.shared();
            (shared.take_session(), shared.take_device())
        };
        if let Some(session) = session {
            session.try_abort_captures();
        }
        if let Some(device) = device {
            info!(camera_id = device.id(), "Closing camera device");
            device.close();
        }
    }

    fn assert_locked(&self, method: &'static str) -> Result<(), CameraError> {
        match self.config_lock.try_lock() {
            Ok(_) => Err(CameraError::NotLocked { method }),
            Err(_) => Ok(()),
        }
    }

    /// Runs `block` under the configuration lock, then reconciles the
    /// device and session with the requested configuration.
    ///
    /// The mutators (`set_*`) may only be called from inside `block`.
    pub async fn with_configuration<F>(&self, block: F) -> Result<(), CameraError>
    where
        F: FnOnce(&Self) -> Result<(), CameraError>,
    {
        let _guard = self.config_lock.lock().await;
        block(self)?;
        self.configure().await
    }

    /// Selects the camera to open.
    ///
    /// Fails with [`CameraError::NotLocked`] when the configuration lock is
    /// free. The check only sees that the lock is taken, not by whom, so a
    /// call from outside `with_configuration` passes while another task
    /// holds the lock.
    pub fn set_input(&self, camera_id: &str) -> Result<(), CameraError> {
        debug!(camera_id, "--> set_input");
        self.assert_locked("set_input")?;

        let (session, device) = {
            let mut shared = self.shared();
            let device_matches = shared
                .device
                .as_ref()
                .is_some_and(|device| device.id() == camera_id);
            if shared.camera_id.as_deref() == Some(camera_id) && device_matches {
                return Ok(());
            }
            shared.camera_id = Some(camera_id.to_string());
            (shared.take_session(), shared.take_device())
        };

        // aborting first fails outstanding photos instead of leaving them hanging
        if let Some(session) = session {
            session.try_abort_captures();
        }
        if let Some(device) = device {
            device.close();
        }
        Ok(())
    }

    /// Sets the outputs the session renders into. Lock checked as in
    /// [`Self::set_input`].
    pub fn set_outputs(&self, outputs: Vec<SurfaceOutput>) -> Result<(), CameraError> {
        debug!(count = outputs.len(), "--> set_outputs");
        self.assert_locked("set_outputs")?;

        let (session, keep_warm) = {
            let mut shared = self.shared();
            if shared.outputs == outputs {
                return Ok(());
            }
            let keep_warm = !outputs.is_empty();
            shared.outputs = outputs;
            (shared.take_session(), keep_warm)
        };

        if let Some(session) = session {
            if keep_warm {
                // the next session takes the outputs over
                session.try_abort_captures();
            } else {
                session.close();
            }
        }
        Ok(())
    }

    /// Records the repeating request. Lock checked as in [`Self::set_input`].
    pub fn set_repeating_request(&self, request: RepeatingCaptureRequest) -> Result<(), CameraError> {
        debug!("--> set_repeating_request");
        self.assert_locked("set_repeating_request")?;

        let mut shared = self.shared();
        if shared.repeating_request.as_ref() != Some(&request) {
            shared.repeating_request = Some(request);
        }
        Ok(())
    }

    /// Records the active flag; `true` also clears the destroyed flag.
    /// Lock checked as in [`Self::set_input`].
    pub fn set_is_active(&self, is_active: bool) -> Result<(), CameraError> {
        debug!(is_active, "--> set_is_active");
        self.assert_locked("set_is_active")?;

        let mut shared = self.shared();
        shared.is_active = is_active;
        if is_active {
            shared.did_destroy_from_outside = false;
        }
        Ok(())
    }

    /// Takes a single photo with `options` layered on top of the current
    /// repeating request, and waits for its result.
    pub async fn capture(&self, options: &PhotoOptions) -> Result<CaptureResult, CameraError> {
        let _guard = self.config_lock.lock().await;

        let (device, session, repeating, outputs) = {
            let shared = self.shared();
            let session = shared.session.clone().ok_or(CameraError::NotReady)?;
            let repeating = shared
                .repeating_request
                .clone()
                .ok_or(CameraError::NotReady)?;
            let device = shared.device.clone().ok_or(CameraError::NotReady)?;
            (device, session, repeating, shared.outputs.clone())
        };
        let details = self.get_or_create_device_details(device.as_ref())?;

        // photo and preview outputs all receive this frame
        let request = PhotoCaptureRequest::new(&repeating, options).create_capture_request(
            device.as_ref(),
            &details,
            &outputs,
        )?;
        let result = session
            .capture(&request, options.enable_shutter_sound)
            .await?;

        self.shared().stats.photos_captured += 1;
        Ok(result)
    }

    /// Capabilities of the currently open device.
    pub fn active_device_details(&self) -> Option<CameraDeviceDetails> {
        let device = self.shared().device.clone()?;
        self.get_or_create_device_details(device.as_ref()).ok()
    }

    async fn configure(&self) -> Result<(), CameraError> {
        let (camera_id, repeating, outputs) = {
            let mut shared = self.shared();
            shared.stats.reconcile_passes += 1;
            if shared.did_destroy_from_outside && !shared.is_active {
                shared.stats.skipped_passes += 1;
                debug!("Capture session was destroyed by the platform, skipping configuration until it is set active again");
                return Ok(());
            }
            debug!(
                is_active = shared.is_active,
                camera_id = ?shared.camera_id,
                has_device = shared.device.is_some(),
                has_session = shared.session.is_some(),
                "Configuring"
            );
            let camera_id = shared.camera_id.clone().ok_or(CameraError::NoCameraDevice)?;
            let repeating = shared
                .repeating_request
                .clone()
                .ok_or(CameraError::NotReady)?;
            shared.did_destroy_from_outside = false;
            (camera_id, repeating, shared.outputs.clone())
        };

        match self.reconcile(&camera_id, &repeating, &outputs).await {
            Err(error) if error.is_platform() && self.is_destroyed() => {
                debug!(%error, "Configuration canceled, session was destroyed in the meantime");
                self.shared().stats.swallowed_failures += 1;
                Ok(())
            }
            result => result,
        }
    }

    async fn reconcile(
        &self,
        camera_id: &str,
        repeating: &RepeatingCaptureRequest,
        outputs: &[SurfaceOutput],
    ) -> Result<(), CameraError> {
        let Some(device) = self.get_or_create_device(camera_id).await? else {
            return Ok(());
        };
        if self.is_destroyed() || outputs.is_empty() {
            return Ok(());
        }

        let Some(session) = self.get_or_create_session(&device, outputs).await? else {
            return Ok(());
        };

        let (is_active, generation) = {
            let shared = self.shared();
            if shared.did_destroy_from_outside {
                return Ok(());
            }
            (shared.is_active, shared.session_generation)
        };

        if is_active {
            debug!("Updating repeating request");
            let details = self.get_or_create_device_details(device.as_ref())?;
            let repeating_outputs: Vec<SurfaceOutput> =
                outputs.iter().filter(|o| o.is_repeating).cloned().collect();
            let request =
                repeating.create_capture_request(device.as_ref(), &details, &repeating_outputs)?;
            session.set_repeating_request(&request)?;
        } else {
            debug!("Stopping repeating request");
            session.stop_repeating()?;
        }

        let mut shared = self.shared();
        if shared.session_generation == generation {
            shared.is_repeating = is_active;
        }
        debug!(is_active, camera_id, "Configuration done");
        Ok(())
    }

    async fn get_or_create_device(
        &self,
        camera_id: &str,
    ) -> Result<Option<Arc<dyn CameraDevice>>, CameraError> {
        let (stale_session, stale_device, generation) = {
            let mut shared = self.shared();
            if let Some(device) = &shared.device {
                if device.id() == camera_id && device.is_valid() {
                    return Ok(Some(Arc::clone(device)));
                }
            }
            let session = shared.take_session();
            let device = shared.take_device();
            (session, device, shared.device_generation)
        };
        if let Some(session) = stale_session {
            session.try_abort_captures();
        }
        if let Some(device) = stale_device {
            device.close();
        }

        info!(camera_id, generation, "Creating new device");
        let device = self
            .backend
            .open_camera(camera_id, self.device_closed_handler(generation))
            .await?;

        let mut shared = self.shared();
        if shared.device_generation != generation {
            drop(shared);
            debug!(camera_id, generation, "Device was closed while it was being opened");
            device.close();
            return Ok(None);
        }
        shared.device = Some(Arc::clone(&device));
        shared.stats.devices_opened += 1;
        Ok(Some(device))
    }

    async fn get_or_create_session(
        &self,
        device: &Arc<dyn CameraDevice>,
        outputs: &[SurfaceOutput],
    ) -> Result<Option<Arc<dyn CaptureSession>>, CameraError> {
        let generation = {
            let mut shared = self.shared();
            if let Some(session) = &shared.session {
                if session.device_id() == device.id() {
                    return Ok(Some(Arc::clone(session)));
                }
            }
            if outputs.is_empty() {
                return Err(CameraError::NoOutputs);
            }
            shared.session_generation += 1;
            shared.session_generation
        };

        info!(camera_id = device.id(), generation, "Creating new session");
        let session = device
            .create_capture_session(outputs, self.session_closed_handler(generation))
            .await?;

        let mut shared = self.shared();
        if shared.session_generation != generation || shared.did_destroy_from_outside {
            drop(shared);
            debug!(generation, "Session was closed while it was being created");
            session.close();
            return Ok(None);
        }
        shared.session = Some(Arc::clone(&session));
        shared.stats.sessions_created += 1;
        Ok(Some(session))
    }

    fn get_or_create_device_details(
        &self,
        device: &dyn CameraDevice,
    ) -> Result<CameraDeviceDetails, CameraError> {
        if let Some(details) = &self.shared().details {
            if details.camera_id == device.id() {
                return Ok(details.clone());
            }
        }

        let details = self.backend.device_details(device.id())?;
        self.shared().details = Some(details.clone());
        Ok(details)
    }

    fn device_closed_handler(&self, generation: u64) -> DeviceClosedHandler {
        let shared = Arc::downgrade(&self.shared);
        let callback = Arc::clone(&self.callback);
        Arc::new(move |error| {
            info!(generation, "Camera device closed");
            if let Some(shared) = shared.upgrade() {
                let session = {
                    let mut shared = lock(&shared);
                    if shared.device_generation == generation {
                        shared.mark_destroyed();
                        shared.take_device();
                        shared.take_session()
                    } else {
                        None
                    }
                };
                if let Some(session) = session {
                    session.try_abort_captures();
                }
            }
            if let Some(error) = error {
                callback.on_error(error.into());
            }
        })
    }

    fn session_closed_handler(&self, generation: u64) -> SessionClosedHandler {
        let shared = Arc::downgrade(&self.shared);
        Arc::new(move || {
            info!(generation, "Capture session closed");
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let session = {
                let mut shared = lock(&shared);
                if shared.session_generation == generation {
                    shared.mark_destroyed();
                    shared.take_session()
                } else {
                    None
                }
            };
            if let Some(session) = session {
                session.try_abort_captures();
            }
        })
    }
}

impl Drop for PersistentCaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for PersistentCaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.shared();
        f.debug_struct("PersistentCaptureSession")
            .field("camera_id", &shared.camera_id)
            .field("outputs", &shared.outputs.len())
            .field("is_active", &shared.is_active)
            .field("device", &shared.device)
            .field("session", &shared.session)
            .field("did_destroy_from_outside", &shared.did_destroy_from_outside)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MockBackend, MockEvent, PlatformError};
    use crate::request::{AeMode, Template};
    use crate::types::{
        CameraDeviceFormat, Flash, OutputType, QualityPrioritization, VideoStabilizationMode,
    };
    use proptest::prelude::*;
    use std::time::Duration;

    fn preview() -> SurfaceOutput {
        SurfaceOutput::new("preview", OutputType::Preview, 1920, 1080)
    }

    fn photo() -> SurfaceOutput {
        SurfaceOutput::new("photo", OutputType::Photo, 4032, 3024)
    }

    fn video() -> SurfaceOutput {
        SurfaceOutput::new("video", OutputType::Video, 3840, 2160)
    }

    fn new_session(backend: &MockBackend) -> (PersistentCaptureSession, Arc<Mutex<Vec<CameraError>>>) {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let session = PersistentCaptureSession::new(
            Arc::new(backend.clone()),
            Arc::new(move |error: CameraError| sink.lock().unwrap().push(error)),
        );
        (session, errors)
    }

    async fn start(session: &PersistentCaptureSession, outputs: Vec<SurfaceOutput>) {
        session
            .with_configuration(|s| {
                s.set_input("0")?;
                s.set_outputs(outputs)?;
                s.set_repeating_request(RepeatingCaptureRequest::new(false))?;
                s.set_is_active(true)
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_configure_starts_repeating_request() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);

        start(&session, vec![preview(), photo()]).await;

        assert!(session.is_running());
        assert!(backend.is_device_open("0"));
        let request = backend.repeating_request("0").unwrap();
        assert_eq!(request.template, Template::Preview);
        // photo outputs only receive one-shot captures
        assert_eq!(request.targets, vec!["preview".to_string()]);

        let stats = session.stats();
        assert_eq!(stats.devices_opened, 1);
        assert_eq!(stats.sessions_created, 1);
    }

    #[tokio::test]
    async fn test_reconfigure_reuses_device_and_session() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);
        start(&session, vec![preview()]).await;

        let mut repeating = RepeatingCaptureRequest::new(false);
        repeating.base.zoom = 3.0;
        session
            .with_configuration(|s| s.set_repeating_request(repeating))
            .await
            .unwrap();

        assert_eq!(backend.open_count(), 1);
        assert_eq!(backend.session_count(), 1);
        let request = backend.repeating_request("0").unwrap();
        assert_eq!(request.settings.zoom_ratio, Some(3.0));
    }

    #[tokio::test]
    async fn test_mutators_require_lock() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);

        assert_eq!(
            session.set_input("0"),
            Err(CameraError::NotLocked { method: "set_input" })
        );
        assert_eq!(
            session.set_outputs(vec![preview()]),
            Err(CameraError::NotLocked {
                method: "set_outputs"
            })
        );
        assert_eq!(
            session.set_repeating_request(RepeatingCaptureRequest::default()),
            Err(CameraError::NotLocked {
                method: "set_repeating_request"
            })
        );
        assert_eq!(
            session.set_is_active(true),
            Err(CameraError::NotLocked {
                method: "set_is_active"
            })
        );
        assert_eq!(backend.open_count(), 0);
    }

    #[tokio::test]
    async fn test_configure_without_input_fails() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);

        let result = session
            .with_configuration(|s| s.set_is_active(true))
            .await;
        assert_eq!(result, Err(CameraError::NoCameraDevice));

        let result = session.with_configuration(|s| s.set_input("0")).await;
        assert_eq!(result, Err(CameraError::NotReady));
    }

    #[tokio::test]
    async fn test_inactive_session_stops_repeating() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);
        start(&session, vec![preview()]).await;

        session
            .with_configuration(|s| s.set_is_active(false))
            .await
            .unwrap();

        assert!(!session.is_running());
        assert!(backend.has_session("0"));
        assert!(backend.repeating_request("0").is_none());
        assert_eq!(
            backend.count(|e| matches!(e, MockEvent::RepeatingStopped { .. })),
            1
        );
    }

    #[tokio::test]
    async fn test_switching_input_closes_previous_device() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);
        start(&session, vec![preview()]).await;

        session
            .with_configuration(|s| s.set_input("1"))
            .await
            .unwrap();

        assert!(!backend.is_device_open("0"));
        assert!(backend.is_device_open("1"));
        assert!(backend.repeating_request("1").is_some());
        assert!(session.is_running());
        assert!(!session.is_destroyed());
        assert_eq!(session.active_device_details().unwrap().camera_id, "1");

        let events = backend.events();
        let aborted = events
            .iter()
            .position(|e| matches!(e, MockEvent::CapturesAborted { camera_id } if camera_id == "0"))
            .unwrap();
        let closed = events
            .iter()
            .position(|e| matches!(e, MockEvent::DeviceClosed { camera_id } if camera_id == "0"))
            .unwrap();
        assert!(aborted < closed);
    }

    #[tokio::test]
    async fn test_empty_outputs_close_session() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);
        start(&session, vec![preview()]).await;

        session
            .with_configuration(|s| s.set_outputs(Vec::new()))
            .await
            .unwrap();

        assert!(!session.is_running());
        assert!(!session.is_destroyed());
        assert!(backend.is_device_open("0"));
        assert!(!backend.has_session("0"));
        assert_eq!(
            backend.count(|e| matches!(e, MockEvent::SessionClosed { .. })),
            1
        );
    }

    #[tokio::test]
    async fn test_changed_outputs_keep_device_warm() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);
        start(&session, vec![preview()]).await;
        backend.clear_events();

        session
            .with_configuration(|s| s.set_outputs(vec![preview(), video()]))
            .await
            .unwrap();

        let events = backend.events();
        assert!(matches!(events[0], MockEvent::CapturesAborted { .. }));
        assert!(!events
            .iter()
            .any(|e| matches!(e, MockEvent::DeviceClosed { .. } | MockEvent::DeviceOpened { .. })));
        assert_eq!(backend.open_count(), 0);
        assert_eq!(backend.session_count(), 1);
        assert!(session.is_running());
        assert!(!session.is_destroyed());
        assert_eq!(
            backend.repeating_request("0").unwrap().targets,
            vec!["preview".to_string(), "video".to_string()]
        );
    }

    #[tokio::test]
    async fn test_capture_requires_session() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);

        let result = session.capture(&PhotoOptions::default()).await;
        assert_eq!(result.unwrap_err(), CameraError::NotReady);
    }

    #[tokio::test]
    async fn test_capture_layers_photo_options() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);
        let mut repeating = RepeatingCaptureRequest::new(false);
        repeating.base.zoom = 2.0;
        session
            .with_configuration(|s| {
                s.set_input("0")?;
                s.set_outputs(vec![preview(), photo()])?;
                s.set_repeating_request(repeating)?;
                s.set_is_active(true)
            })
            .await
            .unwrap();

        let options = PhotoOptions {
            flash: Flash::On,
            quality_prioritization: QualityPrioritization::Speed,
            ..Default::default()
        };
        let result = session.capture(&options).await.unwrap();

        let request = result.request();
        assert_eq!(request.template, Template::StillCapture);
        assert_eq!(
            request.targets,
            vec!["preview".to_string(), "photo".to_string()]
        );
        assert_eq!(request.settings.zoom_ratio, Some(2.0));
        assert_eq!(request.settings.ae_mode, Some(AeMode::OnAlwaysFlash));
        assert_eq!(request.settings.jpeg_quality, Some(85));
        assert_eq!(
            backend.count(|e| matches!(e, MockEvent::Captured { .. })),
            1
        );

        let second = session.capture(&options).await.unwrap();
        assert!(second.frame_number() > result.frame_number());
        assert_eq!(session.stats().photos_captured, 2);
        // the preview keeps running
        assert!(session.is_running());
    }

    #[tokio::test]
    async fn test_capture_after_destruction_is_not_ready() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);
        start(&session, vec![preview(), photo()]).await;

        backend.disconnect("0", None);

        let result = session.capture(&PhotoOptions::default()).await;
        assert_eq!(result.unwrap_err(), CameraError::NotReady);
    }

    #[tokio::test]
    async fn test_invalid_repeating_request_propagates() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);
        let mut repeating = RepeatingCaptureRequest::new(true);
        repeating.fps = Some(240);
        repeating.base.format = Some(CameraDeviceFormat {
            max_fps: 60,
            ..Default::default()
        });

        let result = session
            .with_configuration(|s| {
                s.set_input("0")?;
                s.set_outputs(vec![preview()])?;
                s.set_repeating_request(repeating)?;
                s.set_is_active(true)
            })
            .await;
        assert_eq!(result, Err(CameraError::InvalidFps(240)));
        assert!(!session.is_running());

        let mut repeating = RepeatingCaptureRequest::new(false);
        repeating.video_stabilization_mode = VideoStabilizationMode::Cinematic;
        let result = session
            .with_configuration(|s| s.set_repeating_request(repeating))
            .await;
        assert_eq!(
            result,
            Err(CameraError::PropRequiresFormat("videoStabilizationMode"))
        );
    }

    #[tokio::test]
    async fn test_external_device_closure() {
        let backend = MockBackend::new();
        let (session, errors) = new_session(&backend);
        start(&session, vec![preview()]).await;

        backend.disconnect("0", Some(PlatformError::InUse));

        assert!(session.is_destroyed());
        assert!(!session.is_running());
        assert_eq!(
            *errors.lock().unwrap(),
            vec![CameraError::Platform(PlatformError::InUse)]
        );
        assert_eq!(session.stats().external_destructions, 1);

        // reconfiguring without reactivating is a no-op
        session
            .with_configuration(|s| s.set_outputs(vec![preview(), video()]))
            .await
            .unwrap();
        assert_eq!(backend.open_count(), 1);
        assert_eq!(session.stats().skipped_passes, 1);

        session
            .with_configuration(|s| s.set_is_active(true))
            .await
            .unwrap();
        assert_eq!(backend.open_count(), 2);
        assert!(!session.is_destroyed());
        assert!(session.is_running());
    }

    #[tokio::test]
    async fn test_external_session_closure() {
        let backend = MockBackend::new();
        let (session, errors) = new_session(&backend);
        start(&session, vec![preview()]).await;

        backend.close_session("0");

        assert!(session.is_destroyed());
        assert!(!session.is_running());
        assert!(errors.lock().unwrap().is_empty());

        session
            .with_configuration(|s| s.set_is_active(true))
            .await
            .unwrap();
        // the device survived, only the session is recreated
        assert_eq!(backend.open_count(), 1);
        assert_eq!(backend.session_count(), 2);
        assert!(session.is_running());
    }

    #[tokio::test]
    async fn test_destruction_mid_configuration_halts() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);
        backend.destroy_during_next_session_create();

        start(&session, vec![preview()]).await;

        assert!(session.is_destroyed());
        assert!(!session.is_running());
        assert_eq!(
            backend.count(|e| matches!(e, MockEvent::RepeatingStarted { .. })),
            0
        );
        assert_eq!(session.stats().sessions_created, 0);

        session
            .with_configuration(|s| s.set_outputs(vec![video()]))
            .await
            .unwrap();
        assert_eq!(backend.open_count(), 1);

        session
            .with_configuration(|s| s.set_is_active(true))
            .await
            .unwrap();
        assert!(session.is_running());
        assert_eq!(backend.open_count(), 2);
    }

    #[tokio::test]
    async fn test_platform_failure_swallowed_when_destroyed() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);
        backend.fail_next_repeating(PlatformError::Disconnected, true);

        start(&session, vec![preview()]).await;

        assert!(session.is_destroyed());
        assert_eq!(session.stats().swallowed_failures, 1);
    }

    #[tokio::test]
    async fn test_platform_failure_propagates() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);
        backend.fail_next_repeating(PlatformError::Service, false);

        let result = session
            .with_configuration(|s| {
                s.set_input("0")?;
                s.set_outputs(vec![preview()])?;
                s.set_repeating_request(RepeatingCaptureRequest::new(false))?;
                s.set_is_active(true)
            })
            .await;
        assert_eq!(result, Err(CameraError::Platform(PlatformError::Service)));
        assert!(!session.is_destroyed());
        assert!(!session.is_running());

        backend.fail_next_open(PlatformError::MaxCamerasInUse);
        let result = session.with_configuration(|s| s.set_input("1")).await;
        assert_eq!(
            result,
            Err(CameraError::Platform(PlatformError::MaxCamerasInUse))
        );
    }

    #[tokio::test]
    async fn test_close_releases_device() {
        let backend = MockBackend::new();
        let (session, errors) = new_session(&backend);
        start(&session, vec![preview()]).await;

        session.close();

        assert!(!backend.is_device_open("0"));
        assert!(!session.is_running());
        // closing ourselves is not an external destruction
        assert!(!session.is_destroyed());
        assert!(errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_during_open_releases_new_device() {
        let backend = MockBackend::new();
        let (session, errors) = new_session(&backend);
        backend.delay_next_open(Duration::from_millis(50));

        tokio::join!(start(&session, vec![preview()]), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session.close();
        });

        assert_eq!(backend.open_count(), 1);
        assert!(!backend.is_device_open("0"));
        assert_eq!(
            backend.count(|e| matches!(e, MockEvent::DeviceClosed { .. })),
            1
        );
        assert!(session.active_device_details().is_none());
        assert!(!session.is_running());
        assert!(!session.is_destroyed());
        assert_eq!(session.stats().devices_opened, 0);
        assert!(errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drop_closes_device() {
        let backend = MockBackend::new();
        {
            let (session, _) = new_session(&backend);
            start(&session, vec![preview()]).await;
            assert!(backend.is_device_open("0"));
        }
        assert!(!backend.is_device_open("0"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_configurations_are_serialized() {
        let backend = MockBackend::new();
        let (session, _) = new_session(&backend);
        let session = Arc::new(session);
        start(&session, vec![preview()]).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let session = Arc::clone(&session);
            handles.push(tokio::spawn(async move {
                let mut repeating = RepeatingCaptureRequest::new(false);
                repeating.base.zoom = 1.0 + i as f32;
                session
                    .with_configuration(|s| s.set_repeating_request(repeating))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(backend.open_count(), 1);
        assert_eq!(backend.session_count(), 1);
        assert!(session.is_running());
        assert_eq!(
            backend.count(|e| matches!(e, MockEvent::RepeatingStarted { .. })),
            9
        );
    }

    #[derive(Debug, Clone)]
    enum Op {
        SetInput(&'static str),
        SetOutputs(usize),
        SetActive(bool),
        Disconnect,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            prop_oneof![Just("0"), Just("1")].prop_map(Op::SetInput),
            (0usize..4).prop_map(Op::SetOutputs),
            any::<bool>().prop_map(Op::SetActive),
            Just(Op::Disconnect),
        ]
    }

    fn output_set(index: usize) -> Vec<SurfaceOutput> {
        match index {
            0 => Vec::new(),
            1 => vec![preview()],
            2 => vec![preview(), photo()],
            _ => vec![video(), preview()],
        }
    }

    proptest! {
        #[test]
        fn prop_configuration_converges(ops in prop::collection::vec(op(), 1..24)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            runtime.block_on(async {
                let backend = MockBackend::new();
                let (session, _) = new_session(&backend);
                session
                    .with_configuration(|s| {
                        s.set_input("0")?;
                        s.set_repeating_request(RepeatingCaptureRequest::new(false))
                    })
                    .await
                    .unwrap();

                let mut camera_id = "0";
                let mut outputs = Vec::new();
                let mut is_active = false;
                let mut destroyed = false;

                for op in ops {
                    match op {
                        Op::SetInput(id) => {
                            camera_id = id;
                            session.with_configuration(|s| s.set_input(id)).await.unwrap();
                        }
                        Op::SetOutputs(index) => {
                            outputs = output_set(index);
                            let next = outputs.clone();
                            session.with_configuration(|s| s.set_outputs(next)).await.unwrap();
                        }
                        Op::SetActive(active) => {
                            is_active = active;
                            if active {
                                destroyed = false;
                            }
                            session.with_configuration(|s| s.set_is_active(active)).await.unwrap();
                        }
                        Op::Disconnect => {
                            if backend.is_device_open(camera_id) {
                                destroyed = true;
                                is_active = false;
                            }
                            backend.disconnect(camera_id, None);
                        }
                    }

                    let expected = is_active && !outputs.is_empty() && !destroyed;
                    assert_eq!(session.is_running(), expected);
                    assert_eq!(backend.repeating_request(camera_id).is_some(), expected);
                    assert_eq!(session.is_destroyed(), destroyed);
                }
            });
        }
    }
}
