//! Persistent Camera Capture Session Library
//!
//! Coordinates a platform camera device and its capture session: opens the
//! device, binds output surfaces, keeps a repeating preview/record request
//! running, and submits one-shot still captures, while tolerating the
//! platform closing the device or session at any time.
//!
//! # Architecture
//!
//! ```text
//! caller ──with_configuration──▶ PersistentCaptureSession ──▶ CameraBackend
//!                                     │        ▲                 │
//!                        request builders      └── closure handlers (platform thread)
//! ```
//!
//! # Design Principles
//!
//! - **Desired state, not commands**: callers describe the session they
//!   want; the coordinator reconciles the device and session with it
//! - **Serialized configuration**: one async lock covers every
//!   mutate-then-reconcile unit and every still capture
//! - **Generation-checked teardown**: stale closure notifications never
//!   touch the current device or session
//! - **Platform-agnostic**: hardware access sits behind [`CameraBackend`]
//!
//! # Example
//!
//! ```no_run
//! use camera_session::{
//!     capture::MockBackend,
//!     types::{OutputType, PhotoOptions, SurfaceOutput},
//!     CameraError, PersistentCaptureSession, RepeatingCaptureRequest,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), CameraError> {
//! let session = PersistentCaptureSession::new(
//!     Arc::new(MockBackend::new()),
//!     Arc::new(|error: CameraError| eprintln!("camera error: {error}")),
//! );
//!
//! session
//!     .with_configuration(|s| {
//!         s.set_input("0")?;
//!         s.set_outputs(vec![
//!             SurfaceOutput::new("preview", OutputType::Preview, 1920, 1080),
//!             SurfaceOutput::new("photo", OutputType::Photo, 4032, 3024),
//!         ])?;
//!         s.set_repeating_request(RepeatingCaptureRequest::new(false))?;
//!         s.set_is_active(true)
//!     })
//!     .await?;
//!
//! let photo = session.capture(&PhotoOptions::default()).await?;
//! println!("captured frame {}", photo.frame_number());
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod error;
pub mod metrics;
pub mod request;
pub mod session;
pub mod types;

// Re-export commonly used types at crate root
pub use capture::{CameraBackend, CaptureResult, FileConfig, MockBackend, PlatformError};
pub use error::CameraError;
pub use request::{CaptureRequest, PhotoCaptureRequest, RepeatingCaptureRequest};
pub use session::{PersistentCaptureSession, SessionCallback, SessionStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
