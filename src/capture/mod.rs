//! Platform camera access and configuration.
//!
//! This module provides the trait-based abstraction over the platform
//! camera service, a mock implementation for testing, the capture result
//! type and the configuration file format.

mod backend;
mod config;
mod mock;
mod result;

pub use backend::{
    CameraBackend, CameraDevice, CaptureSession, DeviceClosedHandler, PlatformError,
    SessionClosedHandler,
};
pub use config::{ConfigError, DemoConfig, FileConfig, InputConfig, MetricsConfig};
pub use mock::{MockBackend, MockDevice, MockEvent, MockSession};
pub use result::CaptureResult;
