//! Prometheus metrics exporter for capture session monitoring.
//!
//! # Metrics Exposed
//!
//! ## State Metrics
//! - `camera_session_running` - Repeating request running (1=running, 0=stopped)
//! - `camera_session_destroyed` - Session destroyed by the platform (1=destroyed)
//!
//! ## Lifecycle Metrics
//! - `camera_session_reconcile_passes_total` - Configuration passes started
//! - `camera_session_skipped_passes_total` - Passes skipped after destruction
//! - `camera_session_devices_opened_total` - Camera devices opened
//! - `camera_session_sessions_created_total` - Capture sessions created
//! - `camera_session_external_destructions_total` - Platform-initiated closures
//! - `camera_session_swallowed_failures_total` - Failures masked by destruction
//!
//! ## Capture Metrics
//! - `camera_session_photos_captured_total` - Still captures completed
//!
//! # Example
//!
//! ```no_run
//! use camera_session::metrics::{MetricsRegistry, MetricsSnapshot};
//! use camera_session::SessionStats;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     is_running: true,
//!     is_destroyed: false,
//!     stats: SessionStats {
//!         reconcile_passes: 3,
//!         devices_opened: 1,
//!         sessions_created: 1,
//!         ..Default::default()
//!     },
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
