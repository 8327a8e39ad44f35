//! Persistent capture session.
//!
//! Owns the camera device and capture session, applies configuration
//! changes atomically, and recovers from the platform closing either of
//! them behind its back.

mod persistent;

pub use persistent::{PersistentCaptureSession, SessionCallback, SessionStats};
