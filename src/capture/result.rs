//! Completed capture result with metadata.

use crate::request::CaptureRequest;
use chrono::{DateTime, Utc};

/// The result of a single completed capture.
///
/// Carries the request that produced it so callers can inspect the
/// settings that were actually applied.
#[derive(Clone)]
pub struct CaptureResult {
    /// Request the platform completed.
    request: CaptureRequest,
    /// Id of the device that produced the result.
    camera_id: String,
    /// Sensor timestamp of the exposure start.
    timestamp: DateTime<Utc>,
    /// Monotonic frame number within the session.
    frame_number: u64,
}

impl CaptureResult {
    /// Creates a result stamped with the current time.
    pub fn new(request: CaptureRequest, camera_id: impl Into<String>, frame_number: u64) -> Self {
        Self {
            request,
            camera_id: camera_id.into(),
            timestamp: Utc::now(),
            frame_number,
        }
    }

    #[inline]
    pub fn request(&self) -> &CaptureRequest {
        &self.request
    }

    #[inline]
    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }
}

impl std::fmt::Debug for CaptureResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureResult")
            .field("camera_id", &self.camera_id)
            .field("frame_number", &self.frame_number)
            .field("template", &self.request.template)
            .field("targets", &self.request.targets)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Template;

    #[test]
    fn test_result_creation() {
        let before = Utc::now();
        let result = CaptureResult::new(CaptureRequest::new(Template::StillCapture), "1", 7);

        assert_eq!(result.camera_id(), "1");
        assert_eq!(result.frame_number(), 7);
        assert_eq!(result.request().template, Template::StillCapture);
        assert!(result.timestamp() >= before);
    }
}
