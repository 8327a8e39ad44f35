//! Output targets a capture session renders into.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What an output is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputType {
    Preview,
    Video,
    Photo,
    CodeScanner,
}

/// An opaque surface bound into a capture session.
///
/// Only `id` and `is_repeating` matter to the session: repeating outputs
/// receive frames from the repeating request, the rest only from
/// one-shot captures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceOutput {
    pub id: String,
    pub output_type: OutputType,
    pub width: u32,
    pub height: u32,
    pub is_repeating: bool,
}

impl SurfaceOutput {
    pub fn new(id: impl Into<String>, output_type: OutputType, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            output_type,
            width,
            height,
            is_repeating: output_type != OutputType::Photo,
        }
    }
}

impl fmt::Display for SurfaceOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({:?} {}x{})",
            self.id, self.output_type, self.width, self.height
        )
    }
}
