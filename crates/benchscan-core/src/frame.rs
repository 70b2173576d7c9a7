use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One captured frame with its provider-side quality scores.
///
/// Created by a capture provider and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureFrame {
    pub frame_id: String,
    /// Host-clock capture time, Unix milliseconds.
    pub captured_at_ms: u64,
    /// Device-clock timestamp in milliseconds, when the backend exposes one.
    pub source_timestamp_ms: Option<f64>,
    /// Normalized sharpness in `[0, 1]`.
    pub sharpness_score: f64,
    /// Normalized exposure in `[0, 1]`.
    pub exposure_score: f64,
    pub accepted: bool,
    /// Persisted grayscale preview, read later by calibration and underlay
    /// estimation. Missing or unreadable previews exclude the frame, they
    /// never fail the pipeline.
    pub preview_image_path: Option<PathBuf>,
}
