use serde::{Deserialize, Serialize};
use std::fmt;

/// Which estimation path produced the underlay measurements.
///
/// The mode propagates unchanged into every downstream record and gate
/// decision so a report reader can tell geometry-backed scale apart from
/// heuristic scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnderlayDetectionMode {
    /// Homography over detected checkerboard corners.
    CheckerboardGeometry,
    /// Edge/line spacing heuristics, no corner grid available.
    LineGridHeuristic,
    /// Frame sharpness/exposure proxy, no usable previews.
    FrameQualityFallback,
    /// Fixed offsets around the expected size, nothing else usable.
    StaticFallback,
}

impl UnderlayDetectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnderlayDetectionMode::CheckerboardGeometry => "checkerboard-geometry",
            UnderlayDetectionMode::LineGridHeuristic => "line-grid-heuristic",
            UnderlayDetectionMode::FrameQualityFallback => "frame-quality-fallback",
            UnderlayDetectionMode::StaticFallback => "static-fallback",
        }
    }
}

impl fmt::Display for UnderlayDetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw output of the underlay scale/pose estimator, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderlayEstimate {
    pub measured_box_sizes_mm: Vec<f64>,
    pub detection_mode: UnderlayDetectionMode,
    pub scale_confidence: f64,
    pub pose_quality: f64,
    pub grid_spacing_px: f64,
    pub grid_spacing_stddev_px: f64,
    pub homography_inlier_ratio: f64,
    pub pose_reprojection_error_px: f64,
    /// True when every sample came out of the checkerboard-geometry path.
    pub geometry_derived: bool,
}

/// Outcome of underlay scale verification against the printed grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderlayVerificationResult {
    pub performed: bool,
    pub underlay_pattern_id: String,
    pub detection_mode: UnderlayDetectionMode,
    pub expected_box_size_mm: f64,
    pub measured_box_sizes_mm: Vec<f64>,
    /// Robust subset of `measured_box_sizes_mm`; always a subset by value.
    pub inlier_box_sizes_mm: Vec<f64>,
    pub mean_box_size_mm: f64,
    pub mean_absolute_error_mm: f64,
    pub max_absolute_error_mm: f64,
    pub fit_confidence: f64,
    pub scale_confidence: f64,
    pub pose_quality: f64,
    pub grid_spacing_px: f64,
    pub grid_spacing_stddev_px: f64,
    pub homography_inlier_ratio: f64,
    pub pose_reprojection_error_px: f64,
    pub geometry_derived: bool,
    pub pass: bool,
    pub notes: String,
}
