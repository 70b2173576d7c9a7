use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed thresholds for the calibration quality gates.
pub struct GateThresholds;

impl GateThresholds {
    pub const MIN_USABLE_INTRINSIC_FRAMES: usize = 3;
    pub const MAX_REPROJECTION_ERROR_PX: f64 = 0.5;
    pub const REPROJECTION_ERROR_PERCENTILE: f64 = 95.0;
    pub const MAX_REPROJECTION_ERROR_PERCENTILE_PX: f64 = 0.6;
    pub const MIN_UNDERLAY_SCALE_CONFIDENCE: f64 = 0.7;
    pub const MIN_UNDERLAY_POSE_QUALITY: f64 = 0.45;
}

/// Per-frame inclusion record for the intrinsic solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicFrameDiagnostic {
    pub frame_id: String,
    pub included: bool,
    /// Fine-grained code: `used_for_intrinsics`, `preview_missing`,
    /// `image_read_failed`, `corners_not_found`, `processing_error`.
    pub reason_code: String,
    /// Coarse category: `included`, `input_missing`, `image_io`,
    /// `detection_failure`, `processing_error`.
    pub reason_category: String,
}

/// Frame-usage bookkeeping for the intrinsic solve, present even when the
/// solve itself never ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicDiagnosticsSummary {
    pub total_frames_evaluated: usize,
    pub usable_frames: usize,
    pub rejected_frames: usize,
    pub rejected_by_reason: BTreeMap<String, usize>,
    pub rejected_by_category: BTreeMap<String, usize>,
    pub frame_diagnostics: Vec<IntrinsicFrameDiagnostic>,
}

impl IntrinsicDiagnosticsSummary {
    /// Fold per-frame diagnostics into the count maps.
    pub fn from_frames(frame_diagnostics: Vec<IntrinsicFrameDiagnostic>) -> Self {
        let mut rejected_by_reason = BTreeMap::new();
        let mut rejected_by_category = BTreeMap::new();
        let mut usable = 0usize;
        for diag in &frame_diagnostics {
            if diag.included {
                usable += 1;
                continue;
            }
            *rejected_by_reason
                .entry(diag.reason_code.clone())
                .or_insert(0) += 1;
            *rejected_by_category
                .entry(diag.reason_category.clone())
                .or_insert(0) += 1;
        }
        let total = frame_diagnostics.len();
        Self {
            total_frames_evaluated: total,
            usable_frames: usable,
            rejected_frames: total - usable,
            rejected_by_reason,
            rejected_by_category,
            frame_diagnostics,
        }
    }
}

/// Solved camera intrinsics plus the pattern geometry and frame bookkeeping
/// behind them.
///
/// Present only when at least three frames yielded detected corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicCalibrationDetails {
    pub pattern_type: String,
    pub pattern_cols: usize,
    pub pattern_rows: usize,
    pub square_size_mm: f64,
    pub image_width_px: u32,
    pub image_height_px: u32,
    /// Row-major 3x3 camera matrix.
    pub camera_matrix: [f64; 9],
    pub distortion_coefficients: Vec<f64>,
    pub used_frame_ids: Vec<String>,
    /// `frame_id:reason_code` entries for rejected frames, in capture order.
    pub rejected_frame_reasons: Vec<String>,
    pub rejected_by_reason: BTreeMap<String, usize>,
    pub rejected_by_category: BTreeMap<String, usize>,
    pub frame_diagnostics: Vec<IntrinsicFrameDiagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub profile_id: String,
    pub calibrated_at_ms: u64,
    pub reprojection_error_px: f64,
    pub scale_error_mm: f64,
    pub within_tolerance: bool,
    pub notes: String,
    pub intrinsics: Option<IntrinsicCalibrationDetails>,
    pub diagnostics: IntrinsicDiagnosticsSummary,
}

impl CalibrationResult {
    pub fn used_intrinsic_frames(&self) -> usize {
        self.intrinsics
            .as_ref()
            .map(|details| details.used_frame_ids.len())
            .unwrap_or(0)
    }
}

/// Residual sample sets feeding the percentile reprojection gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResidualSamples {
    pub reprojection_px: Vec<f64>,
    pub scale_mm: Vec<f64>,
}

/// Derived, read-only summary of calibration quality for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationQualitySummary {
    pub reprojection_error_px: f64,
    pub scale_error_mm: f64,
    pub reprojection_residuals_px: Vec<f64>,
    pub scale_residuals_mm: Vec<f64>,
    pub gate_pass: bool,
    /// Itemized failure strings; empty exactly when `gate_pass` is true.
    pub gate_failures: Vec<String>,
    pub used_intrinsic_frames: usize,
    pub min_required_intrinsic_frames: usize,
    pub intrinsic_frames_evaluated: usize,
    pub intrinsic_frames_rejected: usize,
    pub rejected_by_reason: BTreeMap<String, usize>,
    pub rejected_by_category: BTreeMap<String, usize>,
    pub frame_diagnostics: Vec<IntrinsicFrameDiagnostic>,
    pub underlay_scale_confidence: f64,
    pub underlay_pose_quality: f64,
    pub summary: String,
}
