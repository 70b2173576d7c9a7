use crate::calib::{CalibrationQualitySummary, CalibrationResult};
use crate::capture::{CapturePreflightResult, CaptureResult};
use crate::measure::ValidationReport;
use crate::quality::CaptureQualitySummary;
use crate::underlay::UnderlayVerificationResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Full serialized quality picture of one scan session.
///
/// Serializes as a tree of the per-stage records; round-trips through JSON
/// without losing numeric precision or list ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanQualityReport {
    pub session_id: String,
    pub generated_at_ms: u64,
    pub preflight: CapturePreflightResult,
    pub capture: CaptureResult,
    pub capture_quality: CaptureQualitySummary,
    pub underlay_verification: UnderlayVerificationResult,
    pub calibration: CalibrationResult,
    pub calibration_quality: CalibrationQualitySummary,
    pub validation: ValidationReport,
}

/// Everything the orchestrator hands back to its caller.
///
/// `success` is the orchestrator's conjunction of the four stage gates; no
/// other component combines pass/fail flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    pub preflight: CapturePreflightResult,
    pub capture: CaptureResult,
    pub capture_quality: CaptureQualitySummary,
    pub calibration: CalibrationResult,
    pub calibration_quality: CalibrationQualitySummary,
    pub underlay_verification: UnderlayVerificationResult,
    pub validation: ValidationReport,
    pub mesh_path: PathBuf,
    pub sketch_paths: Vec<PathBuf>,
    pub report_path: PathBuf,
    pub message: String,
}
