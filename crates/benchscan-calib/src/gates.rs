use benchscan_core::stats::percentile;
use benchscan_core::{
    CalibrationResidualSamples, CalibrationResult, GateThresholds, UnderlayVerificationResult,
};

/// Evaluate the calibration quality gates.
///
/// Pure decision function: the same inputs always produce the same ordered
/// failure list, and an empty list is the pass signal. Nothing here throws;
/// the orchestrator folds the outcome into overall success.
pub fn evaluate_calibration_gates(
    calibration: &CalibrationResult,
    residuals: &CalibrationResidualSamples,
    underlay: &UnderlayVerificationResult,
    require_intrinsic_frames: bool,
) -> Vec<String> {
    let mut failures = Vec::new();

    let used = calibration.used_intrinsic_frames();
    if require_intrinsic_frames && used < GateThresholds::MIN_USABLE_INTRINSIC_FRAMES {
        failures.push(format!(
            "intrinsic_frames={used} < {}",
            GateThresholds::MIN_USABLE_INTRINSIC_FRAMES
        ));
    }

    if !residuals.reprojection_px.is_empty() {
        let p95 = percentile(
            &residuals.reprojection_px,
            GateThresholds::REPROJECTION_ERROR_PERCENTILE,
        );
        if p95 > GateThresholds::MAX_REPROJECTION_ERROR_PERCENTILE_PX {
            failures.push(format!(
                "reprojection_p95={p95:.3} > {:.3}",
                GateThresholds::MAX_REPROJECTION_ERROR_PERCENTILE_PX
            ));
        }
    } else if calibration.reprojection_error_px > GateThresholds::MAX_REPROJECTION_ERROR_PX {
        failures.push(format!(
            "reprojection_error={:.3} > {:.3}",
            calibration.reprojection_error_px,
            GateThresholds::MAX_REPROJECTION_ERROR_PX
        ));
    }

    if underlay.scale_confidence < GateThresholds::MIN_UNDERLAY_SCALE_CONFIDENCE {
        failures.push(format!(
            "scale_confidence={:.3} < {:.3}",
            underlay.scale_confidence,
            GateThresholds::MIN_UNDERLAY_SCALE_CONFIDENCE
        ));
    }

    if underlay.pose_quality < GateThresholds::MIN_UNDERLAY_POSE_QUALITY {
        failures.push(format!(
            "pose_quality={:.3} < {:.3}",
            underlay.pose_quality,
            GateThresholds::MIN_UNDERLAY_POSE_QUALITY
        ));
    }

    failures
}
