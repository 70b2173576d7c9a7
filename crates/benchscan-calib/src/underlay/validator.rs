use super::round3;
use benchscan_core::stats::{mad_inliers, mean};
use benchscan_core::{UnderlayEstimate, UnderlayVerificationResult};

/// Validate measured underlay box sizes against the printed reference.
///
/// A median-absolute-deviation filter picks the inlier subset; fit
/// confidence scales the inlier ratio by how far the mean inlier error sits
/// inside the tolerance. Scale confidence and pose quality come from the
/// estimator when it produced them, and derive from fit confidence
/// otherwise.
pub fn validate_underlay(
    underlay_pattern_id: &str,
    expected_box_size_mm: f64,
    estimate: &UnderlayEstimate,
    tolerance_mm: f64,
) -> UnderlayVerificationResult {
    let measured = &estimate.measured_box_sizes_mm;
    if measured.is_empty() {
        return UnderlayVerificationResult {
            performed: false,
            underlay_pattern_id: underlay_pattern_id.to_string(),
            detection_mode: estimate.detection_mode,
            expected_box_size_mm,
            measured_box_sizes_mm: vec![],
            inlier_box_sizes_mm: vec![],
            mean_box_size_mm: 0.0,
            mean_absolute_error_mm: 0.0,
            max_absolute_error_mm: f64::MAX,
            fit_confidence: 0.0,
            scale_confidence: 0.0,
            pose_quality: 0.0,
            grid_spacing_px: estimate.grid_spacing_px,
            grid_spacing_stddev_px: estimate.grid_spacing_stddev_px,
            homography_inlier_ratio: estimate.homography_inlier_ratio,
            pose_reprojection_error_px: estimate.pose_reprojection_error_px,
            geometry_derived: estimate.geometry_derived,
            pass: false,
            notes: "no measured underlay boxes provided".to_string(),
        };
    }

    let inliers = mad_inliers(measured);
    let inlier_ratio = inliers.len() as f64 / measured.len() as f64;

    let errors: Vec<f64> = inliers
        .iter()
        .map(|v| (v - expected_box_size_mm).abs())
        .collect();
    let mean_absolute_error_mm = mean(&errors);
    let max_absolute_error_mm = errors.iter().copied().fold(0.0, f64::max);

    let tolerance = tolerance_mm.max(1e-9);
    let fit_confidence =
        (inlier_ratio * (1.0 - (mean_absolute_error_mm / tolerance).min(1.0))).clamp(0.0, 1.0);

    let scale_confidence = if estimate.scale_confidence > 0.0 {
        estimate.scale_confidence
    } else {
        round3(fit_confidence)
    };
    let pose_quality = if estimate.pose_quality > 0.0 {
        estimate.pose_quality
    } else {
        round3(fit_confidence * 0.95)
    };

    let pass = max_absolute_error_mm <= tolerance_mm;
    let notes = if pass {
        format!(
            "underlay print scale verification passed ({})",
            estimate.detection_mode
        )
    } else {
        format!(
            "underlay print scale verification failed ({})",
            estimate.detection_mode
        )
    };

    UnderlayVerificationResult {
        performed: true,
        underlay_pattern_id: underlay_pattern_id.to_string(),
        detection_mode: estimate.detection_mode,
        expected_box_size_mm,
        measured_box_sizes_mm: measured.clone(),
        mean_box_size_mm: mean(&inliers),
        inlier_box_sizes_mm: inliers,
        mean_absolute_error_mm,
        max_absolute_error_mm,
        fit_confidence,
        scale_confidence,
        pose_quality,
        grid_spacing_px: estimate.grid_spacing_px,
        grid_spacing_stddev_px: estimate.grid_spacing_stddev_px,
        homography_inlier_ratio: estimate.homography_inlier_ratio,
        pose_reprojection_error_px: estimate.pose_reprojection_error_px,
        geometry_derived: estimate.geometry_derived,
        pass,
        notes,
    }
}
