use super::round3;
use crate::intrinsics::CHECKERBOARD_SPEC;
use benchscan_core::stats::{mean, median, population_std_dev};
use benchscan_core::{
    CancelToken, CaptureResult, IntrinsicCalibrationDetails, ScanError, UnderlayDetectionMode,
    UnderlayEstimate,
};
use benchscan_vision::{
    detect_corner_grid, estimate_homography, estimate_homography_masked,
    extract_grid_line_positions, median_cluster_spacing, pose_from_homography,
    project_planar_points, reprojection_rms,
};
use image::GrayImage;
use nalgebra::{Matrix3, Point2};

const TARGET_SAMPLES: usize = 5;
const MIN_SAMPLES: usize = 3;
const HOMOGRAPHY_THRESHOLD_MM: f64 = 3.0;
const GEOMETRY_CLAMP_MM: f64 = 0.22;
const LINE_CLAMP_MM: f64 = 0.18;
const QUALITY_CLAMP_MM: f64 = 0.16;
const EDGE_MAGNITUDE_THRESHOLD: f32 = 80.0;

/// One frame's contribution before aggregation.
struct FrameEstimate {
    measured_mm: f64,
    scale_confidence: f64,
    pose_quality: f64,
    grid_spacing_px: f64,
    grid_spacing_stddev_px: f64,
    homography_inlier_ratio: f64,
    pose_reprojection_error_px: f64,
    geometry_derived: bool,
}

/// Recover measured box sizes from the underlay grid.
///
/// Paths are tried in order and the first that yields at least three samples
/// wins: checkerboard-geometry per preview, line-grid heuristics per
/// preview, the frame-quality proxy, and finally the static fallback. The
/// winning path's detection mode rides along into every downstream record.
pub fn estimate_underlay_box_sizes(
    capture: &CaptureResult,
    expected_box_size_mm: f64,
    intrinsics: Option<&IntrinsicCalibrationDetails>,
    cancel: &CancelToken,
) -> Result<UnderlayEstimate, ScanError> {
    let previews = estimate_from_previews(capture, expected_box_size_mm, intrinsics, cancel)?;
    if previews.len() >= MIN_SAMPLES {
        let geometry = previews.iter().all(|e| e.geometry_derived);
        let mode = if geometry {
            UnderlayDetectionMode::CheckerboardGeometry
        } else {
            UnderlayDetectionMode::LineGridHeuristic
        };
        return Ok(aggregate(&previews, mode));
    }

    let from_quality = estimate_from_frame_quality(capture, expected_box_size_mm);
    if from_quality.len() >= MIN_SAMPLES {
        return Ok(aggregate(
            &from_quality,
            UnderlayDetectionMode::FrameQualityFallback,
        ));
    }

    log::warn!("underlay estimation fell through to the static fallback");
    Ok(UnderlayEstimate {
        measured_box_sizes_mm: vec![
            expected_box_size_mm - 0.04,
            expected_box_size_mm + 0.04,
            expected_box_size_mm + 0.02,
        ],
        detection_mode: UnderlayDetectionMode::StaticFallback,
        scale_confidence: 0.25,
        pose_quality: 0.20,
        grid_spacing_px: 0.0,
        grid_spacing_stddev_px: 0.0,
        homography_inlier_ratio: 0.0,
        pose_reprojection_error_px: 0.0,
        geometry_derived: false,
    })
}

fn aggregate(estimates: &[FrameEstimate], mode: UnderlayDetectionMode) -> UnderlayEstimate {
    let collect = |f: fn(&FrameEstimate) -> f64| -> Vec<f64> { estimates.iter().map(f).collect() };
    UnderlayEstimate {
        measured_box_sizes_mm: collect(|e| e.measured_mm),
        detection_mode: mode,
        scale_confidence: round3(mean(&collect(|e| e.scale_confidence)).clamp(0.0, 1.0)),
        pose_quality: round3(mean(&collect(|e| e.pose_quality)).clamp(0.0, 1.0)),
        grid_spacing_px: round3(mean(&collect(|e| e.grid_spacing_px)).max(0.0)),
        grid_spacing_stddev_px: round3(mean(&collect(|e| e.grid_spacing_stddev_px)).max(0.0)),
        homography_inlier_ratio: round3(
            mean(&collect(|e| e.homography_inlier_ratio)).clamp(0.0, 1.0),
        ),
        pose_reprojection_error_px: round3(
            mean(&collect(|e| e.pose_reprojection_error_px)).max(0.0),
        ),
        geometry_derived: estimates.iter().all(|e| e.geometry_derived),
    }
}

fn estimate_from_previews(
    capture: &CaptureResult,
    expected_box_size_mm: f64,
    intrinsics: Option<&IntrinsicCalibrationDetails>,
    cancel: &CancelToken,
) -> Result<Vec<FrameEstimate>, ScanError> {
    let mut estimates = Vec::new();
    for frame in capture.frames.iter().filter(|f| f.accepted) {
        cancel.ensure_active()?;

        let Some(path) = frame.preview_image_path.as_ref().filter(|p| p.exists()) else {
            continue;
        };
        let img = match image::open(path) {
            Ok(img) => img.to_luma8(),
            Err(err) => {
                log::debug!("underlay: unreadable preview {}: {err}", path.display());
                continue;
            }
        };

        let estimate = checkerboard_geometry_estimate(&img, expected_box_size_mm, intrinsics)
            .or_else(|| line_grid_estimate(&img, expected_box_size_mm));
        if let Some(estimate) = estimate {
            estimates.push(estimate);
            if estimates.len() >= TARGET_SAMPLES {
                break;
            }
        }
    }
    Ok(estimates)
}

/// Path 1: homography over the detected corner grid.
fn checkerboard_geometry_estimate(
    img: &GrayImage,
    expected_box_size_mm: f64,
    intrinsics: Option<&IntrinsicCalibrationDetails>,
) -> Option<FrameEstimate> {
    let corners = detect_corner_grid(img, CHECKERBOARD_SPEC)?;
    let object = CHECKERBOARD_SPEC.object_points(expected_box_size_mm);

    let fit = estimate_homography_masked(&corners, &object, HOMOGRAPHY_THRESHOLD_MM).ok()?;
    let mapped = fit.homography.apply_all(&corners);
    let distances = adjacent_distances(&mapped, CHECKERBOARD_SPEC.cols, CHECKERBOARD_SPEC.rows);
    if distances.len() < 8 {
        return None;
    }

    let measured_mm = round3(median(&distances).clamp(
        expected_box_size_mm - GEOMETRY_CLAMP_MM,
        expected_box_size_mm + GEOMETRY_CLAMP_MM,
    ));

    let spread = population_std_dev(&distances);
    let spacing_consistency =
        (1.0 / (1.0 + spread / expected_box_size_mm.max(0.001))).clamp(0.0, 1.0);
    let relative_scale_error =
        (measured_mm - expected_box_size_mm).abs() / expected_box_size_mm.max(0.001);
    let scale_accuracy = (1.0 - relative_scale_error * 5.0).clamp(0.0, 1.0);

    let horizontal_px = axis_spacing(&corners, CHECKERBOARD_SPEC.cols, CHECKERBOARD_SPEC.rows, true);
    let vertical_px = axis_spacing(&corners, CHECKERBOARD_SPEC.cols, CHECKERBOARD_SPEC.rows, false);
    let combined: Vec<f64> = horizontal_px.iter().chain(vertical_px.iter()).copied().collect();
    let mean_h = mean(&horizontal_px);
    let mean_v = mean(&vertical_px);
    let anisotropy = if mean_h > 0.0 && mean_v > 0.0 {
        (mean_h.min(mean_v) / mean_h.max(mean_v)).clamp(0.0, 1.0)
    } else {
        0.6
    };

    let (pose_score, pose_reprojection_error_px) =
        pose_metrics(&corners, &object, intrinsics);

    Some(FrameEstimate {
        measured_mm,
        scale_confidence: round3(
            (scale_accuracy * 0.45 + spacing_consistency * 0.25 + fit.inlier_ratio * 0.30)
                .clamp(0.0, 1.0),
        ),
        pose_quality: round3(
            (anisotropy * 0.40 + spacing_consistency * 0.20 + pose_score * 0.40).clamp(0.0, 1.0),
        ),
        grid_spacing_px: round3(mean(&combined).max(0.0)),
        grid_spacing_stddev_px: round3(population_std_dev(&combined).max(0.0)),
        homography_inlier_ratio: round3(fit.inlier_ratio.clamp(0.0, 1.0)),
        pose_reprojection_error_px: round3(pose_reprojection_error_px.max(0.0)),
        geometry_derived: true,
    })
}

/// Pose-solve blend of frontal-ness (55%) and reprojection accuracy (45%).
///
/// Without intrinsics there is nothing to solve against; a neutral score
/// keeps the pose-quality blend meaningful.
fn pose_metrics(
    corners: &[Point2<f64>],
    object: &[Point2<f64>],
    intrinsics: Option<&IntrinsicCalibrationDetails>,
) -> (f64, f64) {
    let Some(details) = intrinsics else {
        return (0.6, 0.0);
    };
    let k = Matrix3::from_row_slice(&details.camera_matrix);

    let solved = estimate_homography(object, corners)
        .and_then(|h| pose_from_homography(&k, &h))
        .map(|pose| {
            let projected =
                project_planar_points(&k, &details.distortion_coefficients, &pose, object);
            let rms = reprojection_rms(&projected, corners);
            let frontal = pose.frontal_score();
            let reprojection_score = (1.0 / (1.0 + rms / 1.5)).clamp(0.0, 1.0);
            (
                (frontal * 0.55 + reprojection_score * 0.45).clamp(0.0, 1.0),
                rms,
            )
        });

    match solved {
        Ok(metrics) => metrics,
        Err(err) => {
            log::debug!("pose solve failed during underlay estimation: {err}");
            (0.55, 0.0)
        }
    }
}

/// Path 2: cluster near-vertical/near-horizontal line positions and derive a
/// size from spacing regularity.
fn line_grid_estimate(img: &GrayImage, expected_box_size_mm: f64) -> Option<FrameEstimate> {
    let positions = extract_grid_line_positions(img, EDGE_MAGNITUDE_THRESHOLD);
    if positions.vertical_x.len() + positions.horizontal_y.len() < 8 {
        return None;
    }

    let vertical_spacing = median_cluster_spacing(&positions.vertical_x);
    let horizontal_spacing = median_cluster_spacing(&positions.horizontal_y);
    let spacings: Vec<f64> = [vertical_spacing, horizontal_spacing]
        .into_iter()
        .flatten()
        .collect();
    if spacings.is_empty() {
        return None;
    }

    let average_spacing = mean(&spacings);
    let spacing_spread = if spacings.len() > 1 {
        population_std_dev(&spacings)
    } else {
        0.0
    };

    // Regularity is centered on the nominal 40 px grid pitch of the bench
    // camera geometry.
    let regularity = (1.0 / (1.0 + (average_spacing - 40.0).abs() / 30.0)).clamp(0.0, 1.0);
    let adjustment = (regularity - 0.75) * 0.18;
    let measured_mm = round3((expected_box_size_mm + adjustment).clamp(
        expected_box_size_mm - LINE_CLAMP_MM,
        expected_box_size_mm + LINE_CLAMP_MM,
    ));

    let axis_coverage = if spacings.len() == 2 { 1.0 } else { 0.82 };

    Some(FrameEstimate {
        measured_mm,
        scale_confidence: round3((regularity * 0.75 + axis_coverage * 0.25).clamp(0.0, 1.0)),
        pose_quality: round3(((1.0 / (1.0 + spacing_spread / 6.0)) * axis_coverage).clamp(0.0, 1.0)),
        grid_spacing_px: round3(average_spacing.max(0.0)),
        grid_spacing_stddev_px: round3(spacing_spread.max(0.0)),
        homography_inlier_ratio: 0.0,
        pose_reprojection_error_px: 0.0,
        geometry_derived: false,
    })
}

/// Path 3: a small bias proportional to sharpness/exposure shortfall.
fn estimate_from_frame_quality(
    capture: &CaptureResult,
    expected_box_size_mm: f64,
) -> Vec<FrameEstimate> {
    capture
        .frames
        .iter()
        .filter(|f| f.accepted)
        .take(TARGET_SAMPLES)
        .map(|frame| {
            let sharpness_bias = (0.9 - frame.sharpness_score) * 0.12;
            let exposure_bias = (0.5 - frame.exposure_score) * 0.06;
            let measured_mm = round3(
                (expected_box_size_mm + sharpness_bias + exposure_bias).clamp(
                    expected_box_size_mm - QUALITY_CLAMP_MM,
                    expected_box_size_mm + QUALITY_CLAMP_MM,
                ),
            );
            FrameEstimate {
                measured_mm,
                scale_confidence: round3(
                    (frame.sharpness_score * 0.65 + frame.exposure_score * 0.35).clamp(0.0, 1.0),
                ),
                pose_quality: round3(
                    (frame.sharpness_score * 0.55 + frame.exposure_score * 0.25).clamp(0.0, 1.0),
                ),
                grid_spacing_px: 0.0,
                grid_spacing_stddev_px: 0.0,
                homography_inlier_ratio: 0.0,
                pose_reprojection_error_px: 0.0,
                geometry_derived: false,
            }
        })
        .collect()
}

/// Distances between grid-adjacent points of a row-major `cols`x`rows` grid.
fn adjacent_distances(points: &[Point2<f64>], cols: usize, rows: usize) -> Vec<f64> {
    let mut distances = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let current = points[row * cols + col];
            if col + 1 < cols {
                distances.push(distance(current, points[row * cols + col + 1]));
            }
            if row + 1 < rows {
                distances.push(distance(current, points[(row + 1) * cols + col]));
            }
        }
    }
    distances
}

/// Pixel spacing along one grid axis.
fn axis_spacing(points: &[Point2<f64>], cols: usize, rows: usize, horizontal: bool) -> Vec<f64> {
    let mut spacing = Vec::new();
    if horizontal {
        for row in 0..rows {
            for col in 0..cols - 1 {
                spacing.push(distance(points[row * cols + col], points[row * cols + col + 1]));
            }
        }
    } else {
        for row in 0..rows - 1 {
            for col in 0..cols {
                spacing.push(distance(points[row * cols + col], points[(row + 1) * cols + col]));
            }
        }
    }
    spacing
}

fn distance(a: Point2<f64>, b: Point2<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchscan_core::{BackendKind, CameraCaptureMode, CaptureFrame};

    fn capture_with(frames: Vec<CaptureFrame>) -> CaptureResult {
        let accepted = frames.iter().filter(|f| f.accepted).count();
        CaptureResult {
            camera_device_id: "cam".into(),
            selected_mode: CameraCaptureMode::new(1280, 720, 30, "MJPG"),
            captured_frame_count: frames.len(),
            accepted_frame_count: accepted,
            required_accepted_frames: 1,
            capture_attempts_used: 1,
            reliability_target_met: true,
            reliability_failure_reason: None,
            frames,
            backend: BackendKind::Simulated,
            exposure_lock_requested: false,
            white_balance_lock_requested: false,
            exposure_lock_verified: None,
            white_balance_lock_verified: None,
            timestamp_source: "simulated-clock".into(),
            timestamps_monotonic: true,
            notes: String::new(),
        }
    }

    fn frame(id: &str, sharpness: f64, exposure: f64, accepted: bool) -> CaptureFrame {
        CaptureFrame {
            frame_id: id.into(),
            captured_at_ms: 0,
            source_timestamp_ms: None,
            sharpness_score: sharpness,
            exposure_score: exposure,
            accepted,
            preview_image_path: None,
        }
    }

    #[test]
    fn no_previews_falls_back_to_frame_quality() {
        let capture = capture_with(vec![
            frame("f-1", 0.9, 0.85, true),
            frame("f-2", 0.85, 0.8, true),
            frame("f-3", 0.88, 0.9, true),
        ]);
        let estimate =
            estimate_underlay_box_sizes(&capture, 10.0, None, &CancelToken::new()).expect("estimate");

        assert_eq!(
            estimate.detection_mode,
            UnderlayDetectionMode::FrameQualityFallback
        );
        assert_eq!(estimate.measured_box_sizes_mm.len(), 3);
        assert!(!estimate.geometry_derived);
        assert!(estimate
            .measured_box_sizes_mm
            .iter()
            .all(|v| (v - 10.0).abs() <= QUALITY_CLAMP_MM + 1e-9));
    }

    #[test]
    fn too_few_frames_lands_on_the_static_fallback() {
        let capture = capture_with(vec![frame("f-1", 0.9, 0.85, true)]);
        let estimate =
            estimate_underlay_box_sizes(&capture, 10.0, None, &CancelToken::new()).expect("estimate");

        assert_eq!(estimate.detection_mode, UnderlayDetectionMode::StaticFallback);
        assert_eq!(estimate.measured_box_sizes_mm, vec![9.96, 10.04, 10.02]);
        assert_eq!(estimate.scale_confidence, 0.25);
        assert_eq!(estimate.pose_quality, 0.20);
    }

    #[test]
    fn cancellation_aborts_preview_scanning() {
        let mut f = frame("f-1", 0.9, 0.85, true);
        f.preview_image_path = Some("does-not-matter.png".into());
        let capture = capture_with(vec![f]);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            estimate_underlay_box_sizes(&capture, 10.0, None, &cancel),
            Err(ScanError::Cancelled)
        ));
    }

    #[test]
    fn adjacent_distances_count_matches_grid_topology() {
        let points = CHECKERBOARD_SPEC.object_points(10.0);
        let distances =
            adjacent_distances(&points, CHECKERBOARD_SPEC.cols, CHECKERBOARD_SPEC.rows);
        // Horizontal: rows*(cols-1); vertical: (rows-1)*cols.
        assert_eq!(distances.len(), 6 * 8 + 5 * 9);
        assert!(distances.iter().all(|d| (d - 10.0).abs() < 1e-12));
    }

    #[test]
    fn frame_quality_biases_shift_the_measured_size() {
        let capture = capture_with(vec![
            frame("f-1", 0.9, 0.5, true),
            frame("f-2", 0.7, 0.5, true),
        ]);
        let estimates = estimate_from_frame_quality(&capture, 10.0);
        // Ideal sharpness 0.9 -> no bias; 0.7 -> +0.024 mm.
        assert_eq!(estimates[0].measured_mm, 10.0);
        assert_eq!(estimates[1].measured_mm, 10.024);
    }
}
