//! JSON round-trip coverage for the aggregate quality report.

use benchscan_core::*;
use std::collections::BTreeMap;

fn sample_frames() -> Vec<CaptureFrame> {
    (0..3)
        .map(|i| CaptureFrame {
            frame_id: format!("cam-0-f-{i:03}"),
            captured_at_ms: 1_700_000_000_000 + i * 100,
            source_timestamp_ms: Some(120.5 + i as f64 * 33.4),
            sharpness_score: 0.91 - i as f64 * 0.015,
            exposure_score: 0.88,
            accepted: i != 2,
            preview_image_path: (i == 0).then(|| "previews/f-000.png".into()),
        })
        .collect()
}

fn sample_report() -> ScanQualityReport {
    let frames = sample_frames();
    let capture = CaptureResult {
        camera_device_id: "cam-0".into(),
        selected_mode: CameraCaptureMode::new(1920, 1080, 30, "MJPG"),
        captured_frame_count: frames.len(),
        accepted_frame_count: 2,
        required_accepted_frames: 2,
        capture_attempts_used: 1,
        reliability_target_met: true,
        reliability_failure_reason: None,
        frames,
        backend: BackendKind::Simulated,
        exposure_lock_requested: true,
        white_balance_lock_requested: true,
        exposure_lock_verified: Some(true),
        white_balance_lock_verified: None,
        timestamp_source: "device-clock".into(),
        timestamps_monotonic: true,
        notes: "device=Simulated Bench Camera".into(),
    };

    let diagnostics = IntrinsicDiagnosticsSummary::from_frames(vec![
        IntrinsicFrameDiagnostic {
            frame_id: "cam-0-f-000".into(),
            included: true,
            reason_code: "used_for_intrinsics".into(),
            reason_category: "included".into(),
        },
        IntrinsicFrameDiagnostic {
            frame_id: "cam-0-f-001".into(),
            included: false,
            reason_code: "preview_missing".into(),
            reason_category: "input_missing".into(),
        },
    ]);

    let calibration = CalibrationResult {
        profile_id: "calib-s-42".into(),
        calibrated_at_ms: 1_700_000_000_500,
        reprojection_error_px: 0.214,
        scale_error_mm: 0.072,
        within_tolerance: true,
        notes: "checkerboard-derived; frames_used=3".into(),
        intrinsics: Some(IntrinsicCalibrationDetails {
            pattern_type: "checkerboard".into(),
            pattern_cols: 9,
            pattern_rows: 6,
            square_size_mm: 10.0,
            image_width_px: 1280,
            image_height_px: 720,
            camera_matrix: [812.3, 0.0, 640.1, 0.0, 811.7, 359.8, 0.0, 0.0, 1.0],
            distortion_coefficients: vec![-0.021, 0.004],
            used_frame_ids: vec!["cam-0-f-000".into()],
            rejected_frame_reasons: vec!["cam-0-f-001:preview_missing".into()],
            rejected_by_reason: diagnostics.rejected_by_reason.clone(),
            rejected_by_category: diagnostics.rejected_by_category.clone(),
            frame_diagnostics: diagnostics.frame_diagnostics.clone(),
        }),
        diagnostics,
    };

    let underlay = UnderlayVerificationResult {
        performed: true,
        underlay_pattern_id: "mata-10mm-grid".into(),
        detection_mode: UnderlayDetectionMode::CheckerboardGeometry,
        expected_box_size_mm: 10.0,
        measured_box_sizes_mm: vec![9.98, 10.02, 10.01, 11.2],
        inlier_box_sizes_mm: vec![9.98, 10.02, 10.01],
        mean_box_size_mm: 10.003,
        mean_absolute_error_mm: 0.016,
        max_absolute_error_mm: 0.02,
        fit_confidence: 0.69,
        scale_confidence: 0.84,
        pose_quality: 0.77,
        grid_spacing_px: 41.3,
        grid_spacing_stddev_px: 0.8,
        homography_inlier_ratio: 0.96,
        pose_reprojection_error_px: 0.41,
        geometry_derived: true,
        pass: true,
        notes: "underlay print scale verification passed".into(),
    };

    let mut rejection_counts = BTreeMap::new();
    rejection_counts.insert("manual_reject".to_string(), 1usize);

    ScanQualityReport {
        session_id: "s-42".into(),
        generated_at_ms: 1_700_000_001_000,
        preflight: CapturePreflightResult {
            pass: true,
            selected_camera: Some(SelectedCameraInfo {
                device_id: "cam-0".into(),
                display_name: "Simulated Bench Camera".into(),
            }),
            modes: vec![CameraCaptureMode::new(1280, 720, 60, "YUY2")],
            backend_candidate: Some(BackendKind::Simulated),
            simulated_fallback_allowed: true,
            exposure_lock_verification_supported: true,
            white_balance_lock_verification_supported: true,
            timestamp_readiness_pass: true,
            blocking_issues: vec![],
            warnings: vec!["running with simulated backend".into()],
            summary: "preflight pass".into(),
        },
        capture,
        capture_quality: CaptureQualitySummary {
            total_frames: 3,
            accepted_frames: 2,
            accepted_ratio: 2.0 / 3.0,
            mean_sharpness: 0.895,
            mean_exposure: 0.88,
            timestamp_coverage: 1.0,
            frame_interval_mean_ms: 33.4,
            frame_interval_jitter_ms: 0.0,
            rejection_counts,
            reliability_pass: false,
            warnings: vec!["only 3 frames were captured (need at least 3 for stable statistics)".into()],
            summary: "capture quality degraded".into(),
        },
        underlay_verification: underlay,
        calibration,
        calibration_quality: CalibrationQualitySummary {
            reprojection_error_px: 0.214,
            scale_error_mm: 0.072,
            reprojection_residuals_px: vec![0.10, 0.12, 0.16, 0.18, 0.85],
            scale_residuals_mm: vec![0.08, 0.12, 0.10],
            gate_pass: true,
            gate_failures: vec![],
            used_intrinsic_frames: 3,
            min_required_intrinsic_frames: 3,
            intrinsic_frames_evaluated: 2,
            intrinsic_frames_rejected: 1,
            rejected_by_reason: BTreeMap::new(),
            rejected_by_category: BTreeMap::new(),
            frame_diagnostics: vec![],
            underlay_scale_confidence: 0.84,
            underlay_pose_quality: 0.77,
            summary: "calibration quality gates passed".into(),
        },
        validation: ValidationReport {
            session_id: "s-42".into(),
            generated_at_ms: 1_700_000_001_000,
            tolerance_mm: 0.5,
            measurements: vec![DimensionMeasurement {
                name: "Width".into(),
                reference_mm: 44.0,
                measured_mm: 43.871,
                absolute_error_mm: 0.129,
            }],
            max_absolute_error_mm: 0.129,
            mean_absolute_error_mm: 0.129,
            pass: true,
            summary: "validation pass".into(),
        },
    }
}

#[test]
fn report_round_trips_through_json() {
    let report = sample_report();
    let json = serde_json::to_string_pretty(&report).expect("serialize");
    let back: ScanQualityReport = serde_json::from_str(&json).expect("deserialize");

    // serde_json emits shortest-round-trip floats, so full equality holds and
    // list ordering is preserved.
    assert_eq!(report, back);
    assert_eq!(
        back.calibration_quality.reprojection_residuals_px,
        vec![0.10, 0.12, 0.16, 0.18, 0.85]
    );
    assert_eq!(
        back.calibration.intrinsics.as_ref().unwrap().camera_matrix[0],
        812.3
    );
}

#[test]
fn gate_failures_empty_iff_gate_pass() {
    let report = sample_report();
    assert_eq!(
        report.calibration_quality.gate_pass,
        report.calibration_quality.gate_failures.is_empty()
    );
}

#[test]
fn inlier_sizes_are_subset_of_measured() {
    let report = sample_report();
    let underlay = &report.underlay_verification;
    assert!(underlay
        .inlier_box_sizes_mm
        .iter()
        .all(|v| underlay.measured_box_sizes_mm.contains(v)));
}
