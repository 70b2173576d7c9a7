//! Frame-exclusion and fallback behavior of the intrinsic calibration engine.

use benchscan_calib::calibrate_session;
use benchscan_core::{
    BackendKind, CameraCaptureMode, CancelToken, CaptureFrame, CaptureResult, ScanError,
    ScanSession,
};
use std::fs;
use std::path::PathBuf;

fn session() -> ScanSession {
    ScanSession::new("s-intrinsics", "sim-bench-cam-01", "test")
}

fn capture_with(frames: Vec<CaptureFrame>) -> CaptureResult {
    let accepted = frames.iter().filter(|f| f.accepted).count();
    CaptureResult {
        camera_device_id: "sim-bench-cam-01".into(),
        selected_mode: CameraCaptureMode::new(640, 480, 30, "MJPG"),
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

fn frame(id: &str, preview: Option<PathBuf>) -> CaptureFrame {
    CaptureFrame {
        frame_id: id.into(),
        captured_at_ms: 0,
        source_timestamp_ms: None,
        sharpness_score: 0.9,
        exposure_score: 0.5,
        accepted: true,
        preview_image_path: preview,
    }
}

#[test]
fn missing_previews_fall_back_to_the_quality_heuristic() {
    let capture = capture_with(vec![
        frame("f-1", None),
        frame("f-2", None),
        frame("f-3", None),
        frame("f-4", Some("/nonexistent/preview.png".into())),
    ]);

    let result = calibrate_session(&session(), &capture, &CancelToken::new()).expect("calibrate");

    assert!(result.intrinsics.is_none());
    assert!(result.notes.contains("frame-quality-heuristic"));
    assert_eq!(result.diagnostics.total_frames_evaluated, 4);
    assert_eq!(result.diagnostics.usable_frames, 0);
    assert_eq!(
        result.diagnostics.rejected_by_reason.get("preview_missing"),
        Some(&4)
    );
    assert_eq!(
        result.diagnostics.rejected_by_category.get("input_missing"),
        Some(&4)
    );
    // sharpness 0.9 / exposure 0.5 through the heuristic formulas.
    assert!((result.reprojection_error_px - 0.15).abs() < 1e-9);
    assert!((result.scale_error_mm - 0.047).abs() < 1e-9);
    assert!(result.within_tolerance);
}

#[test]
fn unreadable_and_featureless_previews_get_distinct_reason_codes() {
    let dir = tempfile::tempdir().expect("tempdir");

    let garbage = dir.path().join("garbage.png");
    fs::write(&garbage, b"not a png at all").expect("write garbage");

    let flat = dir.path().join("flat.png");
    image::GrayImage::from_pixel(320, 240, image::Luma([128u8]))
        .save(&flat)
        .expect("write flat image");

    let capture = capture_with(vec![
        frame("f-1", Some(garbage)),
        frame("f-2", Some(flat)),
        frame("f-3", None),
    ]);

    let result = calibrate_session(&session(), &capture, &CancelToken::new()).expect("calibrate");

    assert!(result.intrinsics.is_none());
    assert_eq!(
        result.diagnostics.rejected_by_reason.get("image_read_failed"),
        Some(&1)
    );
    assert_eq!(
        result.diagnostics.rejected_by_reason.get("corners_not_found"),
        Some(&1)
    );
    assert_eq!(
        result.diagnostics.rejected_by_reason.get("preview_missing"),
        Some(&1)
    );
    assert_eq!(
        result.diagnostics.rejected_by_category.get("detection_failure"),
        Some(&1)
    );
}

#[test]
fn rejected_frames_are_not_counted_as_usable() {
    let capture = capture_with(vec![frame("f-1", None), frame("f-2", None)]);
    let result = calibrate_session(&session(), &capture, &CancelToken::new()).expect("calibrate");

    assert_eq!(result.used_intrinsic_frames(), 0);
    assert_eq!(
        result.diagnostics.rejected_frames,
        result.diagnostics.total_frames_evaluated
    );
    let diag_ids: Vec<&str> = result
        .diagnostics
        .frame_diagnostics
        .iter()
        .map(|d| d.frame_id.as_str())
        .collect();
    assert_eq!(diag_ids, vec!["f-1", "f-2"]);
}

#[test]
fn cancellation_aborts_the_engine() {
    let capture = capture_with(vec![frame("f-1", None)]);
    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(matches!(
        calibrate_session(&session(), &capture, &cancel),
        Err(ScanError::Cancelled)
    ));
}

#[test]
fn empty_capture_takes_the_static_fallback_metrics() {
    let capture = capture_with(vec![]);
    let result = calibrate_session(&session(), &capture, &CancelToken::new()).expect("calibrate");

    assert!(result.intrinsics.is_none());
    assert!(result.notes.contains("static-fallback"));
    assert!((result.reprojection_error_px - 0.42).abs() < 1e-9);
    assert!((result.scale_error_mm - 0.12).abs() < 1e-9);
}
