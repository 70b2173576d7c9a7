use crate::artifacts::{write_mesh_obj, write_quality_report_json, write_sketches_svg};
use crate::measure::{baseline_measurement_profile, build_validation_report, measure_dimensions};
use benchscan_calib::{
    calibrate_session, estimate_underlay_box_sizes, evaluate_calibration_gates,
    residual_samples_for, validate_underlay,
};
use benchscan_capture::{
    analyze_capture_quality, capture_with_reliability, evaluate_preflight, resolve_providers,
};
use benchscan_core::{
    now_millis, CalibrationQualitySummary, CancelToken, CaptureSettings, GateThresholds,
    PipelineResult, PolicyConfig, ScanError, ScanQualityReport, ScanSession,
};
use std::fs;
use std::path::Path;

const EXPECTED_UNDERLAY_BOX_MM: f64 = 10.0;
const UNDERLAY_TOLERANCE_MM: f64 = 0.2;
const DIMENSION_TOLERANCE_MM: f64 = 0.5;

/// Run the whole scan pipeline for one session.
///
/// Stage order is strict: preflight, capture, calibration, underlay
/// estimation and validation, gate evaluation, measurement, validation,
/// artifact emission. A failed preflight raises `PreflightFailed`; every
/// other stage lands in the result records, and this function alone combines
/// the four stage gates into overall success.
pub fn run_scan_pipeline(
    session: &ScanSession,
    output_root: &Path,
    cancel: &CancelToken,
) -> Result<PipelineResult, ScanError> {
    let policy = PolicyConfig::resolve(session);
    let settings = CaptureSettings {
        allow_simulated_fallback: policy.allow_simulated_backend,
        ..CaptureSettings::default()
    };

    let output_dir = output_root.join(&session.session_id);
    let preview_dir = output_dir.join("previews");
    fs::create_dir_all(&preview_dir)?;

    let providers = resolve_providers(None, Some(preview_dir.clone()));
    let preflight = evaluate_preflight(
        session,
        &settings,
        &providers.discovery,
        &providers.modes,
        cancel,
    )?;
    if !preflight.pass {
        return Err(ScanError::PreflightFailed {
            issues: preflight.blocking_issues,
        });
    }

    let capture_session = match &preflight.selected_camera {
        Some(camera) => session.with_camera_device(&camera.device_id),
        None => session.clone(),
    };
    let routed_settings = match preflight.backend_candidate {
        Some(backend) => settings.with_preferred_backend(backend),
        None => settings,
    };
    let providers = resolve_providers(routed_settings.preferred_backend, Some(preview_dir));

    let capture = capture_with_reliability(
        &capture_session,
        &routed_settings,
        &providers.discovery,
        &providers.modes,
        &providers.capture,
        cancel,
    )?;
    log::info!(
        "capture: {}/{} frames accepted in {} attempt(s)",
        capture.accepted_frame_count,
        capture.captured_frame_count,
        capture.capture_attempts_used
    );

    let calibration = calibrate_session(session, &capture, cancel)?;
    let residuals = residual_samples_for(Some(&capture));
    let capture_quality = analyze_capture_quality(&capture);

    let underlay_estimate = estimate_underlay_box_sizes(
        &capture,
        EXPECTED_UNDERLAY_BOX_MM,
        calibration.intrinsics.as_ref(),
        cancel,
    )?;
    let underlay_verification = validate_underlay(
        &routed_settings.underlay_pattern,
        EXPECTED_UNDERLAY_BOX_MM,
        &underlay_estimate,
        UNDERLAY_TOLERANCE_MM,
    );

    let gate_failures = evaluate_calibration_gates(
        &calibration,
        &residuals,
        &underlay_verification,
        policy.require_strict_intrinsic_gate,
    );
    let gate_pass = gate_failures.is_empty();

    let calibration_quality = CalibrationQualitySummary {
        reprojection_error_px: calibration.reprojection_error_px,
        scale_error_mm: calibration.scale_error_mm,
        reprojection_residuals_px: residuals.reprojection_px.clone(),
        scale_residuals_mm: residuals.scale_mm.clone(),
        gate_pass,
        gate_failures: gate_failures.clone(),
        used_intrinsic_frames: calibration.used_intrinsic_frames(),
        min_required_intrinsic_frames: GateThresholds::MIN_USABLE_INTRINSIC_FRAMES,
        intrinsic_frames_evaluated: calibration.diagnostics.total_frames_evaluated,
        intrinsic_frames_rejected: calibration.diagnostics.rejected_frames,
        rejected_by_reason: calibration.diagnostics.rejected_by_reason.clone(),
        rejected_by_category: calibration.diagnostics.rejected_by_category.clone(),
        frame_diagnostics: calibration.diagnostics.frame_diagnostics.clone(),
        underlay_scale_confidence: underlay_verification.scale_confidence,
        underlay_pose_quality: underlay_verification.pose_quality,
        summary: if gate_pass {
            "calibration quality gates passed".to_string()
        } else {
            format!("calibration quality gate failed: {}", gate_failures.join("; "))
        },
    };

    let profile = baseline_measurement_profile();
    let measurements = measure_dimensions(&profile, &calibration, cancel)?;
    let validation = build_validation_report(session, measurements, DIMENSION_TOLERANCE_MM);

    let quality_report = ScanQualityReport {
        session_id: session.session_id.clone(),
        generated_at_ms: now_millis(),
        preflight: preflight.clone(),
        capture: capture.clone(),
        capture_quality: capture_quality.clone(),
        underlay_verification: underlay_verification.clone(),
        calibration: calibration.clone(),
        calibration_quality: calibration_quality.clone(),
        validation: validation.clone(),
    };

    let mesh_path = write_mesh_obj(&session.session_id, &validation.measurements, &output_dir)?;
    let sketch_paths =
        write_sketches_svg(&session.session_id, &validation.measurements, &output_dir)?;
    let report_path = write_quality_report_json(&quality_report, &output_dir)?;

    let success = capture.reliability_target_met
        && gate_pass
        && underlay_verification.pass
        && validation.pass;
    let message = if success {
        "pipeline executed: capture, underlay, calibration, and dimensional checks are within configured tolerances".to_string()
    } else {
        format!(
            "pipeline executed with failed quality gates. capture gate: {}; calibration gate: {}; underlay pass: {}; validation pass: {}",
            capture
                .reliability_failure_reason
                .as_deref()
                .unwrap_or("passed"),
            if gate_pass {
                "passed".to_string()
            } else {
                gate_failures.join(" | ")
            },
            underlay_verification.pass,
            validation.pass
        )
    };
    log::info!("pipeline finished: success={success}");

    Ok(PipelineResult {
        success,
        preflight,
        capture,
        capture_quality,
        calibration,
        calibration_quality,
        underlay_verification,
        validation,
        mesh_path,
        sketch_paths,
        report_path,
        message,
    })
}
