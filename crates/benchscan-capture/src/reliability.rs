use crate::contract::{DeviceDiscovery, FrameCapture, ModeDiscovery};
use benchscan_core::{
    BackendKind, CameraCaptureMode, CancelToken, CaptureFrame, CaptureResult, CaptureSettings,
    FrameCaptureOutcome, ScanError, ScanSession,
};

/// Drive capture attempts until the acceptance target is met or attempts run
/// out, keeping the best attempt seen.
///
/// The acceptance target is `min_accepted_frames` clamped to
/// `[1, target_frame_count]`; the attempt budget is at least 1. A provider
/// that lands on the simulated backend while simulated fallback is disabled
/// is a fatal configuration error, not a retry. The cancel token is checked
/// before every attempt.
pub fn capture_with_reliability(
    session: &ScanSession,
    settings: &CaptureSettings,
    discovery: &dyn DeviceDiscovery,
    modes: &dyn ModeDiscovery,
    capture: &dyn FrameCapture,
    cancel: &CancelToken,
) -> Result<CaptureResult, ScanError> {
    cancel.ensure_active()?;

    let devices = discovery.list_available(cancel)?;
    let selected = devices
        .iter()
        .filter(|d| d.is_available)
        .find(|d| d.device_id.eq_ignore_ascii_case(&session.camera_device_id))
        .or_else(|| devices.iter().find(|d| d.is_available));

    let (device_id, device_name, preferred_mode) = match selected {
        Some(device) => (
            device.device_id.clone(),
            device.display_name.clone(),
            device.preferred_mode.clone(),
        ),
        None => (
            session.camera_device_id.clone(),
            "session-camera-fallback".to_string(),
            None,
        ),
    };

    let supported = modes.supported_modes(&device_id, cancel)?;
    let selected_mode = preferred_mode
        .or_else(|| supported.first().cloned())
        .unwrap_or_else(|| CameraCaptureMode::new(1280, 720, 30, "Unknown"));

    let required = settings.min_accepted_frames.clamp(1, settings.target_frame_count.max(1));
    let max_attempts = settings.max_capture_attempts.max(1);

    let mut best: Option<(usize, FrameCaptureOutcome)> = None;
    let mut attempts_used = 0usize;
    for attempt in 1..=max_attempts {
        cancel.ensure_active()?;
        attempts_used = attempt;

        let outcome = capture.capture_frames(&device_id, settings, cancel)?;
        if outcome.diagnostics.backend_used == BackendKind::Simulated
            && !settings.allow_simulated_fallback
        {
            return Err(ScanError::SimulatedBackendDisallowed);
        }

        let accepted = count_accepted(&outcome.frames);
        log::debug!(
            "capture attempt {attempt}/{max_attempts}: {accepted} accepted of {} (need {required})",
            outcome.frames.len()
        );

        let is_better = best
            .as_ref()
            .map(|(best_accepted, _)| accepted > *best_accepted)
            .unwrap_or(true);
        if is_better {
            best = Some((accepted, outcome));
        }
        if accepted >= required {
            break;
        }
    }

    let (accepted_count, outcome) =
        best.expect("at least one capture attempt always runs");
    let reliability_target_met = accepted_count >= required;
    let reliability_failure_reason = if reliability_target_met {
        None
    } else {
        Some(format!(
            "accepted {accepted_count} of {required} required frames after {attempts_used} attempts"
        ))
    };

    let diag = &outcome.diagnostics;
    let notes = format!(
        "device={device_name}; mode={selected_mode}; backend={}; lockExposure={}; exposureLockVerified={}; lockWhiteBalance={}; whiteBalanceLockVerified={}; timestampSource={}; underlay={}; lighting={}",
        diag.backend_used,
        settings.lock_exposure,
        verification_label(diag.exposure_lock_verified),
        settings.lock_white_balance,
        verification_label(diag.white_balance_lock_verified),
        diag.timestamp_source,
        settings.underlay_pattern,
        settings.lighting_profile,
    );

    Ok(CaptureResult {
        camera_device_id: device_id,
        selected_mode,
        captured_frame_count: outcome.frames.len(),
        accepted_frame_count: accepted_count,
        required_accepted_frames: required,
        capture_attempts_used: attempts_used,
        reliability_target_met,
        reliability_failure_reason,
        timestamps_monotonic: timestamps_monotonic(&outcome.frames),
        backend: diag.backend_used,
        exposure_lock_requested: settings.lock_exposure,
        white_balance_lock_requested: settings.lock_white_balance,
        exposure_lock_verified: diag.exposure_lock_verified,
        white_balance_lock_verified: diag.white_balance_lock_verified,
        timestamp_source: diag.timestamp_source.clone(),
        frames: outcome.frames,
        notes,
    })
}

fn count_accepted(frames: &[CaptureFrame]) -> usize {
    frames.iter().filter(|f| f.accepted).count()
}

fn timestamps_monotonic(frames: &[CaptureFrame]) -> bool {
    frames
        .windows(2)
        .all(|w| w[1].captured_at_ms >= w[0].captured_at_ms)
}

fn verification_label(state: Option<bool>) -> &'static str {
    match state {
        Some(true) => "true",
        Some(false) => "false",
        None => "unknown",
    }
}
