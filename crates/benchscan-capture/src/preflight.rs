use crate::backend::infer_backend;
use crate::contract::{DeviceDiscovery, ModeDiscovery};
use benchscan_core::{
    BackendKind, CancelToken, CapturePreflightResult, CaptureSettings, ScanError, ScanSession,
    SelectedCameraInfo,
};

/// Evaluate capture readiness before the first attempt.
///
/// Produces a result rather than an error even when it fails; the
/// orchestrator turns a failed preflight into the pipeline's only fatal
/// stage outcome.
pub fn evaluate_preflight(
    session: &ScanSession,
    settings: &CaptureSettings,
    discovery: &dyn DeviceDiscovery,
    modes: &dyn ModeDiscovery,
    cancel: &CancelToken,
) -> Result<CapturePreflightResult, ScanError> {
    cancel.ensure_active()?;

    let mut blocking_issues = Vec::new();
    let mut warnings = Vec::new();

    let devices = discovery.list_available(cancel)?;
    let selected = devices
        .iter()
        .filter(|d| d.is_available)
        .find(|d| d.device_id.eq_ignore_ascii_case(&session.camera_device_id))
        .or_else(|| devices.iter().find(|d| d.is_available));

    let Some(selected) = selected else {
        blocking_issues.push("no available camera device was discovered".to_string());
        return Ok(CapturePreflightResult {
            pass: false,
            selected_camera: None,
            modes: vec![],
            backend_candidate: None,
            simulated_fallback_allowed: settings.allow_simulated_fallback,
            exposure_lock_verification_supported: false,
            white_balance_lock_verification_supported: false,
            timestamp_readiness_pass: false,
            blocking_issues,
            warnings,
            summary: "preflight failed: no available camera device".to_string(),
        });
    };

    let backend_candidate = infer_backend(&selected.device_id);
    let mode_list = modes.supported_modes(&selected.device_id, cancel)?;
    if mode_list.is_empty() {
        blocking_issues
            .push("no supported capture modes were discovered for the selected camera".to_string());
    }

    // Unknown backends cannot verify locks or name a timestamp source.
    let lock_verification_supported = backend_candidate.is_some();
    let timestamp_readiness_pass = backend_candidate.is_some();

    if settings.lock_exposure && !lock_verification_supported {
        blocking_issues
            .push("exposure lock verification is not supported for the selected backend".to_string());
    }
    if settings.lock_white_balance && !lock_verification_supported {
        blocking_issues.push(
            "white balance lock verification is not supported for the selected backend".to_string(),
        );
    }
    if !timestamp_readiness_pass {
        blocking_issues
            .push("frame timestamp source is not known for the selected backend".to_string());
    }

    if backend_candidate == Some(BackendKind::Simulated) {
        if settings.allow_simulated_fallback {
            warnings.push("running with the simulated capture backend (test mode)".to_string());
        } else {
            blocking_issues
                .push("simulated capture backend is not allowed for this run".to_string());
        }
    }

    if !selected
        .device_id
        .eq_ignore_ascii_case(&session.camera_device_id)
    {
        warnings.push(format!(
            "requested camera '{}' was unavailable; selected '{}' instead",
            session.camera_device_id, selected.device_id
        ));
    }

    let pass = blocking_issues.is_empty();
    let summary = if pass {
        "preflight pass: capture backend and camera capabilities satisfy session requirements"
            .to_string()
    } else {
        "preflight failed: one or more capture readiness checks did not pass".to_string()
    };

    log::info!(
        "preflight {} for device {} (backend {:?})",
        if pass { "passed" } else { "failed" },
        selected.device_id,
        backend_candidate
    );

    Ok(CapturePreflightResult {
        pass,
        selected_camera: Some(SelectedCameraInfo {
            device_id: selected.device_id.clone(),
            display_name: selected.display_name.clone(),
        }),
        modes: mode_list,
        backend_candidate,
        simulated_fallback_allowed: settings.allow_simulated_fallback,
        exposure_lock_verification_supported: lock_verification_supported,
        white_balance_lock_verification_supported: lock_verification_supported,
        timestamp_readiness_pass,
        blocking_issues,
        warnings,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::{SimulatedDeviceDiscovery, SimulatedModeDiscovery};

    fn session() -> ScanSession {
        ScanSession::new("s-1", "sim-bench-cam-01", "bench test run")
    }

    #[test]
    fn simulated_backend_passes_when_allowed() {
        let settings = CaptureSettings {
            allow_simulated_fallback: true,
            ..CaptureSettings::default()
        };
        let result = evaluate_preflight(
            &session(),
            &settings,
            &SimulatedDeviceDiscovery,
            &SimulatedModeDiscovery,
            &CancelToken::new(),
        )
        .expect("preflight");

        assert!(result.pass);
        assert_eq!(result.backend_candidate, Some(BackendKind::Simulated));
        assert!(result.warnings.iter().any(|w| w.contains("test mode")));
        assert!(result.blocking_issues.is_empty());
    }

    #[test]
    fn simulated_backend_blocks_when_disallowed() {
        let settings = CaptureSettings {
            allow_simulated_fallback: false,
            ..CaptureSettings::default()
        };
        let result = evaluate_preflight(
            &session(),
            &settings,
            &SimulatedDeviceDiscovery,
            &SimulatedModeDiscovery,
            &CancelToken::new(),
        )
        .expect("preflight");

        assert!(!result.pass);
        assert!(result
            .blocking_issues
            .iter()
            .any(|issue| issue.contains("not allowed")));
    }

    #[test]
    fn unavailable_requested_camera_reroutes_with_a_warning() {
        let settings = CaptureSettings {
            allow_simulated_fallback: true,
            ..CaptureSettings::default()
        };
        let session = ScanSession::new("s-2", "usb-hd-cam-99", "test");
        let result = evaluate_preflight(
            &session,
            &settings,
            &SimulatedDeviceDiscovery,
            &SimulatedModeDiscovery,
            &CancelToken::new(),
        )
        .expect("preflight");

        assert!(result.pass);
        let selected = result.selected_camera.expect("camera");
        assert_eq!(selected.device_id, "sim-bench-cam-01");
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("usb-hd-cam-99")));
    }
}
