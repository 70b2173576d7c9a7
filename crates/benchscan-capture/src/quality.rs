use benchscan_core::stats::{mean, population_std_dev};
use benchscan_core::{CaptureQualitySummary, CaptureResult};
use std::collections::BTreeMap;

const MIN_FRAMES_FOR_STATS: usize = 3;
const MIN_ACCEPTED_RATIO: f64 = 0.5;
const MAX_INTERVAL_JITTER_MS: f64 = 10.0;

/// Pure statistical summary of one capture result.
///
/// Collects acceptance/sharpness/exposure statistics, source-timestamp
/// coverage and inter-frame jitter, and emits a warning per degraded signal.
/// `reliability_pass` holds exactly when no warning fired.
pub fn analyze_capture_quality(capture: &CaptureResult) -> CaptureQualitySummary {
    let total = capture.frames.len();
    let accepted = capture.frames.iter().filter(|f| f.accepted).count();
    let accepted_ratio = if total == 0 {
        0.0
    } else {
        accepted as f64 / total as f64
    };

    let sharpness: Vec<f64> = capture.frames.iter().map(|f| f.sharpness_score).collect();
    let exposure: Vec<f64> = capture.frames.iter().map(|f| f.exposure_score).collect();

    let mut source_ts: Vec<f64> = capture
        .frames
        .iter()
        .filter_map(|f| f.source_timestamp_ms)
        .collect();
    source_ts.sort_by(|a, b| a.total_cmp(b));
    let timestamp_coverage = if total == 0 {
        0.0
    } else {
        source_ts.len() as f64 / total as f64
    };
    let intervals: Vec<f64> = source_ts
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|delta| *delta > 0.0)
        .collect();
    let frame_interval_mean_ms = mean(&intervals);
    let frame_interval_jitter_ms = population_std_dev(&intervals);

    let mut rejection_counts = BTreeMap::new();
    if total > accepted {
        rejection_counts.insert("provider_rejected".to_string(), total - accepted);
    }

    let mut warnings = Vec::new();
    if total < MIN_FRAMES_FOR_STATS {
        warnings.push(format!(
            "only {total} frames were captured (need at least {MIN_FRAMES_FOR_STATS} for stable statistics)"
        ));
    }
    if accepted_ratio < MIN_ACCEPTED_RATIO {
        warnings.push(format!(
            "accepted frame ratio {accepted_ratio:.2} is below {MIN_ACCEPTED_RATIO:.2}"
        ));
    }
    if capture.exposure_lock_requested && capture.exposure_lock_verified != Some(true) {
        warnings.push("exposure lock was requested but not verified".to_string());
    }
    if capture.white_balance_lock_requested && capture.white_balance_lock_verified != Some(true) {
        warnings.push("white balance lock was requested but not verified".to_string());
    }
    if !capture.timestamps_monotonic {
        warnings.push("frame timestamps are not monotonic".to_string());
    }
    if timestamp_coverage < 1.0 {
        warnings.push(format!(
            "source timestamps cover only {:.0}% of frames",
            timestamp_coverage * 100.0
        ));
    }
    if frame_interval_jitter_ms > MAX_INTERVAL_JITTER_MS {
        warnings.push(format!(
            "frame interval jitter {frame_interval_jitter_ms:.2} ms exceeds {MAX_INTERVAL_JITTER_MS:.0} ms"
        ));
    }
    if !capture.reliability_target_met {
        let detail = capture
            .reliability_failure_reason
            .as_deref()
            .unwrap_or("no detail recorded");
        warnings.push(format!("capture reliability target was not met: {detail}"));
    }

    let reliability_pass = warnings.is_empty();
    let summary = if reliability_pass {
        "capture quality is acceptable for reconstruction".to_string()
    } else {
        format!(
            "capture quality degraded: {} warning(s); consider retakes",
            warnings.len()
        )
    };

    CaptureQualitySummary {
        total_frames: total,
        accepted_frames: accepted,
        accepted_ratio,
        mean_sharpness: mean(&sharpness),
        mean_exposure: mean(&exposure),
        timestamp_coverage,
        frame_interval_mean_ms,
        frame_interval_jitter_ms,
        rejection_counts,
        reliability_pass,
        warnings,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchscan_core::{BackendKind, CameraCaptureMode, CaptureFrame};

    fn frame(index: u64, accepted: bool, source_ms: Option<f64>) -> CaptureFrame {
        CaptureFrame {
            frame_id: format!("f-{index:03}"),
            captured_at_ms: 1_000 + index * 100,
            source_timestamp_ms: source_ms,
            sharpness_score: 0.9,
            exposure_score: 0.88,
            accepted,
            preview_image_path: None,
        }
    }

    fn capture(frames: Vec<CaptureFrame>) -> CaptureResult {
        let accepted = frames.iter().filter(|f| f.accepted).count();
        CaptureResult {
            camera_device_id: "sim-bench-cam-01".into(),
            selected_mode: CameraCaptureMode::new(1280, 720, 30, "MJPG"),
            captured_frame_count: frames.len(),
            accepted_frame_count: accepted,
            required_accepted_frames: 1,
            capture_attempts_used: 1,
            reliability_target_met: true,
            reliability_failure_reason: None,
            frames,
            backend: BackendKind::Simulated,
            exposure_lock_requested: true,
            white_balance_lock_requested: true,
            exposure_lock_verified: Some(true),
            white_balance_lock_verified: Some(true),
            timestamp_source: "simulated-clock".into(),
            timestamps_monotonic: true,
            notes: String::new(),
        }
    }

    #[test]
    fn clean_capture_produces_no_warnings() {
        let frames = (0..6)
            .map(|i| frame(i, true, Some(i as f64 * 33.0)))
            .collect();
        let summary = analyze_capture_quality(&capture(frames));

        assert!(summary.reliability_pass);
        assert!(summary.warnings.is_empty());
        assert_eq!(summary.accepted_frames, 6);
        assert!((summary.frame_interval_mean_ms - 33.0).abs() < 1e-9);
        assert!(summary.frame_interval_jitter_ms < 1e-9);
        assert!(summary.rejection_counts.is_empty());
    }

    #[test]
    fn jitter_and_coverage_warnings_fire() {
        // Irregular device timestamps and one frame without any.
        let frames = vec![
            frame(0, true, Some(0.0)),
            frame(1, true, Some(33.0)),
            frame(2, true, Some(95.0)),
            frame(3, true, None),
        ];
        let summary = analyze_capture_quality(&capture(frames));

        assert!(!summary.reliability_pass);
        assert!(summary.warnings.iter().any(|w| w.contains("jitter")));
        assert!(summary
            .warnings
            .iter()
            .any(|w| w.contains("source timestamps cover")));
    }

    #[test]
    fn unmet_reliability_and_unverified_locks_warn() {
        let mut result = capture(vec![
            frame(0, true, Some(0.0)),
            frame(1, false, Some(33.0)),
            frame(2, false, Some(66.0)),
        ]);
        result.reliability_target_met = false;
        result.reliability_failure_reason =
            Some("accepted 1 of 3 required frames after 3 attempts".into());
        result.exposure_lock_verified = None;

        let summary = analyze_capture_quality(&result);
        assert!(!summary.reliability_pass);
        assert!(summary
            .warnings
            .iter()
            .any(|w| w.contains("exposure lock")));
        assert!(summary
            .warnings
            .iter()
            .any(|w| w.contains("reliability target")));
        assert!(summary.warnings.iter().any(|w| w.contains("ratio")));
        assert_eq!(summary.rejection_counts.get("provider_rejected"), Some(&2));
    }

    #[test]
    fn empty_capture_is_all_zeroes_but_still_warns() {
        let summary = analyze_capture_quality(&capture(vec![]));
        assert_eq!(summary.total_frames, 0);
        assert_eq!(summary.accepted_ratio, 0.0);
        assert_eq!(summary.timestamp_coverage, 0.0);
        assert!(!summary.reliability_pass);
    }
}
