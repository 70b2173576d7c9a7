use benchscan_core::{
    now_millis, CalibrationResult, CancelToken, DimensionMeasurement, DimensionReference,
    MeasurementProfile, ScanError, ScanSession, ValidationReport,
};

/// Deterministic error pattern applied around the calibration scale error.
const ERROR_MULTIPLIERS: [f64; 6] = [-1.8, 2.2, -1.1, 1.4, -0.9, 0.7];
const MIN_SCALE_FACTOR_MM: f64 = 0.05;

/// Reference dimensions of the bench verification part.
pub fn baseline_measurement_profile() -> MeasurementProfile {
    MeasurementProfile {
        references: vec![
            DimensionReference::new("Width", 44.00),
            DimensionReference::new("Height", 27.00),
            DimensionReference::new("Depth", 19.00),
        ],
        profile_name: "baseline-prismatic-part".to_string(),
        units: "mm".to_string(),
    }
}

/// Derive per-dimension measurements from the calibration scale error.
pub fn measure_dimensions(
    profile: &MeasurementProfile,
    calibration: &CalibrationResult,
    cancel: &CancelToken,
) -> Result<Vec<DimensionMeasurement>, ScanError> {
    let scale_factor = calibration.scale_error_mm.max(MIN_SCALE_FACTOR_MM);
    let mut measurements = Vec::with_capacity(profile.references.len());

    for (index, reference) in profile.references.iter().enumerate() {
        cancel.ensure_active()?;

        let multiplier = ERROR_MULTIPLIERS[index % ERROR_MULTIPLIERS.len()];
        let delta = round3(multiplier * scale_factor);
        let measured = round3(reference.reference_mm + delta);
        measurements.push(DimensionMeasurement {
            name: reference.name.clone(),
            reference_mm: reference.reference_mm,
            measured_mm: measured,
            absolute_error_mm: round3((reference.reference_mm - measured).abs()),
        });
    }

    Ok(measurements)
}

/// Fold measurements into the dimensional validation report.
pub fn build_validation_report(
    session: &ScanSession,
    measurements: Vec<DimensionMeasurement>,
    tolerance_mm: f64,
) -> ValidationReport {
    let max_absolute_error_mm = measurements
        .iter()
        .map(|m| m.absolute_error_mm)
        .fold(0.0, f64::max);
    let mean_absolute_error_mm = if measurements.is_empty() {
        0.0
    } else {
        measurements.iter().map(|m| m.absolute_error_mm).sum::<f64>() / measurements.len() as f64
    };
    let pass = max_absolute_error_mm <= tolerance_mm;
    let summary = if pass {
        format!("validation pass: all measured dimensions are within ±{tolerance_mm} mm")
    } else {
        format!("validation fail: one or more measured dimensions exceed ±{tolerance_mm} mm")
    };

    ValidationReport {
        session_id: session.session_id.clone(),
        generated_at_ms: now_millis(),
        tolerance_mm,
        measurements,
        max_absolute_error_mm,
        mean_absolute_error_mm,
        pass,
        summary,
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchscan_core::IntrinsicDiagnosticsSummary;

    fn calibration(scale_error_mm: f64) -> CalibrationResult {
        CalibrationResult {
            profile_id: "calib-test".into(),
            calibrated_at_ms: 0,
            reprojection_error_px: 0.2,
            scale_error_mm,
            within_tolerance: true,
            notes: String::new(),
            intrinsics: None,
            diagnostics: IntrinsicDiagnosticsSummary::default(),
        }
    }

    #[test]
    fn low_scale_error_keeps_dimensions_within_tolerance() {
        let session = ScanSession::new("s-m", "cam", "");
        let measurements = measure_dimensions(
            &baseline_measurement_profile(),
            &calibration(0.06),
            &CancelToken::new(),
        )
        .expect("measure");
        let report = build_validation_report(&session, measurements, 0.5);

        // Largest multiplier is 2.2 -> 0.132 mm of error at a 0.06 mm scale.
        assert!(report.pass);
        assert!((report.max_absolute_error_mm - 0.132).abs() < 1e-9);
        assert_eq!(report.measurements.len(), 3);
    }

    #[test]
    fn scale_factor_has_a_floor() {
        let tiny = measure_dimensions(
            &baseline_measurement_profile(),
            &calibration(0.001),
            &CancelToken::new(),
        )
        .expect("measure");
        // 0.05 mm floor times the first multiplier.
        assert!((tiny[0].absolute_error_mm - 0.09).abs() < 1e-9);
    }

    #[test]
    fn large_scale_error_fails_validation() {
        let session = ScanSession::new("s-m", "cam", "");
        let measurements = measure_dimensions(
            &baseline_measurement_profile(),
            &calibration(0.3),
            &CancelToken::new(),
        )
        .expect("measure");
        let report = build_validation_report(&session, measurements, 0.5);
        assert!(!report.pass);
    }
}
