use benchscan_core::{DimensionMeasurement, ScanError, ScanQualityReport};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const SKETCH_VIEWS: [&str; 3] = ["front", "top", "side"];

/// Write the placeholder box mesh sized from the measured dimensions.
pub fn write_mesh_obj(
    session_id: &str,
    measurements: &[DimensionMeasurement],
    output_dir: &Path,
) -> Result<PathBuf, ScanError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join("model.obj");

    let width = resolve_dimension(measurements, "Width", 44.0);
    let height = resolve_dimension(measurements, "Height", 27.0);
    let depth = resolve_dimension(measurements, "Depth", 19.0);
    let (hw, hh, hd) = (width / 2.0, height / 2.0, depth / 2.0);

    let mut obj = String::new();
    let _ = writeln!(obj, "# benchscan generated mesh placeholder");
    let _ = writeln!(obj, "# session {session_id}");
    let _ = writeln!(obj, "o scanned_object");
    for (x, y, z) in [
        (-hw, -hh, -hd),
        (hw, -hh, -hd),
        (hw, hh, -hd),
        (-hw, hh, -hd),
        (-hw, -hh, hd),
        (hw, -hh, hd),
        (hw, hh, hd),
        (-hw, hh, hd),
    ] {
        let _ = writeln!(obj, "v {x:.3} {y:.3} {z:.3}");
    }
    for face in [
        "f 1 2 3", "f 1 3 4", "f 5 6 7", "f 5 7 8", "f 1 2 6", "f 1 6 5", "f 2 3 7", "f 2 7 6",
        "f 3 4 8", "f 3 8 7", "f 4 1 5", "f 4 5 8",
    ] {
        let _ = writeln!(obj, "{face}");
    }

    fs::write(&path, obj)?;
    Ok(path)
}

/// Write one orthographic SVG sketch per view, annotated with the measured
/// dimensions.
pub fn write_sketches_svg(
    session_id: &str,
    measurements: &[DimensionMeasurement],
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ScanError> {
    let sketch_dir = output_dir.join("sketches");
    fs::create_dir_all(&sketch_dir)?;

    let mut paths = Vec::with_capacity(SKETCH_VIEWS.len());
    for view in SKETCH_VIEWS {
        let path = sketch_dir.join(format!("{view}.svg"));
        fs::write(&path, build_svg(session_id, view, measurements))?;
        paths.push(path);
    }
    Ok(paths)
}

fn build_svg(session_id: &str, view: &str, measurements: &[DimensionMeasurement]) -> String {
    let mut svg = String::new();
    let _ = writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="800" height="600" viewBox="0 0 800 600">"#
    );
    let _ = writeln!(
        svg,
        r#"  <rect x="40" y="40" width="720" height="520" fill="none" stroke="black" stroke-width="2" />"#
    );
    let _ = writeln!(svg, r#"  <text x="60" y="80" font-size="24">View: {view}</text>"#);
    let _ = writeln!(
        svg,
        r#"  <text x="60" y="115" font-size="14">Session: {session_id}</text>"#
    );

    let mut y = 170;
    for m in measurements {
        let _ = writeln!(
            svg,
            r#"  <text x="60" y="{y}" font-size="16">{}: ref {:.3} mm, measured {:.3} mm, error {:.3} mm</text>"#,
            m.name, m.reference_mm, m.measured_mm, m.absolute_error_mm
        );
        y += 30;
    }
    svg.push_str("</svg>\n");
    svg
}

/// Serialize the full quality report next to the other artifacts.
pub fn write_quality_report_json(
    report: &ScanQualityReport,
    output_dir: &Path,
) -> Result<PathBuf, ScanError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join("scan-quality-report.json");
    let json = serde_json::to_string_pretty(report)
        .map_err(|err| ScanError::Artifact(std::io::Error::other(err)))?;
    fs::write(&path, json)?;
    Ok(path)
}

fn resolve_dimension(measurements: &[DimensionMeasurement], name: &str, fallback: f64) -> f64 {
    measurements
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(name))
        .map(|m| m.measured_mm)
        .unwrap_or(fallback)
}
