//! benchscan CLI: run a scan session end-to-end and report the gates.

use benchscan_core::{init_with_level, now_millis, CancelToken, ScanSession};
use benchscan_pipeline::run_scan_pipeline;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "benchscan")]
#[command(about = "Capture, calibrate, and gate a benchtop 3D scan session")]
#[command(version)]
struct Cli {
    /// Session identifier; derived from the clock when omitted.
    #[arg(long)]
    session_id: Option<String>,

    /// Camera device to request.
    #[arg(long, default_value = "sim-bench-cam-01")]
    camera: String,

    /// Operator notes attached to the session. Notes containing "test"
    /// authorize the simulated backend; "calibration-strict" enables the
    /// strict intrinsic-frame gate.
    #[arg(long, default_value = "bench test run")]
    notes: String,

    /// Directory that receives per-session artifacts.
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = init_with_level(level);

    let session_id = cli
        .session_id
        .unwrap_or_else(|| format!("scan-{}", now_millis()));
    let session = ScanSession::new(session_id, cli.camera, cli.notes);
    let cancel = CancelToken::new();

    match run_scan_pipeline(&session, &cli.output_dir, &cancel) {
        Ok(result) => {
            println!("session:    {}", session.session_id);
            println!("backend:    {}", result.capture.backend);
            println!(
                "capture:    {}/{} accepted in {} attempt(s)",
                result.capture.accepted_frame_count,
                result.capture.captured_frame_count,
                result.capture.capture_attempts_used
            );
            println!(
                "calibration: reprojection {:.3} px, scale {:.3} mm ({})",
                result.calibration.reprojection_error_px,
                result.calibration.scale_error_mm,
                if result.calibration_quality.gate_pass {
                    "gates passed"
                } else {
                    "gates FAILED"
                }
            );
            println!(
                "underlay:   {} mode, max error {:.3} mm, pass={}",
                result.underlay_verification.detection_mode,
                result.underlay_verification.max_absolute_error_mm,
                result.underlay_verification.pass
            );
            println!(
                "validation: max error {:.3} mm, pass={}",
                result.validation.max_absolute_error_mm, result.validation.pass
            );
            println!("mesh:       {}", result.mesh_path.display());
            println!("report:     {}", result.report_path.display());
            println!("{}", result.message);

            if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(err) => {
            log::error!("pipeline failed: {err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
