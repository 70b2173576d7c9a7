use crate::contract::{DeviceDiscovery, FrameCapture, ModeDiscovery};
use benchscan_core::{
    now_millis, BackendKind, CameraCaptureMode, CameraDeviceInfo, CancelToken, CaptureFrame,
    CaptureSettings, FrameCaptureDiagnostics, FrameCaptureOutcome, ScanError,
};
use image::{GrayImage, Luma};
use nalgebra::{Matrix3, Rotation3, Vector3};
use std::path::PathBuf;

/// Deterministic simulated camera: fixed devices, fixed modes, and a frame
/// generator with a repeatable sharpness/exposure profile.
///
/// When given a preview directory it also renders a synthetic checkerboard
/// view per frame (each frame at a slightly different pose) so the geometry
/// stages downstream have something real to chew on.
pub struct SimulatedFrameCapture {
    preview_dir: Option<PathBuf>,
}

impl SimulatedFrameCapture {
    pub fn new(preview_dir: Option<PathBuf>) -> Self {
        Self { preview_dir }
    }
}

pub struct SimulatedDeviceDiscovery;

impl DeviceDiscovery for SimulatedDeviceDiscovery {
    fn list_available(&self, cancel: &CancelToken) -> Result<Vec<CameraDeviceInfo>, ScanError> {
        cancel.ensure_active()?;
        Ok(vec![
            CameraDeviceInfo {
                device_id: "sim-bench-cam-01".to_string(),
                display_name: "Simulated Bench Camera #1".to_string(),
                is_available: true,
                preferred_mode: Some(CameraCaptureMode::new(1280, 720, 30, "MJPG")),
            },
            CameraDeviceInfo {
                device_id: "sim-bench-cam-02".to_string(),
                display_name: "Simulated Bench Camera #2".to_string(),
                is_available: true,
                preferred_mode: None,
            },
        ])
    }
}

pub struct SimulatedModeDiscovery;

impl ModeDiscovery for SimulatedModeDiscovery {
    fn supported_modes(
        &self,
        _device_id: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<CameraCaptureMode>, ScanError> {
        cancel.ensure_active()?;
        Ok(vec![
            CameraCaptureMode::new(1920, 1080, 30, "MJPG"),
            CameraCaptureMode::new(1280, 720, 60, "YUY2"),
            CameraCaptureMode::new(1280, 720, 30, "YUY2"),
        ])
    }
}

impl FrameCapture for SimulatedFrameCapture {
    fn capture_frames(
        &self,
        device_id: &str,
        settings: &CaptureSettings,
        cancel: &CancelToken,
    ) -> Result<FrameCaptureOutcome, ScanError> {
        cancel.ensure_active()?;

        let frame_count = settings.target_frame_count.max(3);
        let base_ms = now_millis();
        let mut frames = Vec::with_capacity(frame_count);
        for index in 0..frame_count {
            cancel.ensure_active()?;

            let sharpness = (0.95 - index as f64 * 0.02).max(0.6);
            let exposure = (0.92 - (index % 4) as f64 * 0.03).max(0.75);
            let accepted = sharpness >= 0.8 && exposure >= 0.82;
            let frame_id = format!("{device_id}-f-{:03}", index + 1);

            let preview_image_path = self.preview_dir.as_ref().and_then(|dir| {
                let path = dir.join(format!("{frame_id}.png"));
                match render_checkerboard_preview(index).save(&path) {
                    Ok(()) => Some(path),
                    Err(err) => {
                        log::warn!("preview render failed for {frame_id}: {err}");
                        None
                    }
                }
            });

            frames.push(CaptureFrame {
                frame_id,
                captured_at_ms: base_ms + index as u64 * 100,
                source_timestamp_ms: Some(index as f64 * (1000.0 / 30.0)),
                sharpness_score: sharpness,
                exposure_score: exposure,
                accepted,
                preview_image_path,
            });
        }

        Ok(FrameCaptureOutcome {
            frames,
            diagnostics: FrameCaptureDiagnostics {
                backend_used: BackendKind::Simulated,
                exposure_lock_verified: settings.lock_exposure.then_some(true),
                white_balance_lock_verified: settings.lock_white_balance.then_some(true),
                timestamp_source: "simulated-clock".to_string(),
            },
        })
    }
}

const PREVIEW_W: u32 = 640;
const PREVIEW_H: u32 = 480;
// Outer square grid of the printed underlay: 10x7 squares of 10 mm,
// giving 9x6 inner corners.
const BOARD_COLS: f64 = 10.0;
const BOARD_ROWS: f64 = 7.0;
const SQUARE_MM: f64 = 10.0;

/// Render the reference checkerboard as seen from a per-frame pose.
///
/// Every output pixel is mapped through the inverse view homography into
/// board millimeters and shaded by square parity, so the rendered corners are
/// exactly where the forward model says they are.
fn render_checkerboard_preview(index: usize) -> GrayImage {
    let k = Matrix3::new(
        700.0, 0.0, PREVIEW_W as f64 / 2.0, //
        0.0, 700.0, PREVIEW_H as f64 / 2.0, //
        0.0, 0.0, 1.0,
    );
    let rotation = Rotation3::from_euler_angles(
        0.16 + 0.05 * (index % 3) as f64,
        -0.12 + 0.06 * (index % 4) as f64,
        0.04 * (index % 2) as f64,
    );
    let translation = Vector3::new(
        -BOARD_COLS * SQUARE_MM / 2.0,
        -BOARD_ROWS * SQUARE_MM / 2.0,
        380.0 + 12.0 * (index % 3) as f64,
    );

    let r = rotation.matrix();
    let h = k * Matrix3::from_columns(&[r.column(0).into_owned(), r.column(1).into_owned(), translation]);
    let h_inv = match h.try_inverse() {
        Some(inv) => inv,
        None => return GrayImage::from_pixel(PREVIEW_W, PREVIEW_H, Luma([200u8])),
    };

    let board_w = BOARD_COLS * SQUARE_MM;
    let board_h = BOARD_ROWS * SQUARE_MM;
    let mut img = GrayImage::new(PREVIEW_W, PREVIEW_H);
    for y in 0..PREVIEW_H {
        for x in 0..PREVIEW_W {
            let p = h_inv * Vector3::new(x as f64 + 0.5, y as f64 + 0.5, 1.0);
            let value = if p.z.abs() < 1e-12 {
                200u8
            } else {
                let bx = p.x / p.z;
                let by = p.y / p.z;
                if (0.0..board_w).contains(&bx) && (0.0..board_h).contains(&by) {
                    let parity = ((bx / SQUARE_MM).floor() + (by / SQUARE_MM).floor()) as i64 % 2;
                    if parity == 0 {
                        25
                    } else {
                        235
                    }
                } else if (-SQUARE_MM..board_w + SQUARE_MM).contains(&bx)
                    && (-SQUARE_MM..board_h + SQUARE_MM).contains(&by)
                {
                    // Quiet border around the printed pattern.
                    235
                } else {
                    200
                }
            };
            img.put_pixel(x, y, Luma([value]));
        }
    }
    img
}
