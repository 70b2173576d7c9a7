use crate::frame::CaptureFrame;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of capture backends a provider can run on.
///
/// Selection is an explicit enum-to-provider mapping; there is no
/// reflection-style instantiation anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Platform camera stack (DirectShow, V4L2, ...).
    Native,
    /// Vision-library device access.
    VisionLibrary,
    /// Deterministic simulated camera.
    Simulated,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Native => "native",
            BackendKind::VisionLibrary => "vision-library",
            BackendKind::Simulated => "simulated",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDeviceInfo {
    pub device_id: String,
    pub display_name: String,
    pub is_available: bool,
    pub preferred_mode: Option<CameraCaptureMode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraCaptureMode {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub pixel_format: String,
}

impl CameraCaptureMode {
    pub fn new(width: u32, height: u32, fps: u32, pixel_format: impl Into<String>) -> Self {
        Self {
            width,
            height,
            fps,
            pixel_format: pixel_format.into(),
        }
    }
}

impl fmt::Display for CameraCaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}@{}fps/{}",
            self.width, self.height, self.fps, self.pixel_format
        )
    }
}

/// Provider-side diagnostics attached to a raw frame batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameCaptureDiagnostics {
    pub backend_used: BackendKind,
    /// `None` when the backend cannot verify the lock at all.
    pub exposure_lock_verified: Option<bool>,
    pub white_balance_lock_verified: Option<bool>,
    /// Where frame timestamps come from, e.g. `device-clock` or `host-clock`.
    pub timestamp_source: String,
}

/// Raw result of one provider capture call: frames plus diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameCaptureOutcome {
    pub frames: Vec<CaptureFrame>,
    pub diagnostics: FrameCaptureDiagnostics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedCameraInfo {
    pub device_id: String,
    pub display_name: String,
}

/// Readiness evaluation produced before any capture attempt.
///
/// A failed preflight is the only fatal stage outcome in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturePreflightResult {
    pub pass: bool,
    pub selected_camera: Option<SelectedCameraInfo>,
    pub modes: Vec<CameraCaptureMode>,
    pub backend_candidate: Option<BackendKind>,
    pub simulated_fallback_allowed: bool,
    pub exposure_lock_verification_supported: bool,
    pub white_balance_lock_verification_supported: bool,
    pub timestamp_readiness_pass: bool,
    pub blocking_issues: Vec<String>,
    pub warnings: Vec<String>,
    pub summary: String,
}

/// Aggregate of the capture stage: the best attempt's frames plus the
/// reliability bookkeeping of the whole loop.
///
/// Produced exactly once per session; `accepted_frame_count` never exceeds
/// `captured_frame_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureResult {
    pub camera_device_id: String,
    pub selected_mode: CameraCaptureMode,
    pub captured_frame_count: usize,
    pub accepted_frame_count: usize,
    /// Accepted frames the reliability loop required, after clamping.
    pub required_accepted_frames: usize,
    pub capture_attempts_used: usize,
    pub reliability_target_met: bool,
    /// Human-readable reason recorded when the target was not met.
    pub reliability_failure_reason: Option<String>,
    pub frames: Vec<CaptureFrame>,
    pub backend: BackendKind,
    pub exposure_lock_requested: bool,
    pub white_balance_lock_requested: bool,
    pub exposure_lock_verified: Option<bool>,
    pub white_balance_lock_verified: Option<bool>,
    pub timestamp_source: String,
    pub timestamps_monotonic: bool,
    pub notes: String,
}
