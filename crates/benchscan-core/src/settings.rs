use crate::capture::BackendKind;
use serde::{Deserialize, Serialize};

/// Immutable capture configuration for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Frames the provider should produce per attempt.
    pub target_frame_count: usize,
    pub lock_exposure: bool,
    pub lock_white_balance: bool,
    pub underlay_pattern: String,
    pub lighting_profile: String,
    /// Whether a provider may satisfy the capture with the simulated backend.
    pub allow_simulated_fallback: bool,
    /// Backend the preflight routed to, if any.
    pub preferred_backend: Option<BackendKind>,
    /// Accepted frames required before the reliability loop stops retrying.
    /// Clamped to `[1, target_frame_count]` by the loop.
    pub min_accepted_frames: usize,
    /// Upper bound on capture attempts; treated as at least 1.
    pub max_capture_attempts: usize,
}

impl CaptureSettings {
    /// Copy of these settings routed to the given backend.
    pub fn with_preferred_backend(&self, backend: BackendKind) -> Self {
        Self {
            preferred_backend: Some(backend),
            ..self.clone()
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            target_frame_count: 12,
            lock_exposure: true,
            lock_white_balance: true,
            underlay_pattern: "mata-10mm-grid".to_string(),
            lighting_profile: "diffuse-white-5600k".to_string(),
            allow_simulated_fallback: false,
            preferred_backend: None,
            min_accepted_frames: 8,
            max_capture_attempts: 3,
        }
    }
}
