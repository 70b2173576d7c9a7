use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistical summary of a completed capture.
///
/// Derived once from a [`crate::CaptureResult`] by the quality analyzer;
/// `reliability_pass` holds exactly when `warnings` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureQualitySummary {
    pub total_frames: usize,
    pub accepted_frames: usize,
    pub accepted_ratio: f64,
    pub mean_sharpness: f64,
    pub mean_exposure: f64,
    /// Fraction of frames carrying a source-device timestamp.
    pub timestamp_coverage: f64,
    /// Mean of positive deltas between sorted source timestamps.
    pub frame_interval_mean_ms: f64,
    /// Population standard deviation of those deltas.
    pub frame_interval_jitter_ms: f64,
    pub rejection_counts: BTreeMap<String, usize>,
    pub reliability_pass: bool,
    pub warnings: Vec<String>,
    pub summary: String,
}
