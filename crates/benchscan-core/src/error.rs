/// Errors that cross stage boundaries.
///
/// Only configuration-class failures surface here; per-frame problems become
/// reason codes inside result records, and quality-gate failures are pass
/// flags aggregated by the orchestrator.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("no available camera device was discovered")]
    NoCameraAvailable,

    #[error("no supported capture modes were discovered for device '{device_id}'")]
    NoSupportedModes { device_id: String },

    #[error("capture provider fell back to the simulated backend, but simulated fallback is disabled for this run")]
    SimulatedBackendDisallowed,

    #[error("capture preflight failed: {}", issues.join(" | "))]
    PreflightFailed { issues: Vec<String> },

    #[error("scan session was cancelled")]
    Cancelled,

    #[error("artifact output failed")]
    Artifact(#[from] std::io::Error),
}
