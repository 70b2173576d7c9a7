//! Core types and session plumbing for the benchscan pipeline.
//!
//! This crate holds the immutable data model shared by every pipeline stage:
//! sessions, capture settings and results, calibration records, underlay
//! verification records, measurement reports, and the aggregate quality
//! report. It also carries the small ambient pieces the stages share: the
//! cooperative cancellation token, the per-session policy configuration,
//! summary-statistics helpers, and the error taxonomy.
//!
//! Records are produced once by their owning stage and never mutated;
//! "updates" construct a new value.

mod calib;
mod cancel;
mod capture;
mod error;
mod frame;
mod logger;
mod measure;
mod policy;
mod quality;
mod report;
mod session;
mod settings;
pub mod stats;
mod underlay;

pub use calib::{
    CalibrationQualitySummary, CalibrationResidualSamples, CalibrationResult, GateThresholds,
    IntrinsicCalibrationDetails, IntrinsicDiagnosticsSummary, IntrinsicFrameDiagnostic,
};
pub use cancel::CancelToken;
pub use capture::{
    BackendKind, CameraCaptureMode, CameraDeviceInfo, CapturePreflightResult, CaptureResult,
    FrameCaptureDiagnostics, FrameCaptureOutcome, SelectedCameraInfo,
};
pub use error::ScanError;
pub use frame::CaptureFrame;
pub use logger::init_with_level;
pub use measure::{
    DimensionMeasurement, DimensionReference, MeasurementProfile, ValidationReport,
};
pub use policy::PolicyConfig;
pub use quality::CaptureQualitySummary;
pub use report::{PipelineResult, ScanQualityReport};
pub use session::{now_millis, ScanSession};
pub use settings::CaptureSettings;
pub use underlay::{UnderlayDetectionMode, UnderlayEstimate, UnderlayVerificationResult};
