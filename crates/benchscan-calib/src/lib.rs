//! Calibration side of the benchscan pipeline.
//!
//! The intrinsic calibration engine over captured preview frames, the
//! residual sample provider feeding the percentile gate, the underlay
//! scale/pose estimator with its fallback chain, the robust underlay
//! validator, and the calibration gate evaluator.

mod gates;
mod intrinsics;
mod residuals;
mod underlay;

pub use gates::evaluate_calibration_gates;
pub use intrinsics::{calibrate_session, CHECKERBOARD_SPEC, CHECKER_SQUARE_MM};
pub use residuals::residual_samples_for;
pub use underlay::{estimate_underlay_box_sizes, validate_underlay};
