//! Underlay scale/pose estimation and verification.
//!
//! The estimator recovers real-world box sizes from the printed reference
//! grid through an ordered fallback chain; the validator applies robust
//! outlier rejection and scores fit confidence over whatever the estimator
//! produced.

mod estimator;
mod validator;

pub use estimator::estimate_underlay_box_sizes;
pub use validator::validate_underlay;

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
