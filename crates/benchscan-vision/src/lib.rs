//! Geometric vision primitives for the benchscan pipeline.
//!
//! Purely geometric building blocks: homography estimation with inlier
//! masking, planar (Zhang-style) intrinsic calibration, planar pose
//! recovery, checkerboard corner-grid detection, and grid line position
//! extraction. Nothing in this crate knows about sessions, gates, or
//! capture providers.

mod chessboard;
mod homography;
mod intrinsics;
mod lines;
mod pose;

pub use chessboard::{detect_corner_grid, order_corner_grid, GridSpec};
pub use homography::{estimate_homography, estimate_homography_masked, Homography, HomographyFit};
pub use intrinsics::{calibrate_planar, PlanarCalibration, PlanarView};
pub use lines::{cluster_positions, extract_grid_line_positions, median_cluster_spacing, GridLinePositions};
pub use pose::{pose_from_homography, project_planar_points, reprojection_rms, PlanarPose};

/// Errors from the geometric solvers.
#[derive(thiserror::Error, Debug)]
pub enum VisionError {
    #[error("not enough correspondences (need {needed}, got {got})")]
    NotEnoughPoints { needed: usize, got: usize },

    #[error("degenerate geometry: {0}")]
    Degenerate(&'static str),
}
