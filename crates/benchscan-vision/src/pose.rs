use crate::homography::Homography;
use crate::VisionError;
use nalgebra::{Matrix3, Point2, Vector3};

/// Pose of a planar target (Z = 0 in its own frame) relative to the camera.
#[derive(Clone, Copy, Debug)]
pub struct PlanarPose {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl PlanarPose {
    /// How face-on the target is: `|r33|`, 1.0 for a frontal view.
    pub fn frontal_score(&self) -> f64 {
        self.rotation[(2, 2)].abs().clamp(0.0, 1.0)
    }
}

/// Decompose a plane-induced homography into a pose given intrinsics `K`.
///
/// Classic decomposition: scale `K^-1 H` so the first two columns have unit
/// norm (averaged), complete with `r3 = r1 x r2`, and project the result
/// onto SO(3) via SVD.
pub fn pose_from_homography(k: &Matrix3<f64>, h: &Homography) -> Result<PlanarPose, VisionError> {
    let k_inv = k
        .try_inverse()
        .ok_or(VisionError::Degenerate("intrinsics not invertible"))?;

    let h1 = k_inv * h.h.column(0);
    let h2 = k_inv * h.h.column(1);
    let h3 = k_inv * h.h.column(2);

    let norm1 = h1.norm();
    let norm2 = h2.norm();
    if norm1 <= 1e-12 || norm2 <= 1e-12 {
        return Err(VisionError::Degenerate("homography column collapses"));
    }
    let lambda = 2.0 / (norm1 + norm2);

    let mut r1 = h1 * lambda;
    let mut r2 = h2 * lambda;
    let mut t = h3 * lambda;
    // Target must sit in front of the camera.
    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }
    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return Err(VisionError::Degenerate("rotation columns collinear"));
    }

    let mut r = Matrix3::zeros();
    r.set_column(0, &r1);
    r.set_column(1, &r2);
    r.set_column(2, &r3);

    // Nearest rotation matrix (polar decomposition via SVD).
    let svd = r.svd(true, true);
    let u = svd.u.ok_or(VisionError::Degenerate("pose svd failed"))?;
    let v_t = svd.v_t.ok_or(VisionError::Degenerate("pose svd failed"))?;
    let mut rotation = u * v_t;
    if rotation.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        rotation = u_flipped * v_t;
    }

    Ok(PlanarPose {
        rotation,
        translation: t.into(),
    })
}

/// Project planar object points (Z = 0, same units as `translation`) through
/// pose, radial distortion, and intrinsics.
pub fn project_planar_points(
    k: &Matrix3<f64>,
    distortion: &[f64],
    pose: &PlanarPose,
    object: &[Point2<f64>],
) -> Vec<Point2<f64>> {
    let k1 = distortion.first().copied().unwrap_or(0.0);
    let k2 = distortion.get(1).copied().unwrap_or(0.0);
    let fx = k[(0, 0)];
    let fy = k[(1, 1)];
    let skew = k[(0, 1)];
    let cx = k[(0, 2)];
    let cy = k[(1, 2)];

    object
        .iter()
        .map(|p| {
            let pc = pose.rotation * Vector3::new(p.x, p.y, 0.0) + pose.translation;
            let x = pc.x / pc.z;
            let y = pc.y / pc.z;
            let r2 = x * x + y * y;
            let radial = 1.0 + k1 * r2 + k2 * r2 * r2;
            let xd = x * radial;
            let yd = y * radial;
            Point2::new(fx * xd + skew * yd + cx, fy * yd + cy)
        })
        .collect()
}

/// Root-mean-square distance between projected and observed points.
pub fn reprojection_rms(projected: &[Point2<f64>], observed: &[Point2<f64>]) -> f64 {
    if projected.is_empty() || projected.len() != observed.len() {
        return 0.0;
    }
    let sum_sq: f64 = projected
        .iter()
        .zip(observed.iter())
        .map(|(a, b)| {
            let dx = a.x - b.x;
            let dy = a.y - b.y;
            dx * dx + dy * dy
        })
        .sum();
    (sum_sq / projected.len() as f64).sqrt()
}
