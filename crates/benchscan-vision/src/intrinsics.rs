use crate::homography::{estimate_homography, Homography};
use crate::pose::{pose_from_homography, project_planar_points, reprojection_rms, PlanarPose};
use crate::VisionError;
use nalgebra::{DMatrix, DVector, Matrix3, Point2};

/// One calibration view: planar object points (mm, Z = 0) and their observed
/// pixel positions, index-aligned.
#[derive(Clone, Debug)]
pub struct PlanarView {
    pub object_mm: Vec<Point2<f64>>,
    pub image_px: Vec<Point2<f64>>,
}

/// Closed-form multi-view calibration output.
#[derive(Clone, Debug)]
pub struct PlanarCalibration {
    /// Row-major pinhole matrix; skew is estimated but stays near zero for
    /// reasonable cameras.
    pub camera_matrix: Matrix3<f64>,
    /// Radial coefficients `[k1, k2]` from the linear post-fit.
    pub distortion: Vec<f64>,
    pub rms_reprojection_px: f64,
    pub per_view_rms_px: Vec<f64>,
    pub image_size: (u32, u32),
}

/// Zhang-style planar calibration: per-view homographies, the closed-form
/// intrinsic solve over the absolute-conic constraints, per-view pose
/// recovery, and a linear two-term radial distortion fit.
///
/// Needs at least three views with at least four correspondences each; views
/// should vary in tilt or the conic system degenerates.
pub fn calibrate_planar(
    views: &[PlanarView],
    image_size: (u32, u32),
) -> Result<PlanarCalibration, VisionError> {
    if views.len() < 3 {
        return Err(VisionError::NotEnoughPoints {
            needed: 3,
            got: views.len(),
        });
    }

    let mut homographies = Vec::with_capacity(views.len());
    for view in views {
        if view.object_mm.len() != view.image_px.len() || view.object_mm.len() < 4 {
            return Err(VisionError::NotEnoughPoints {
                needed: 4,
                got: view.object_mm.len().min(view.image_px.len()),
            });
        }
        homographies.push(estimate_homography(&view.object_mm, &view.image_px)?);
    }

    let camera_matrix = intrinsics_from_homographies(&homographies)?;

    let mut poses = Vec::with_capacity(homographies.len());
    for h in &homographies {
        poses.push(pose_from_homography(&camera_matrix, h)?);
    }

    let distortion = fit_radial_distortion(&camera_matrix, &poses, views);

    let mut per_view_rms_px = Vec::with_capacity(views.len());
    let mut sum_sq = 0.0;
    let mut total = 0usize;
    for (view, pose) in views.iter().zip(poses.iter()) {
        let projected = project_planar_points(&camera_matrix, &distortion, pose, &view.object_mm);
        let rms = reprojection_rms(&projected, &view.image_px);
        sum_sq += rms * rms * view.object_mm.len() as f64;
        total += view.object_mm.len();
        per_view_rms_px.push(rms);
    }
    let rms_reprojection_px = if total == 0 {
        0.0
    } else {
        (sum_sq / total as f64).sqrt()
    };

    Ok(PlanarCalibration {
        camera_matrix,
        distortion,
        rms_reprojection_px,
        per_view_rms_px,
        image_size,
    })
}

/// Row `v_ij` of the absolute-conic constraint system for one homography.
fn conic_row(h: &Homography, i: usize, j: usize) -> [f64; 6] {
    let hi = h.h.column(i);
    let hj = h.h.column(j);
    [
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ]
}

fn intrinsics_from_homographies(
    homographies: &[Homography],
) -> Result<Matrix3<f64>, VisionError> {
    let m = homographies.len();
    let mut v = DMatrix::<f64>::zeros(2 * m, 6);
    for (idx, h) in homographies.iter().enumerate() {
        let v12 = conic_row(h, 0, 1);
        let v11 = conic_row(h, 0, 0);
        let v22 = conic_row(h, 1, 1);
        for col in 0..6 {
            v[(2 * idx, col)] = v12[col];
            v[(2 * idx + 1, col)] = v11[col] - v22[col];
        }
    }

    let svd = v.svd(true, true);
    let vt = svd.v_t.ok_or(VisionError::Degenerate("conic svd failed"))?;
    let last = vt.nrows() - 1;
    let mut b: Vec<f64> = (0..6).map(|c| vt[(last, c)]).collect();

    // The null vector's sign is arbitrary; B must be positive definite.
    if b[0] < 0.0 {
        for value in &mut b {
            *value = -*value;
        }
    }
    let (b11, b12, b22, b13, b23, b33) = (b[0], b[1], b[2], b[3], b[4], b[5]);

    let denom = b11 * b22 - b12 * b12;
    if denom.abs() < 1e-16 || b11.abs() < 1e-16 {
        return Err(VisionError::Degenerate("conic system is singular"));
    }

    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;
    let alpha_sq = lambda / b11;
    let beta_sq = lambda * b11 / denom;
    if alpha_sq <= 0.0 || beta_sq <= 0.0 {
        return Err(VisionError::Degenerate("conic solution not positive definite"));
    }

    let alpha = alpha_sq.sqrt();
    let beta = beta_sq.sqrt();
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    Ok(Matrix3::new(
        alpha, gamma, u0, //
        0.0, beta, v0, //
        0.0, 0.0, 1.0,
    ))
}

/// Linear least-squares fit of `[k1, k2]` over every correspondence, holding
/// intrinsics and poses fixed.
fn fit_radial_distortion(
    k: &Matrix3<f64>,
    poses: &[PlanarPose],
    views: &[PlanarView],
) -> Vec<f64> {
    let fx = k[(0, 0)];
    let fy = k[(1, 1)];
    let skew = k[(0, 1)];
    let cx = k[(0, 2)];
    let cy = k[(1, 2)];

    let total: usize = views.iter().map(|v| v.object_mm.len()).sum();
    let mut d = DMatrix::<f64>::zeros(2 * total, 2);
    let mut e = DVector::<f64>::zeros(2 * total);

    let mut row = 0usize;
    for (view, pose) in views.iter().zip(poses.iter()) {
        for (object, observed) in view.object_mm.iter().zip(view.image_px.iter()) {
            let pc = pose.rotation * nalgebra::Vector3::new(object.x, object.y, 0.0)
                + pose.translation;
            if pc.z.abs() < 1e-12 {
                row += 2;
                continue;
            }
            let x = pc.x / pc.z;
            let y = pc.y / pc.z;
            let r2 = x * x + y * y;
            let u_ideal = fx * x + skew * y + cx;
            let v_ideal = fy * y + cy;

            d[(row, 0)] = (u_ideal - cx) * r2;
            d[(row, 1)] = (u_ideal - cx) * r2 * r2;
            e[row] = observed.x - u_ideal;
            d[(row + 1, 0)] = (v_ideal - cy) * r2;
            d[(row + 1, 1)] = (v_ideal - cy) * r2 * r2;
            e[row + 1] = observed.y - v_ideal;
            row += 2;
        }
    }

    match d.svd(true, true).solve(&e, 1e-12) {
        Ok(solution) => vec![solution[0], solution[1]],
        Err(_) => vec![0.0, 0.0],
    }
}
