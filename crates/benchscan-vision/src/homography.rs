use crate::VisionError;
use nalgebra::{DMatrix, Matrix3, Point2, Vector3};

/// Plane-to-plane projective transform, `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0] / v[2], v[1] / v[2])
    }

    /// Map a whole point set, the perspective-transform convenience.
    pub fn apply_all(&self, pts: &[Point2<f64>]) -> Vec<Point2<f64>> {
        pts.iter().map(|&p| self.apply(p)).collect()
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Homography plus the per-correspondence inlier mask it was refit on.
#[derive(Clone, Debug)]
pub struct HomographyFit {
    pub homography: Homography,
    pub inlier_mask: Vec<bool>,
    pub inlier_ratio: f64,
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };
    Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn normalize_points(pts: &[Point2<f64>]) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    // Hartley normalization: translate to centroid, scale so mean distance = sqrt(2)
    let n = pts.len() as f64;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in pts {
        cx += p.x;
        cy += p.y;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        let dx = p.x - cx;
        let dy = p.y - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;

    let t = hartley_normalization(cx, cy, mean_dist);
    let out = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x, p.y, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    (out, t)
}

fn solve_dlt(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Result<Homography, VisionError> {
    let n = src.len();
    let (s, ts) = normalize_points(src);
    let (d, td) = normalize_points(dst);

    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for k in 0..n {
        let x = s[k].x;
        let y = s[k].y;
        let u = d[k].x;
        let v = d[k].y;

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // Solve Ah = 0 -> right singular vector with the smallest singular value.
    let svd = a.svd(true, true);
    let vt = svd.v_t.ok_or(VisionError::Degenerate("svd failed"))?;
    let last = vt.nrows() - 1;
    let h = vt.row(last);
    let hn = Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    // Denormalize: H = Td^{-1} * Hn * Ts, scaled to h33 = 1.
    let td_inv = td
        .try_inverse()
        .ok_or(VisionError::Degenerate("normalization not invertible"))?;
    let h_full = td_inv * hn * ts;
    let scale = h_full[(2, 2)];
    if scale.abs() < 1e-12 {
        return Err(VisionError::Degenerate("homography scale vanishes"));
    }
    Ok(Homography::new(h_full / scale))
}

/// Estimate `H` with `dst ~ H * src` via the normalized DLT.
pub fn estimate_homography(
    src: &[Point2<f64>],
    dst: &[Point2<f64>],
) -> Result<Homography, VisionError> {
    if src.len() != dst.len() || src.len() < 4 {
        return Err(VisionError::NotEnoughPoints {
            needed: 4,
            got: src.len().min(dst.len()),
        });
    }
    solve_dlt(src, dst)
}

/// Estimate `H` robustly: fit on all correspondences, mask residuals above
/// `threshold` (in destination units), refit on the surviving set.
///
/// Two refit rounds are enough for corner-grid data, where the occasional
/// outlier is a mislocalized corner rather than a gross mismatch; the mask
/// in the returned fit refers to the original correspondence order.
pub fn estimate_homography_masked(
    src: &[Point2<f64>],
    dst: &[Point2<f64>],
    threshold: f64,
) -> Result<HomographyFit, VisionError> {
    let mut homography = estimate_homography(src, dst)?;
    let mut mask = vec![true; src.len()];

    for _ in 0..2 {
        let next_mask: Vec<bool> = src
            .iter()
            .zip(dst.iter())
            .map(|(&s, &d)| {
                let mapped = homography.apply(s);
                let dx = mapped.x - d.x;
                let dy = mapped.y - d.y;
                (dx * dx + dy * dy).sqrt() <= threshold
            })
            .collect();

        let inliers: usize = next_mask.iter().filter(|&&m| m).count();
        if inliers < 4 || next_mask == mask {
            mask = next_mask;
            break;
        }
        mask = next_mask;

        let (s_in, d_in): (Vec<_>, Vec<_>) = src
            .iter()
            .zip(dst.iter())
            .zip(mask.iter())
            .filter(|(_, &m)| m)
            .map(|((s, d), _)| (*s, *d))
            .unzip();
        homography = solve_dlt(&s_in, &d_in)?;
    }

    let inliers = mask.iter().filter(|&&m| m).count();
    if inliers < 4 {
        return Err(VisionError::Degenerate("fewer than 4 homography inliers"));
    }
    Ok(HomographyFit {
        homography,
        inlier_ratio: inliers as f64 / src.len() as f64,
        inlier_mask: mask,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ground_truth() -> Homography {
        Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ))
    }

    fn grid_points() -> Vec<Point2<f64>> {
        (0..6)
            .flat_map(|r| (0..9).map(move |c| Point2::new(c as f64 * 10.0, r as f64 * 10.0)))
            .collect()
    }

    #[test]
    fn dlt_recovers_known_homography() {
        let truth = ground_truth();
        let src = grid_points();
        let dst = truth.apply_all(&src);

        let estimated = estimate_homography(&src, &dst).expect("estimate");
        for p in [
            Point2::new(0.0, 0.0),
            Point2::new(45.0, 25.0),
            Point2::new(80.0, 50.0),
        ] {
            let a = estimated.apply(p);
            let b = truth.apply(p);
            assert_relative_eq!(a.x, b.x, epsilon = 1e-6);
            assert_relative_eq!(a.y, b.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn masked_fit_flags_the_corrupted_correspondence() {
        let truth = ground_truth();
        let src = grid_points();
        let mut dst = truth.apply_all(&src);
        dst[17].x += 25.0;
        dst[17].y -= 14.0;

        let fit = estimate_homography_masked(&src, &dst, 3.0).expect("fit");
        assert!(!fit.inlier_mask[17]);
        assert!(fit.inlier_ratio < 1.0);
        assert!(fit.inlier_ratio > 0.9);
    }

    #[test]
    fn too_few_points_is_an_error() {
        let src = vec![Point2::new(0.0, 0.0); 3];
        let dst = vec![Point2::new(1.0, 1.0); 3];
        assert!(matches!(
            estimate_homography(&src, &dst),
            Err(VisionError::NotEnoughPoints { .. })
        ));
    }

    #[test]
    fn inverse_round_trips_points() {
        let h = ground_truth();
        let inv = h.inverse().expect("invertible");
        for p in [Point2::new(0.0, 0.0), Point2::new(50.0, -20.0)] {
            let back = inv.apply(h.apply(p));
            assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
            assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
        }
    }
}
