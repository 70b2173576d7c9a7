use chess_corners::{find_chess_corners_image, ChessConfig, ThresholdMode};
use image::GrayImage;
use nalgebra::{Matrix2, Point2, Vector2};

/// Inner-corner geometry of the printed checkerboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
}

impl GridSpec {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn point_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Ideal planar grid points in row-major order, `square_size` apart.
    pub fn object_points(&self, square_size: f64) -> Vec<Point2<f64>> {
        (0..self.rows)
            .flat_map(|r| {
                (0..self.cols).map(move |c| Point2::new(c as f64 * square_size, r as f64 * square_size))
            })
            .collect()
    }
}

fn detector_config() -> ChessConfig {
    let mut cfg = ChessConfig::single_scale();
    cfg.threshold_mode = ThresholdMode::Relative;
    cfg.threshold_value = 0.2;
    cfg.nms_radius = 2;
    cfg
}

/// Detect the checkerboard's inner corners and return them ordered row-major.
///
/// Runs the ChESS corner detector (sub-pixel output), keeps the strongest
/// `rows*cols` responses, and orders them along the board's principal axes.
/// Returns `None` when too few corners respond or the responses do not form
/// a complete grid.
pub fn detect_corner_grid(img: &GrayImage, spec: GridSpec) -> Option<Vec<Point2<f64>>> {
    let cfg = detector_config();
    let mut corners = find_chess_corners_image(img, &cfg).ok()?;
    let needed = spec.point_count();
    if corners.len() < needed {
        log::debug!(
            "corner grid: {} responses, need {} for {}x{}",
            corners.len(),
            needed,
            spec.cols,
            spec.rows
        );
        return None;
    }

    corners.sort_by(|a, b| b.response.total_cmp(&a.response));
    let points: Vec<Point2<f64>> = corners[..needed]
        .iter()
        .map(|c| Point2::new(c.x as f64, c.y as f64))
        .collect();

    order_corner_grid(&points, spec)
}

/// Order exactly `rows*cols` corner points into row-major grid order.
///
/// Points are projected onto the cloud's principal axes; rows are split at
/// the `rows-1` widest gaps along the minor axis and sorted along the major
/// axis. Returns `None` when the split does not produce `cols` points per
/// row, which is the signature of a spurious or incomplete detection.
pub fn order_corner_grid(points: &[Point2<f64>], spec: GridSpec) -> Option<Vec<Point2<f64>>> {
    if points.len() != spec.point_count() {
        return None;
    }

    let n = points.len() as f64;
    let centroid = points
        .iter()
        .fold(Vector2::zeros(), |acc, p| acc + p.coords)
        / n;

    let mut cov = Matrix2::zeros();
    for p in points {
        let d = p.coords - centroid;
        cov += d * d.transpose();
    }
    cov /= n;

    let eigen = cov.symmetric_eigen();
    // Major axis = column direction (the board is wider than it is tall).
    let major_idx = if eigen.eigenvalues[0] >= eigen.eigenvalues[1] { 0 } else { 1 };
    let mut major: Vector2<f64> = eigen.eigenvectors.column(major_idx).into_owned();
    if major.x < 0.0 {
        major = -major;
    }
    let mut minor = Vector2::new(-major.y, major.x);
    if minor.y < 0.0 {
        minor = -minor;
    }

    let projected: Vec<(f64, f64, Point2<f64>)> = points
        .iter()
        .map(|p| {
            let d = p.coords - centroid;
            (d.dot(&major), d.dot(&minor), *p)
        })
        .collect();

    split_rows(&projected, spec.rows, spec.cols)
}

/// Split minor-axis-sorted points into `rows` groups at the widest gaps.
fn split_rows(
    projected: &[(f64, f64, Point2<f64>)],
    rows: usize,
    cols: usize,
) -> Option<Vec<Point2<f64>>> {
    let mut by_minor = projected.to_vec();
    by_minor.sort_by(|a, b| a.1.total_cmp(&b.1));

    // Indices of the rows-1 largest gaps between consecutive minor values.
    let mut gaps: Vec<(f64, usize)> = by_minor
        .windows(2)
        .enumerate()
        .map(|(i, w)| (w[1].1 - w[0].1, i + 1))
        .collect();
    gaps.sort_by(|a, b| b.0.total_cmp(&a.0));
    let mut cuts: Vec<usize> = gaps.iter().take(rows - 1).map(|&(_, i)| i).collect();
    cuts.sort_unstable();

    let mut ordered = Vec::with_capacity(by_minor.len());
    let mut start = 0usize;
    for end in cuts.into_iter().chain(std::iter::once(by_minor.len())) {
        let row = &mut by_minor[start..end];
        if row.len() != cols {
            return None;
        }
        row.sort_by(|a, b| a.0.total_cmp(&b.0));
        ordered.extend(row.iter().map(|&(_, _, p)| p));
        start = end;
    }
    Some(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Rotation2;

    fn shuffled(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
        // Deterministic scramble: stride through the list with a coprime step.
        let n = points.len();
        (0..n).map(|i| points[(i * 17) % n]).collect()
    }

    #[test]
    fn ordering_recovers_a_rotated_grid() {
        let spec = GridSpec::new(6, 9);
        let ideal = spec.object_points(10.0);
        let rot = Rotation2::new(0.2);
        let transformed: Vec<Point2<f64>> = ideal
            .iter()
            .map(|p| {
                let q = rot * Vector2::new(p.x, p.y);
                Point2::new(q.x + 200.0, q.y + 150.0)
            })
            .collect();

        let ordered = order_corner_grid(&shuffled(&transformed), spec).expect("ordered");
        for (got, expected) in ordered.iter().zip(transformed.iter()) {
            assert_relative_eq!(got.x, expected.x, epsilon = 1e-9);
            assert_relative_eq!(got.y, expected.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn ordering_rejects_wrong_point_counts() {
        let spec = GridSpec::new(6, 9);
        let points = spec.object_points(10.0);
        assert!(order_corner_grid(&points[..50], spec).is_none());
    }

    #[test]
    fn detection_fails_on_a_featureless_image() {
        let img = GrayImage::from_pixel(320, 240, image::Luma([128u8]));
        assert!(detect_corner_grid(&img, GridSpec::new(6, 9)).is_none());
    }
}
