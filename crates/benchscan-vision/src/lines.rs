use image::GrayImage;

/// Clustered positions of near-vertical and near-horizontal grid lines.
#[derive(Clone, Debug, Default)]
pub struct GridLinePositions {
    /// x positions of near-vertical lines, one entry per merged cluster.
    pub vertical_x: Vec<f64>,
    /// y positions of near-horizontal lines.
    pub horizontal_y: Vec<f64>,
}

/// Extract grid line positions from Sobel gradients.
///
/// Edge pixels whose gradient is strongly horizontal belong to near-vertical
/// lines (and vice versa); their perpendicular coordinates are clustered so
/// each printed line collapses to one position. The 2:1 orientation ratio
/// matches the line classifier the rest of the estimator expects.
pub fn extract_grid_line_positions(img: &GrayImage, magnitude_threshold: f32) -> GridLinePositions {
    let w = img.width() as usize;
    let h = img.height() as usize;
    if w < 3 || h < 3 {
        return GridLinePositions::default();
    }

    let px = |x: usize, y: usize| -> f32 { img.as_raw()[y * w + x] as f32 };

    let mut vertical_raw = Vec::new();
    let mut horizontal_raw = Vec::new();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            // 3x3 Sobel.
            let gx = px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1)
                - px(x - 1, y - 1)
                - 2.0 * px(x - 1, y)
                - px(x - 1, y + 1);
            let gy = px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1)
                - px(x - 1, y - 1)
                - 2.0 * px(x, y - 1)
                - px(x + 1, y - 1);

            if (gx * gx + gy * gy).sqrt() < magnitude_threshold {
                continue;
            }
            if gx.abs() > 2.0 * gy.abs() {
                vertical_raw.push(x as f64);
            } else if gy.abs() > 2.0 * gx.abs() {
                horizontal_raw.push(y as f64);
            }
        }
    }

    GridLinePositions {
        vertical_x: cluster_positions(&vertical_raw, 6.0),
        horizontal_y: cluster_positions(&horizontal_raw, 6.0),
    }
}

/// Merge sorted 1-D positions into cluster means; neighbors closer than
/// `merge_threshold` join the running cluster.
pub fn cluster_positions(positions: &[f64], merge_threshold: f64) -> Vec<f64> {
    if positions.is_empty() {
        return Vec::new();
    }
    let mut sorted = positions.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut clusters = Vec::new();
    let mut current = vec![sorted[0]];
    for &value in &sorted[1..] {
        if (value - *current.last().expect("cluster never empty")).abs() <= merge_threshold {
            current.push(value);
        } else {
            clusters.push(current.iter().sum::<f64>() / current.len() as f64);
            current = vec![value];
        }
    }
    clusters.push(current.iter().sum::<f64>() / current.len() as f64);
    clusters
}

/// Median spacing between consecutive clustered line positions.
///
/// Needs at least four lines; deltas outside `[8, 140]` px are discarded as
/// broken or merged lines. Returns `None` when no plausible spacing remains.
pub fn median_cluster_spacing(clustered: &[f64]) -> Option<f64> {
    if clustered.len() < 4 {
        return None;
    }

    let mut spacing: Vec<f64> = clustered
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|delta| (8.0..=140.0).contains(delta))
        .collect();
    if spacing.is_empty() {
        return None;
    }

    spacing.sort_by(|a, b| a.total_cmp(b));
    let mid = spacing.len() / 2;
    Some(if spacing.len() % 2 == 1 {
        spacing[mid]
    } else {
        (spacing[mid - 1] + spacing[mid]) / 2.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;

    #[test]
    fn clustering_merges_nearby_positions() {
        let clusters = cluster_positions(&[12.0, 10.0, 11.0, 50.0, 51.0, 90.0], 6.0);
        assert_eq!(clusters.len(), 3);
        assert_relative_eq!(clusters[0], 11.0);
        assert_relative_eq!(clusters[1], 50.5);
        assert_relative_eq!(clusters[2], 90.0);
    }

    #[test]
    fn spacing_requires_enough_lines() {
        assert!(median_cluster_spacing(&[10.0, 50.0, 90.0]).is_none());
        let spacing = median_cluster_spacing(&[10.0, 50.0, 90.0, 130.0]).expect("spacing");
        assert_relative_eq!(spacing, 40.0);
    }

    #[test]
    fn spacing_ignores_out_of_range_deltas() {
        // 300 -> 450 is beyond the plausible window and must not skew the median.
        let spacing = median_cluster_spacing(&[10.0, 50.0, 90.0, 130.0, 450.0]).expect("spacing");
        assert_relative_eq!(spacing, 40.0);
    }

    #[test]
    fn extracts_a_synthetic_ruled_grid() {
        let mut img = GrayImage::from_pixel(320, 240, Luma([210u8]));
        for line in 1..=7 {
            let x = line * 40;
            for y in 0..240 {
                img.put_pixel(x, y, Luma([25u8]));
                img.put_pixel(x + 1, y, Luma([25u8]));
            }
        }
        for line in 1..=5 {
            let y = line * 40;
            for x in 0..320 {
                img.put_pixel(x, y, Luma([25u8]));
                img.put_pixel(x, y + 1, Luma([25u8]));
            }
        }

        let positions = extract_grid_line_positions(&img, 120.0);
        assert!(positions.vertical_x.len() >= 6);
        assert!(positions.horizontal_y.len() >= 4);

        let spacing = median_cluster_spacing(&positions.vertical_x).expect("vertical spacing");
        assert!((spacing - 40.0).abs() < 3.0);
    }
}
