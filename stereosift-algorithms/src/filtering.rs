//! Filtering algorithms
//!
//! Statistical outlier removal scores every point by its Euclidean
//! distance from the cloud centroid and drops the points whose score
//! exceeds the mean by more than a configurable number of standard
//! deviations. Duplicate removal collapses points that coincide within a
//! tolerance.

use rayon::prelude::*;
use std::collections::HashSet;
use stereosift_core::{ColoredPointCloud3d, Error, Result};

/// Remove statistically anomalous points.
///
/// A point survives when its centroid distance is strictly below
/// `mean + threshold * stddev`. Filtering is stable: the survivors keep
/// their input order (a strict subsequence), which downstream index
/// bookkeeping relies on.
///
/// Fails with [`Error::AllPointsFiltered`] when nothing survives, rather
/// than handing an empty cloud to later stages. A cloud of coincident
/// points has zero distance spread, so the strict cut removes everything.
///
/// # Arguments
/// * `cloud` - Input point cloud
/// * `threshold` - Standard-deviation multiplier, must be positive
pub fn filter_outliers(cloud: &ColoredPointCloud3d, threshold: f64) -> Result<ColoredPointCloud3d> {
    if cloud.is_empty() {
        return Err(Error::InvalidCloud(
            "cannot filter an empty cloud".to_string(),
        ));
    }
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(Error::InvalidConfig(format!(
            "outlier threshold must be positive, got {}",
            threshold
        )));
    }

    let centroid = cloud.centroid();
    let distances: Vec<f64> = cloud
        .points
        .par_iter()
        .map(|p| (p.position.coords - centroid).norm())
        .collect();

    let mean = distances.iter().sum::<f64>() / distances.len() as f64;
    let variance = distances.iter().map(|&d| (d - mean).powi(2)).sum::<f64>()
        / distances.len() as f64;
    let cutoff = mean + threshold * variance.sqrt();

    let filtered: ColoredPointCloud3d = cloud
        .iter()
        .zip(distances.iter())
        .filter(|(_, &distance)| distance < cutoff)
        .map(|(point, _)| *point)
        .collect();

    if filtered.is_empty() {
        return Err(Error::AllPointsFiltered {
            threshold,
            total: cloud.len(),
        });
    }

    Ok(filtered)
}

/// Remove points that coincide within `tolerance`.
///
/// Coordinates are quantized to the tolerance grid and the first point in
/// each grid cell is kept, so the output order is a stable subsequence of
/// the input.
///
/// # Arguments
/// * `cloud` - Input point cloud
/// * `tolerance` - Distance below which two points count as the same
pub fn remove_duplicate_points(
    cloud: &ColoredPointCloud3d,
    tolerance: f64,
) -> Result<ColoredPointCloud3d> {
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(Error::InvalidConfig(format!(
            "duplicate tolerance must be positive, got {}",
            tolerance
        )));
    }

    let quantize = |v: f64| (v / tolerance).round() as i64;

    let mut seen = HashSet::new();
    let deduplicated: ColoredPointCloud3d = cloud
        .iter()
        .filter(|point| {
            let p = &point.position;
            seen.insert((quantize(p.x), quantize(p.y), quantize(p.z)))
        })
        .copied()
        .collect();

    Ok(deduplicated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::is_valid;
    use stereosift_core::{ColoredPoint3d, Point3d};

    fn gray(x: f64, y: f64, z: f64) -> ColoredPoint3d {
        ColoredPoint3d::new(Point3d::new(x, y, z), [0.5, 0.5, 0.5])
    }

    fn grid_cloud(n: usize) -> ColoredPointCloud3d {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                points.push(gray(i as f64 * 0.1, j as f64 * 0.1, 0.0));
            }
        }
        ColoredPointCloud3d::from_points(points)
    }

    #[test]
    fn test_far_outlier_removed() {
        let mut cloud = grid_cloud(10);
        cloud.push(gray(1e9, 1e9, 1e9));
        let original_count = cloud.len();

        let filtered = filter_outliers(&cloud, 2.0).unwrap();
        assert_eq!(filtered.len(), original_count - 1);
        assert!(filtered.iter().all(|p| p.position.x < 1e6));
        // the survivors still form a valid cloud
        assert!(is_valid(&filtered));
    }

    #[test]
    fn test_order_preserved() {
        let mut cloud = grid_cloud(5);
        cloud.push(gray(100.0, 100.0, 100.0));
        cloud.extend(grid_cloud(5).into_iter());

        let filtered = filter_outliers(&cloud, 2.0).unwrap();

        // survivors must appear in the same relative order as the input
        let mut cursor = 0;
        for survivor in &filtered {
            let found = cloud.iter().skip(cursor).position(|p| p == survivor);
            let advanced = found.expect("survivor missing from input");
            cursor += advanced + 1;
        }
    }

    #[test]
    fn test_uniform_cloud_mostly_retained() {
        let cloud = grid_cloud(10);
        let filtered = filter_outliers(&cloud, 2.0).unwrap();
        assert!(filtered.len() > cloud.len() * 8 / 10);
    }

    #[test]
    fn test_effective_threshold_shrinks_cloud() {
        let mut cloud = grid_cloud(8);
        cloud.push(gray(50.0, 0.0, 0.0));
        let filtered = filter_outliers(&cloud, 1.0).unwrap();
        assert!(filtered.len() < cloud.len());
    }

    #[test]
    fn test_coincident_points_all_filtered() {
        let cloud = ColoredPointCloud3d::from_points(vec![gray(1.0, 1.0, 1.0); 4]);
        let result = filter_outliers(&cloud, 2.0);
        assert!(matches!(
            result,
            Err(Error::AllPointsFiltered { total: 4, .. })
        ));
    }

    #[test]
    fn test_invalid_threshold() {
        let cloud = grid_cloud(3);
        assert!(filter_outliers(&cloud, 0.0).is_err());
        assert!(filter_outliers(&cloud, -1.0).is_err());
        assert!(filter_outliers(&cloud, f64::NAN).is_err());
    }

    #[test]
    fn test_empty_cloud_rejected() {
        let cloud = ColoredPointCloud3d::new();
        assert!(matches!(
            filter_outliers(&cloud, 2.0),
            Err(Error::InvalidCloud(_))
        ));
    }

    #[test]
    fn test_remove_duplicates() {
        let cloud = ColoredPointCloud3d::from_points(vec![
            gray(0.0, 0.0, 0.0),
            gray(0.0, 0.0, 0.0),
            gray(0.1, 0.0, 0.0),
            gray(0.1, 0.0, 1e-9),
            gray(0.0, 0.1, 0.0),
        ]);
        let deduplicated = remove_duplicate_points(&cloud, 1e-6).unwrap();
        assert_eq!(deduplicated.len(), 3);
        // first occurrences survive, in input order
        assert_eq!(deduplicated[0].position, Point3d::new(0.0, 0.0, 0.0));
        assert_eq!(deduplicated[1].position, Point3d::new(0.1, 0.0, 0.0));
        assert_eq!(deduplicated[2].position, Point3d::new(0.0, 0.1, 0.0));
    }

    #[test]
    fn test_remove_duplicates_invalid_tolerance() {
        let cloud = grid_cloud(2);
        assert!(remove_duplicate_points(&cloud, 0.0).is_err());
        assert!(remove_duplicate_points(&cloud, -1.0).is_err());
    }
}
