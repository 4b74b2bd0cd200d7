//! Point cloud validation
//!
//! A pure gate run before any other stage touches a cloud. No correction
//! is performed here; a failing cloud aborts its pipeline.

use stereosift_core::{ColoredPointCloud3d, Error, Result};

/// Structural sanity cap on cloud size
pub const MAX_POINT_COUNT: usize = 1_000_000;

/// Check a cloud for structural well-formedness.
///
/// All of the following must hold: at least `min_points` points (and no
/// more than [`MAX_POINT_COUNT`]), every coordinate finite, every color
/// channel finite and within `[0, 1]`.
///
/// # Arguments
/// * `cloud` - Input point cloud
/// * `min_points` - Minimum acceptable point count
pub fn validate(cloud: &ColoredPointCloud3d, min_points: usize) -> Result<()> {
    if cloud.is_empty() {
        return Err(Error::InvalidCloud("cloud contains no points".to_string()));
    }
    if cloud.len() < min_points {
        return Err(Error::InvalidCloud(format!(
            "cloud has {} points, need at least {}",
            cloud.len(),
            min_points
        )));
    }
    if cloud.len() > MAX_POINT_COUNT {
        return Err(Error::InvalidCloud(format!(
            "cloud has {} points, more than the supported {}",
            cloud.len(),
            MAX_POINT_COUNT
        )));
    }

    for (idx, point) in cloud.iter().enumerate() {
        let p = &point.position;
        if !p.x.is_finite() || !p.y.is_finite() || !p.z.is_finite() {
            return Err(Error::InvalidCloud(format!(
                "non-finite coordinate at point {}",
                idx
            )));
        }
        for &channel in &point.color {
            if !channel.is_finite() || !(0.0..=1.0).contains(&channel) {
                return Err(Error::InvalidCloud(format!(
                    "color channel {} outside [0, 1] at point {}",
                    channel, idx
                )));
            }
        }
    }

    Ok(())
}

/// Boolean convenience form of [`validate`]
pub fn is_valid(cloud: &ColoredPointCloud3d) -> bool {
    validate(cloud, 1).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereosift_core::{ColoredPoint3d, Point3d};

    fn point(x: f64, y: f64, z: f64, color: [f32; 3]) -> ColoredPoint3d {
        ColoredPoint3d::new(Point3d::new(x, y, z), color)
    }

    #[test]
    fn test_empty_cloud_rejected() {
        let cloud = ColoredPointCloud3d::new();
        assert!(matches!(
            validate(&cloud, 1),
            Err(Error::InvalidCloud(_))
        ));
    }

    #[test]
    fn test_valid_cloud_passes() {
        let cloud = ColoredPointCloud3d::from_points(vec![
            point(0.0, 0.0, 0.0, [0.0, 0.5, 1.0]),
            point(1.0, -2.0, 3.0, [1.0, 1.0, 1.0]),
        ]);
        assert!(validate(&cloud, 1).is_ok());
        assert!(is_valid(&cloud));
    }

    #[test]
    fn test_min_points_enforced() {
        let cloud = ColoredPointCloud3d::from_points(vec![point(0.0, 0.0, 0.0, [0.5; 3])]);
        assert!(validate(&cloud, 2).is_err());
        assert!(validate(&cloud, 1).is_ok());
    }

    #[test]
    fn test_non_finite_coordinate_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let cloud = ColoredPointCloud3d::from_points(vec![
                point(0.0, 0.0, 0.0, [0.5; 3]),
                point(bad, 0.0, 0.0, [0.5; 3]),
            ]);
            assert!(!is_valid(&cloud));
        }
    }

    #[test]
    fn test_color_out_of_range_rejected() {
        let cloud = ColoredPointCloud3d::from_points(vec![point(0.0, 0.0, 0.0, [0.5, 1.5, 0.0])]);
        assert!(!is_valid(&cloud));

        let cloud = ColoredPointCloud3d::from_points(vec![point(0.0, 0.0, 0.0, [-0.1, 0.0, 0.0])]);
        assert!(!is_valid(&cloud));

        let cloud = ColoredPointCloud3d::from_points(vec![point(0.0, 0.0, 0.0, [f32::NAN, 0.0, 0.0])]);
        assert!(!is_valid(&cloud));
    }

    #[test]
    fn test_validation_is_side_effect_free() {
        let cloud = ColoredPointCloud3d::from_points(vec![point(1.0, 2.0, 3.0, [0.1, 0.2, 0.3])]);
        let before = cloud.clone();
        let _ = validate(&cloud, 1);
        assert_eq!(cloud, before);
    }
}
