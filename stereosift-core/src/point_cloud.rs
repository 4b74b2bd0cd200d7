//! Point cloud data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// A generic point cloud container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloud<T> {
    pub points: Vec<T>,
}

/// A point cloud with colored double-precision points
pub type ColoredPointCloud3d = PointCloud<ColoredPoint3d>;

impl<T> PointCloud<T> {
    /// Create a new empty point cloud
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a new point cloud with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Create a point cloud from a vector of points
    pub fn from_points(points: Vec<T>) -> Self {
        Self { points }
    }

    /// Get the number of points in the cloud
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point to the cloud
    pub fn push(&mut self, point: T) {
        self.points.push(point);
    }

    /// Get an iterator over the points
    pub fn iter(&self) -> std::slice::Iter<T> {
        self.points.iter()
    }

    /// Get a mutable iterator over the points
    pub fn iter_mut(&mut self) -> std::slice::IterMut<T> {
        self.points.iter_mut()
    }
}

impl<T> Default for PointCloud<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for PointCloud<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<T> IndexMut<usize> for PointCloud<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.points[index]
    }
}

impl<T> IntoIterator for PointCloud<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a PointCloud<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl<T> Extend<T> for PointCloud<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.points.extend(iter);
    }
}

impl<T> FromIterator<T> for PointCloud<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            points: Vec::from_iter(iter),
        }
    }
}

impl ColoredPointCloud3d {
    /// Build a cloud from parallel position/color arrays, the shape point
    /// cloud sources deliver data in. Fails when the counts disagree.
    pub fn from_arrays(positions: Vec<Point3d>, colors: Vec<[f32; 3]>) -> Result<Self> {
        if positions.len() != colors.len() {
            return Err(Error::InvalidCloud(format!(
                "position/color count mismatch: {} positions, {} colors",
                positions.len(),
                colors.len()
            )));
        }
        Ok(Self {
            points: positions
                .into_iter()
                .zip(colors)
                .map(|(position, color)| ColoredPoint3d { position, color })
                .collect(),
        })
    }

    /// Mean position of all points; the origin for an empty cloud.
    pub fn centroid(&self) -> Vector3d {
        if self.is_empty() {
            return Vector3d::zeros();
        }
        let sum = self
            .points
            .iter()
            .fold(Vector3d::zeros(), |acc, p| acc + p.position.coords);
        sum / self.len() as f64
    }

    /// Axis-aligned bounding box of the cloud
    pub fn bounding_box(&self) -> (Point3d, Point3d) {
        if self.is_empty() {
            return (Point3d::origin(), Point3d::origin());
        }

        let mut min = self.points[0].position;
        let mut max = min;

        for point in &self.points {
            let p = &point.position;
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(x: f64, y: f64, z: f64) -> ColoredPoint3d {
        ColoredPoint3d::new(Point3d::new(x, y, z), [0.5, 0.5, 0.5])
    }

    #[test]
    fn test_from_arrays_matching_counts() {
        let cloud = ColoredPointCloud3d::from_arrays(
            vec![Point3d::new(0.0, 0.0, 0.0), Point3d::new(1.0, 2.0, 3.0)],
            vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]],
        )
        .unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud[1].position, Point3d::new(1.0, 2.0, 3.0));
        assert_eq!(cloud[1].color, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_from_arrays_mismatched_counts() {
        let result = ColoredPointCloud3d::from_arrays(
            vec![Point3d::new(0.0, 0.0, 0.0)],
            vec![[0.0; 3], [1.0; 3]],
        );
        assert!(matches!(result, Err(Error::InvalidCloud(_))));
    }

    #[test]
    fn test_centroid() {
        let cloud = ColoredPointCloud3d::from_points(vec![
            gray(0.0, 0.0, 0.0),
            gray(2.0, 4.0, 6.0),
        ]);
        let c = cloud.centroid();
        assert_eq!(c, Vector3d::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_centroid_empty() {
        let cloud = ColoredPointCloud3d::new();
        assert_eq!(cloud.centroid(), Vector3d::zeros());
    }

    #[test]
    fn test_bounding_box() {
        let cloud = ColoredPointCloud3d::from_points(vec![
            gray(-1.0, 2.0, 0.5),
            gray(3.0, -2.0, 0.0),
            gray(0.0, 0.0, 4.0),
        ]);
        let (min, max) = cloud.bounding_box();
        assert_eq!(min, Point3d::new(-1.0, -2.0, 0.0));
        assert_eq!(max, Point3d::new(3.0, 2.0, 4.0));
    }
}
