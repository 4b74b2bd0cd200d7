//! I/O operations for stereosift
//!
//! Reading and writing colored point clouds (PLY) and persisting
//! extracted feature sets. The readers and writers never mutate their
//! inputs; a loaded cloud is handed to the pipeline as-is.

pub mod features;
pub mod ply;

pub use features::{load_features, save_features};
pub use ply::{PlyReader, PlyWriter};

use stereosift_core::{ColoredPointCloud3d, Error, Result};

/// Trait for reading point clouds from files
pub trait PointCloudReader {
    fn read_point_cloud<P: AsRef<std::path::Path>>(path: P) -> Result<ColoredPointCloud3d>;
}

/// Trait for writing point clouds to files
pub trait PointCloudWriter {
    fn write_point_cloud<P: AsRef<std::path::Path>>(
        cloud: &ColoredPointCloud3d,
        path: P,
    ) -> Result<()>;
}

/// Auto-detect format and read a point cloud
pub fn read_point_cloud<P: AsRef<std::path::Path>>(path: P) -> Result<ColoredPointCloud3d> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some("ply") => ply::PlyReader::read_point_cloud(path),
        _ => Err(Error::UnsupportedFormat(format!(
            "unsupported point cloud format: {:?}",
            path.extension()
        ))),
    }
}

/// Auto-detect format and write a point cloud
pub fn write_point_cloud<P: AsRef<std::path::Path>>(
    cloud: &ColoredPointCloud3d,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some("ply") => ply::PlyWriter::write_point_cloud(cloud, path),
        _ => Err(Error::UnsupportedFormat(format!(
            "unsupported point cloud format: {:?}",
            path.extension()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use stereosift_core::{ColoredPoint3d, Point3d};

    #[test]
    fn test_ply_colored_round_trip() {
        let temp_file = "test_cloud_colored.ply";

        let cloud = ColoredPointCloud3d::from_points(vec![
            ColoredPoint3d::new(Point3d::new(0.0, 0.0, 0.0), [1.0, 0.0, 0.0]),
            ColoredPoint3d::new(Point3d::new(1.0, 2.0, 3.0), [0.0, 1.0, 0.0]),
            ColoredPoint3d::new(Point3d::new(-1.5, 0.25, 4.0), [0.0, 0.0, 1.0]),
        ]);

        ply::PlyWriter::write_point_cloud(&cloud, temp_file).unwrap();
        let loaded = ply::PlyReader::read_point_cloud(temp_file).unwrap();

        assert_eq!(cloud.len(), loaded.len());
        for (original, loaded) in cloud.iter().zip(loaded.iter()) {
            assert!((original.position - loaded.position).norm() < 1e-9);
            for (a, b) in original.color.iter().zip(loaded.color.iter()) {
                // colors pass through uchar quantization
                assert!((a - b).abs() < 1.0 / 255.0 + 1e-6);
            }
        }

        let _ = fs::remove_file(temp_file);
    }

    #[test]
    fn test_colorless_ply_defaults_to_gray() {
        let temp_file = "test_cloud_gray.ply";

        let ply_content = "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n0.0 0.0 0.0\n1.0 2.0 3.0\n";
        fs::write(temp_file, ply_content).unwrap();

        let loaded = ply::PlyReader::read_point_cloud(temp_file).unwrap();
        assert_eq!(loaded.len(), 2);
        for point in &loaded {
            assert_eq!(point.color, [0.5, 0.5, 0.5]);
        }
        assert_eq!(loaded[1].position, Point3d::new(1.0, 2.0, 3.0));

        let _ = fs::remove_file(temp_file);
    }

    #[test]
    fn test_uchar_color_ply_parsed() {
        let temp_file = "test_cloud_uchar.ply";

        let ply_content = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nproperty uchar red\nproperty uchar green\nproperty uchar blue\nend_header\n0.5 0.5 0.5 255 0 128\n";
        fs::write(temp_file, ply_content).unwrap();

        let loaded = ply::PlyReader::read_point_cloud(temp_file).unwrap();
        assert_eq!(loaded.len(), 1);
        let color = loaded[0].color;
        assert!((color[0] - 1.0).abs() < 1e-6);
        assert!(color[1].abs() < 1e-6);
        assert!((color[2] - 128.0 / 255.0).abs() < 1e-6);

        let _ = fs::remove_file(temp_file);
    }

    #[test]
    fn test_auto_detect_round_trip() {
        let temp_file = "test_cloud_auto.ply";
        let cloud = ColoredPointCloud3d::from_points(vec![ColoredPoint3d::new(
            Point3d::new(0.5, -0.5, 2.0),
            [0.2, 0.4, 0.6],
        )]);

        write_point_cloud(&cloud, temp_file).unwrap();
        let loaded = read_point_cloud(temp_file).unwrap();
        assert_eq!(cloud.len(), loaded.len());

        let _ = fs::remove_file(temp_file);
    }

    #[test]
    fn test_unsupported_format() {
        assert!(matches!(
            read_point_cloud("cloud.xyz"),
            Err(Error::UnsupportedFormat(_))
        ));
        let cloud = ColoredPointCloud3d::new();
        assert!(matches!(
            write_point_cloud(&cloud, "cloud.xyz"),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_vertex_element() {
        let temp_file = "test_cloud_novertex.ply";
        let ply_content = "ply\nformat ascii 1.0\nelement face 0\nproperty list uchar int vertex_indices\nend_header\n";
        fs::write(temp_file, ply_content).unwrap();

        let result = ply::PlyReader::read_point_cloud(temp_file);
        assert!(result.is_err());

        let _ = fs::remove_file(temp_file);
    }
}
