//! PLY format support

use crate::{PointCloudReader, PointCloudWriter};
use ply_rs::{
    parser::Parser,
    ply::{
        Addable, DefaultElement, ElementDef, Ply, Property, PropertyDef, PropertyType, ScalarType,
    },
    writer::Writer,
};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use stereosift_core::{ColoredPoint3d, ColoredPointCloud3d, Error, Point3d, Result};

pub struct PlyReader;
pub struct PlyWriter;

impl PointCloudReader for PlyReader {
    fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<ColoredPointCloud3d> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(&mut reader)?;

        let vertices = ply
            .payload
            .get("vertex")
            .ok_or_else(|| Error::InvalidCloud("PLY file has no vertex element".to_string()))?;

        let mut points = Vec::with_capacity(vertices.len());
        for vertex in vertices {
            let x = extract_coordinate(vertex, "x")?;
            let y = extract_coordinate(vertex, "y")?;
            let z = extract_coordinate(vertex, "z")?;

            // files without color data default to mid gray
            let color = match (
                extract_channel(vertex, "red"),
                extract_channel(vertex, "green"),
                extract_channel(vertex, "blue"),
            ) {
                (Some(r), Some(g), Some(b)) => [r, g, b],
                _ => [0.5, 0.5, 0.5],
            };

            points.push(ColoredPoint3d::new(Point3d::new(x, y, z), color));
        }

        Ok(ColoredPointCloud3d::from_points(points))
    }
}

impl PointCloudWriter for PlyWriter {
    fn write_point_cloud<P: AsRef<Path>>(cloud: &ColoredPointCloud3d, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let mut ply = Ply::<DefaultElement>::new();

        let mut vertex_element = ElementDef::new("vertex".to_string());
        vertex_element.count = cloud.len();
        for name in ["x", "y", "z"] {
            vertex_element.properties.add(PropertyDef::new(
                name.to_string(),
                PropertyType::Scalar(ScalarType::Double),
            ));
        }
        for name in ["red", "green", "blue"] {
            vertex_element.properties.add(PropertyDef::new(
                name.to_string(),
                PropertyType::Scalar(ScalarType::UChar),
            ));
        }
        ply.header.elements.add(vertex_element);

        let mut vertices = Vec::with_capacity(cloud.len());
        for point in cloud.iter() {
            let [r, g, b] = color_to_bytes(point.color);
            let mut vertex = DefaultElement::new();
            vertex.insert("x".to_string(), Property::Double(point.position.x));
            vertex.insert("y".to_string(), Property::Double(point.position.y));
            vertex.insert("z".to_string(), Property::Double(point.position.z));
            vertex.insert("red".to_string(), Property::UChar(r));
            vertex.insert("green".to_string(), Property::UChar(g));
            vertex.insert("blue".to_string(), Property::UChar(b));
            vertices.push(vertex);
        }
        ply.payload.insert("vertex".to_string(), vertices);

        let writer_instance = Writer::new();
        writer_instance.write_ply(&mut writer, &mut ply)?;

        Ok(())
    }
}

/// Extract a coordinate property as f64 from a PLY element
fn extract_coordinate(element: &DefaultElement, name: &str) -> Result<f64> {
    match element.get(name) {
        Some(Property::Double(val)) => Ok(*val),
        Some(Property::Float(val)) => Ok(*val as f64),
        Some(Property::Int(val)) => Ok(*val as f64),
        Some(Property::UInt(val)) => Ok(*val as f64),
        _ => Err(Error::InvalidCloud(format!(
            "property '{}' not found or invalid type",
            name
        ))),
    }
}

/// Extract a color channel, normalizing uchar 0-255 storage to `[0, 1]`
fn extract_channel(element: &DefaultElement, name: &str) -> Option<f32> {
    match element.get(name) {
        Some(Property::UChar(val)) => Some(*val as f32 / 255.0),
        Some(Property::Float(val)) => Some(*val),
        Some(Property::Double(val)) => Some(*val as f32),
        _ => None,
    }
}

fn color_to_bytes(color: [f32; 3]) -> [u8; 3] {
    color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_byte_round_trip() {
        let bytes = color_to_bytes([0.0, 0.5, 1.0]);
        assert_eq!(bytes, [0, 128, 255]);
    }

    #[test]
    fn test_color_clamped() {
        let bytes = color_to_bytes([-0.5, 2.0, 0.25]);
        assert_eq!(bytes, [0, 255, 64]);
    }
}
