//! Synthetic sample clouds for demos and tests
//!
//! Generators take a caller-supplied [`Rng`] so seeded runs are
//! reproducible.

use crate::point::{ColoredPoint3d, Point3d};
use crate::point_cloud::ColoredPointCloud3d;
use rand::Rng;
use std::f64::consts::TAU;

/// Random cylinder-surface cloud centered at the origin: 60% side wall,
/// 20% top cap, 20% bottom cap. Side colors ramp from blue at the bottom
/// to red at the top; the caps are solid red and blue.
pub fn cylinder<R: Rng + ?Sized>(
    rng: &mut R,
    radius: f64,
    height: f64,
    num_points: usize,
) -> ColoredPointCloud3d {
    let side_points = num_points * 6 / 10;
    let top_points = num_points * 2 / 10;
    let bottom_points = num_points - side_points - top_points;

    let mut cloud = ColoredPointCloud3d::with_capacity(num_points);

    for _ in 0..side_points {
        let theta = rng.gen_range(0.0..TAU);
        let z = rng.gen_range(-height / 2.0..=height / 2.0);
        let t = ((z + height / 2.0) / height) as f32;
        cloud.push(ColoredPoint3d::new(
            Point3d::new(radius * theta.cos(), radius * theta.sin(), z),
            [t, 0.5 * (1.0 - (2.0 * t - 1.0).abs()), 1.0 - t],
        ));
    }
    for _ in 0..top_points {
        let (x, y) = disc_sample(rng, radius);
        cloud.push(ColoredPoint3d::new(
            Point3d::new(x, y, height / 2.0),
            [1.0, 0.0, 0.0],
        ));
    }
    for _ in 0..bottom_points {
        let (x, y) = disc_sample(rng, radius);
        cloud.push(ColoredPoint3d::new(
            Point3d::new(x, y, -height / 2.0),
            [0.0, 0.0, 1.0],
        ));
    }

    cloud
}

/// Random sphere-surface cloud with a z-based heat color ramp
pub fn sphere<R: Rng + ?Sized>(rng: &mut R, radius: f64, num_points: usize) -> ColoredPointCloud3d {
    let mut cloud = ColoredPointCloud3d::with_capacity(num_points);
    for _ in 0..num_points {
        let theta = rng.gen_range(0.0..TAU);
        let phi = rng.gen_range(0.0..std::f64::consts::PI);
        let z = radius * phi.cos();
        let r = ((z + radius) / (2.0 * radius)) as f32;
        cloud.push(ColoredPoint3d::new(
            Point3d::new(
                radius * phi.sin() * theta.cos(),
                radius * phi.sin() * theta.sin(),
                z,
            ),
            [r, 0.5, 1.0 - r],
        ));
    }
    cloud
}

/// Random cube-surface cloud, one solid color per face
pub fn cube<R: Rng + ?Sized>(rng: &mut R, size: f64, num_points: usize) -> ColoredPointCloud3d {
    // (fixed axis, sign, face color)
    const FACES: [(usize, f64, [f32; 3]); 6] = [
        (0, 1.0, [1.0, 0.0, 0.0]),
        (0, -1.0, [0.0, 0.0, 1.0]),
        (1, 1.0, [0.0, 1.0, 0.0]),
        (1, -1.0, [1.0, 1.0, 0.0]),
        (2, 1.0, [1.0, 0.0, 1.0]),
        (2, -1.0, [0.0, 1.0, 1.0]),
    ];

    let half = size / 2.0;
    let mut cloud = ColoredPointCloud3d::with_capacity(num_points);
    for i in 0..num_points {
        let (axis, sign, color) = FACES[i % FACES.len()];
        let mut coords = [
            rng.gen_range(-half..=half),
            rng.gen_range(-half..=half),
            rng.gen_range(-half..=half),
        ];
        coords[axis] = sign * half;
        cloud.push(ColoredPoint3d::new(
            Point3d::new(coords[0], coords[1], coords[2]),
            color,
        ));
    }
    cloud
}

/// Uniform sample on a disc of the given radius; the square root keeps the
/// density uniform in area.
fn disc_sample<R: Rng + ?Sized>(rng: &mut R, radius: f64) -> (f64, f64) {
    let r = radius * rng.gen_range(0.0..=1.0f64).sqrt();
    let theta = rng.gen_range(0.0..TAU);
    (r * theta.cos(), r * theta.sin())
}
