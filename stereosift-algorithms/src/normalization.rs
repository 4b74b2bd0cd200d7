//! Coordinate normalization
//!
//! Maps a cloud into a canonical frame: centered on its centroid and
//! rescaled by one isotropic factor so most coordinates fall within
//! `[-1, 1]`. The recorded parameters make the mapping invertible.

use serde::{Deserialize, Serialize};
use stereosift_core::{ColoredPoint3d, ColoredPointCloud3d, NormalizationMode, Point3d, Vector3d};

const DEGENERATE_EPS: f64 = 1e-10;

/// Recorded centroid/scale mapping between original and normalized frames.
///
/// `scale` is always positive; [`NormalizationParams::invert`] restores
/// original coordinates exactly (up to floating-point rounding).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    pub centroid: Vector3d,
    pub scale: f64,
}

impl NormalizationParams {
    /// The identity mapping
    pub fn identity() -> Self {
        Self {
            centroid: Vector3d::zeros(),
            scale: 1.0,
        }
    }

    /// Map a single point into the normalized frame
    pub fn apply_point(&self, point: &Point3d) -> Point3d {
        Point3d::from((point.coords - self.centroid) * self.scale)
    }

    /// Map a single normalized point back to original coordinates
    pub fn invert_point(&self, point: &Point3d) -> Point3d {
        Point3d::from(point.coords / self.scale + self.centroid)
    }

    /// Map a whole cloud into the normalized frame; colors pass through
    pub fn apply(&self, cloud: &ColoredPointCloud3d) -> ColoredPointCloud3d {
        cloud
            .iter()
            .map(|p| ColoredPoint3d::new(self.apply_point(&p.position), p.color))
            .collect()
    }

    /// Map a normalized cloud back to original coordinates
    pub fn invert(&self, cloud: &ColoredPointCloud3d) -> ColoredPointCloud3d {
        cloud
            .iter()
            .map(|p| ColoredPoint3d::new(self.invert_point(&p.position), p.color))
            .collect()
    }
}

/// Center a cloud on its centroid and rescale it isotropically.
///
/// The scale factor depends on `mode`: the reciprocal of the largest
/// absolute centered coordinate (`MaxAbs`) or of the RMS distance from the
/// centroid (`RmsDistance`). A cloud of coincident points keeps scale 1.0,
/// so the division can never blow up. Returns the normalized cloud together
/// with the parameters that produced it.
pub fn normalize(
    cloud: &ColoredPointCloud3d,
    mode: NormalizationMode,
) -> (ColoredPointCloud3d, NormalizationParams) {
    if cloud.is_empty() {
        return (cloud.clone(), NormalizationParams::identity());
    }

    let centroid = cloud.centroid();
    let scale = match mode {
        NormalizationMode::MaxAbs => {
            let max_abs = cloud
                .iter()
                .map(|p| {
                    let c = p.position.coords - centroid;
                    c.x.abs().max(c.y.abs()).max(c.z.abs())
                })
                .fold(0.0, f64::max);
            if max_abs > DEGENERATE_EPS {
                1.0 / max_abs
            } else {
                1.0
            }
        }
        NormalizationMode::RmsDistance => {
            let mean_sq = cloud
                .iter()
                .map(|p| (p.position.coords - centroid).norm_squared())
                .sum::<f64>()
                / cloud.len() as f64;
            let rms = mean_sq.sqrt();
            if rms > DEGENERATE_EPS {
                1.0 / rms
            } else {
                1.0
            }
        }
    };

    let params = NormalizationParams { centroid, scale };
    (params.apply(cloud), params)
}
