//! Scale-invariant feature detection on projection rasters
//!
//! A self-contained 2D detector/descriptor: Gaussian scale space,
//! difference-of-Gaussians extrema with sub-pixel refinement, orientation
//! assignment, and 128-element gradient-histogram descriptors. Input
//! rasters are `f32` intensities in `[0, 1]`; every step is deterministic,
//! so identical rasters always produce identical keypoint lists.

mod descriptor;
mod extrema;
mod scale_space;

use ndarray::Array2;
use scale_space::ScaleSpace;
use stereosift_core::{Descriptor, SiftConfig};

/// Rasters smaller than this on either side are not searched at all
const MIN_RASTER_DIM: usize = 16;

/// A 2D detection in raster coordinates, before lift-back
#[derive(Debug, Clone, PartialEq)]
pub struct SiftKeypoint {
    /// Sub-pixel column coordinate
    pub x: f32,
    /// Sub-pixel row coordinate
    pub y: f32,
    /// Detection scale (sigma) in raster pixels
    pub scale: f32,
    /// Dominant gradient orientation, radians in `[0, 2π)`
    pub orientation: f32,
    /// Absolute interpolated DoG contrast
    pub response: f32,
    pub descriptor: Descriptor,
}

/// Detect keypoints over a raster and compute their descriptors.
///
/// Returns detections in scan order (octave, layer, row, column,
/// orientation peak); callers relying on reproducibility get the same
/// order for the same input. A raster too small to carry an octave
/// yields no detections.
pub fn detect_and_describe(raster: &Array2<f32>, config: &SiftConfig) -> Vec<SiftKeypoint> {
    let (height, width) = raster.dim();
    if height.min(width) < MIN_RASTER_DIM {
        return Vec::new();
    }

    let space = ScaleSpace::build(raster, config);
    let oriented = extrema::scan(&space, config);

    oriented
        .iter()
        .map(|kp| {
            let img = &space.octaves[kp.octave].gaussians[kp.layer];
            SiftKeypoint {
                x: kp.x,
                y: kp.y,
                scale: kp.scale,
                orientation: kp.orientation,
                response: kp.response,
                descriptor: descriptor::compute(img, kp),
            }
        })
        .collect()
}
