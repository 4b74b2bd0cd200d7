//! DoG extremum detection, sub-pixel refinement and orientation assignment

use super::scale_space::{Octave, ScaleSpace};
use nalgebra::{Matrix3, Vector3};
use ndarray::Array2;
use std::f32::consts::TAU;
use stereosift_core::SiftConfig;

/// Cells this close to the raster edge are not searched
const IMG_BORDER: usize = 5;
/// Maximum sub-pixel refinement iterations before a candidate is discarded
const MAX_INTERP_STEPS: usize = 5;
/// Orientation histogram resolution
const ORI_BINS: usize = 36;
/// Orientation window radius, as a multiple of the keypoint sigma
const ORI_RADIUS_FACTOR: f32 = 4.5; // 3 * 1.5σ
const ORI_SIGMA_FACTOR: f32 = 1.5;
/// Secondary orientation peaks above this fraction of the maximum also
/// become keypoints
const ORI_PEAK_RATIO: f32 = 0.8;

/// A refined, oriented scale-space extremum, prior to descriptor
/// computation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OrientedExtremum {
    pub octave: usize,
    /// Gaussian layer the orientation/descriptor samples are drawn from
    pub layer: usize,
    /// Integer cell within the octave image
    pub row: usize,
    pub col: usize,
    /// Scale within the octave, in octave pixels
    pub sigma_octave: f32,
    /// Sub-pixel position in input-raster coordinates
    pub x: f32,
    pub y: f32,
    /// Absolute scale in input-raster pixels
    pub scale: f32,
    pub orientation: f32,
    pub response: f32,
}

/// Scan every DoG layer for local extrema and refine the survivors.
/// Deterministic: octave → layer → row → column order.
pub(crate) fn scan(space: &ScaleSpace, config: &SiftConfig) -> Vec<OrientedExtremum> {
    let layers = space.octave_layers;
    let prefilter = 0.5 * config.contrast_threshold / layers as f32;

    let mut found = Vec::new();
    for (octave_idx, octave) in space.octaves.iter().enumerate() {
        let (height, width) = octave.dogs[0].dim();
        if height <= 2 * IMG_BORDER || width <= 2 * IMG_BORDER {
            continue;
        }
        for layer in 1..=layers {
            for row in IMG_BORDER..height - IMG_BORDER {
                for col in IMG_BORDER..width - IMG_BORDER {
                    let value = octave.dogs[layer][[row, col]];
                    if value.abs() <= prefilter {
                        continue;
                    }
                    if !is_local_extremum(octave, layer, row, col, value) {
                        continue;
                    }
                    let Some(refined) = refine(octave, octave_idx, layer, row, col, space, config)
                    else {
                        continue;
                    };
                    emit_oriented(octave, &refined, &mut found);
                }
            }
        }
    }
    found
}

/// Refinement output before orientation assignment
#[derive(Debug, Clone, Copy)]
struct RefinedExtremum {
    octave: usize,
    layer: usize,
    row: usize,
    col: usize,
    sigma_octave: f32,
    x: f32,
    y: f32,
    scale: f32,
    response: f32,
}

fn is_local_extremum(octave: &Octave, layer: usize, row: usize, col: usize, value: f32) -> bool {
    let planes = [
        &octave.dogs[layer - 1],
        &octave.dogs[layer],
        &octave.dogs[layer + 1],
    ];
    if value > 0.0 {
        for plane in planes {
            for dr in -1isize..=1 {
                for dc in -1isize..=1 {
                    let v = plane[[(row as isize + dr) as usize, (col as isize + dc) as usize]];
                    if value < v {
                        return false;
                    }
                }
            }
        }
    } else {
        for plane in planes {
            for dr in -1isize..=1 {
                for dc in -1isize..=1 {
                    let v = plane[[(row as isize + dr) as usize, (col as isize + dc) as usize]];
                    if value > v {
                        return false;
                    }
                }
            }
        }
    }
    true
}

/// 3D gradient of the DoG stack at an interior sample
fn gradient(octave: &Octave, layer: usize, row: usize, col: usize) -> Vector3<f32> {
    let prev = &octave.dogs[layer - 1];
    let curr = &octave.dogs[layer];
    let next = &octave.dogs[layer + 1];
    Vector3::new(
        (curr[[row, col + 1]] - curr[[row, col - 1]]) * 0.5,
        (curr[[row + 1, col]] - curr[[row - 1, col]]) * 0.5,
        (next[[row, col]] - prev[[row, col]]) * 0.5,
    )
}

/// 3D Hessian of the DoG stack at an interior sample
fn hessian(octave: &Octave, layer: usize, row: usize, col: usize) -> Matrix3<f32> {
    let prev = &octave.dogs[layer - 1];
    let curr = &octave.dogs[layer];
    let next = &octave.dogs[layer + 1];
    let center = curr[[row, col]];

    let dxx = curr[[row, col + 1]] + curr[[row, col - 1]] - 2.0 * center;
    let dyy = curr[[row + 1, col]] + curr[[row - 1, col]] - 2.0 * center;
    let dss = next[[row, col]] + prev[[row, col]] - 2.0 * center;
    let dxy = (curr[[row + 1, col + 1]] - curr[[row + 1, col - 1]]
        - curr[[row - 1, col + 1]]
        + curr[[row - 1, col - 1]])
        * 0.25;
    let dxs = (next[[row, col + 1]] - next[[row, col - 1]] - prev[[row, col + 1]]
        + prev[[row, col - 1]])
        * 0.25;
    let dys = (next[[row + 1, col]] - next[[row - 1, col]] - prev[[row + 1, col]]
        + prev[[row - 1, col]])
        * 0.25;

    Matrix3::new(dxx, dxy, dxs, dxy, dyy, dys, dxs, dys, dss)
}

/// Iteratively fit a 3D quadratic to localize the extremum at sub-pixel
/// accuracy, then apply the contrast and edge-response rejection tests.
fn refine(
    octave: &Octave,
    octave_idx: usize,
    layer: usize,
    row: usize,
    col: usize,
    space: &ScaleSpace,
    config: &SiftConfig,
) -> Option<RefinedExtremum> {
    let layers = space.octave_layers;
    let (height, width) = octave.dogs[0].dim();

    let mut l = layer as isize;
    let mut r = row as isize;
    let mut c = col as isize;
    let mut offset = Vector3::zeros();
    let mut converged = false;

    for _ in 0..MAX_INTERP_STEPS {
        let g = gradient(octave, l as usize, r as usize, c as usize);
        let h = hessian(octave, l as usize, r as usize, c as usize);
        offset = -(h.try_inverse()? * g);

        if offset.x.abs() < 0.5 && offset.y.abs() < 0.5 && offset.z.abs() < 0.5 {
            converged = true;
            break;
        }

        c += offset.x.round() as isize;
        r += offset.y.round() as isize;
        l += offset.z.round() as isize;

        if l < 1
            || l > layers as isize
            || r < IMG_BORDER as isize
            || r >= (height - IMG_BORDER) as isize
            || c < IMG_BORDER as isize
            || c >= (width - IMG_BORDER) as isize
        {
            return None;
        }
    }
    if !converged {
        return None;
    }

    let (l, r, c) = (l as usize, r as usize, c as usize);
    let g = gradient(octave, l, r, c);
    let contrast = octave.dogs[l][[r, c]] + 0.5 * g.dot(&offset);
    if contrast.abs() * (layers as f32) < config.contrast_threshold {
        return None;
    }

    // reject edge responses via the 2x2 spatial Hessian curvature ratio
    let curr = &octave.dogs[l];
    let center = curr[[r, c]];
    let dxx = curr[[r, c + 1]] + curr[[r, c - 1]] - 2.0 * center;
    let dyy = curr[[r + 1, c]] + curr[[r - 1, c]] - 2.0 * center;
    let dxy = (curr[[r + 1, c + 1]] - curr[[r + 1, c - 1]] - curr[[r - 1, c + 1]]
        + curr[[r - 1, c - 1]])
        * 0.25;
    let trace = dxx + dyy;
    let det = dxx * dyy - dxy * dxy;
    let edge = config.edge_threshold;
    if det <= 0.0 || trace * trace * edge >= (edge + 1.0) * (edge + 1.0) * det {
        return None;
    }

    let octave_scale = (1usize << octave_idx) as f32;
    let sigma_octave =
        space.sigma * 2f32.powf((l as f32 + offset.z) / layers as f32);

    Some(RefinedExtremum {
        octave: octave_idx,
        layer: l,
        row: r,
        col: c,
        sigma_octave,
        x: (c as f32 + offset.x) * octave_scale,
        y: (r as f32 + offset.y) * octave_scale,
        scale: sigma_octave * octave_scale,
        response: contrast.abs(),
    })
}

/// Build the gradient-orientation histogram around a refined extremum and
/// emit one oriented keypoint per dominant peak.
fn emit_oriented(octave: &Octave, refined: &RefinedExtremum, out: &mut Vec<OrientedExtremum>) {
    let img = &octave.gaussians[refined.layer];
    let radius = (ORI_RADIUS_FACTOR * refined.sigma_octave).round().max(1.0) as isize;
    let weight_sigma = ORI_SIGMA_FACTOR * refined.sigma_octave;
    let denom = 2.0 * weight_sigma * weight_sigma;

    let hist = orientation_histogram(img, refined.row, refined.col, radius, denom);
    let smoothed = smooth_histogram(&hist);

    let max_value = smoothed.iter().cloned().fold(0.0f32, f32::max);
    if max_value <= 0.0 {
        return;
    }

    for bin in 0..ORI_BINS {
        let left = smoothed[(bin + ORI_BINS - 1) % ORI_BINS];
        let center = smoothed[bin];
        let right = smoothed[(bin + 1) % ORI_BINS];
        if center > left && center > right && center >= ORI_PEAK_RATIO * max_value {
            // parabolic interpolation of the peak position
            let mut interp =
                bin as f32 + 0.5 * (left - right) / (left - 2.0 * center + right);
            if interp < 0.0 {
                interp += ORI_BINS as f32;
            } else if interp >= ORI_BINS as f32 {
                interp -= ORI_BINS as f32;
            }
            let orientation = interp / ORI_BINS as f32 * TAU;

            out.push(OrientedExtremum {
                octave: refined.octave,
                layer: refined.layer,
                row: refined.row,
                col: refined.col,
                sigma_octave: refined.sigma_octave,
                x: refined.x,
                y: refined.y,
                scale: refined.scale,
                orientation,
                response: refined.response,
            });
        }
    }
}

fn orientation_histogram(
    img: &Array2<f32>,
    row: usize,
    col: usize,
    radius: isize,
    denom: f32,
) -> [f32; ORI_BINS] {
    let (height, width) = img.dim();
    let mut hist = [0.0f32; ORI_BINS];

    for dr in -radius..=radius {
        let y = row as isize + dr;
        if y <= 0 || y >= height as isize - 1 {
            continue;
        }
        for dc in -radius..=radius {
            let x = col as isize + dc;
            if x <= 0 || x >= width as isize - 1 {
                continue;
            }
            let (y, x) = (y as usize, x as usize);
            let dx = img[[y, x + 1]] - img[[y, x - 1]];
            let dy = img[[y + 1, x]] - img[[y - 1, x]];
            let magnitude = (dx * dx + dy * dy).sqrt();
            let orientation = dy.atan2(dx);
            let weight = (-((dr * dr + dc * dc) as f32) / denom).exp();

            let mut bin = (orientation / TAU * ORI_BINS as f32).round() as isize;
            bin = bin.rem_euclid(ORI_BINS as isize);
            hist[bin as usize] += weight * magnitude;
        }
    }
    hist
}

/// Circular [1 4 6 4 1]/16 smoothing pass
fn smooth_histogram(hist: &[f32; ORI_BINS]) -> [f32; ORI_BINS] {
    let n = ORI_BINS;
    let mut out = [0.0f32; ORI_BINS];
    for i in 0..n {
        out[i] = (hist[(i + n - 2) % n] + hist[(i + 2) % n]) * (1.0 / 16.0)
            + (hist[(i + n - 1) % n] + hist[(i + 1) % n]) * (4.0 / 16.0)
            + hist[i] * (6.0 / 16.0);
    }
    out
}
