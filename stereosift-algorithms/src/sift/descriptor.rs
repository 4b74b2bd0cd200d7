//! Gradient-histogram descriptor computation

use super::extrema::OrientedExtremum;
use ndarray::Array2;
use std::f32::consts::TAU;
use stereosift_core::{Descriptor, DESCRIPTOR_SIZE};

/// Spatial histogram grid width (4x4 regions)
const DESC_WIDTH: usize = 4;
/// Orientation bins per region
const DESC_BINS: usize = 8;
/// Region size as a multiple of the keypoint sigma
const DESC_SCALE_FACTOR: f32 = 3.0;
/// Large normalized components are clamped here before renormalization
const DESC_MAG_THRESHOLD: f32 = 0.2;

/// Compute the 128-element descriptor for one oriented extremum, sampling
/// gradients from the gaussian layer it was detected in.
pub(crate) fn compute(img: &Array2<f32>, keypoint: &OrientedExtremum) -> Descriptor {
    let (height, width) = img.dim();
    let d = DESC_WIDTH;
    let n = DESC_BINS;

    let hist_width = DESC_SCALE_FACTOR * keypoint.sigma_octave;
    let radius = (hist_width * std::f32::consts::SQRT_2 * (d as f32 + 1.0) * 0.5 + 0.5) as isize;
    let cos_t = keypoint.orientation.cos() / hist_width;
    let sin_t = keypoint.orientation.sin() / hist_width;
    let bins_per_rad = n as f32 / TAU;
    let exp_scale = -2.0 / (d * d) as f32;

    // (d+2)^2 spatial bins x (n+2) orientation bins of accumulation
    // margin; folded into the final d*d*n vector afterwards
    let mut raw = vec![0.0f32; (d + 2) * (d + 2) * (n + 2)];

    let row = keypoint.row as isize;
    let col = keypoint.col as isize;

    for i in -radius..=radius {
        for j in -radius..=radius {
            let c_rot = j as f32 * cos_t - i as f32 * sin_t;
            let r_rot = j as f32 * sin_t + i as f32 * cos_t;
            let rbin = r_rot + d as f32 / 2.0 - 0.5;
            let cbin = c_rot + d as f32 / 2.0 - 0.5;

            if rbin <= -1.0 || rbin >= d as f32 || cbin <= -1.0 || cbin >= d as f32 {
                continue;
            }
            let y = row + i;
            let x = col + j;
            if y <= 0 || y >= height as isize - 1 || x <= 0 || x >= width as isize - 1 {
                continue;
            }

            let (y, x) = (y as usize, x as usize);
            let dx = img[[y, x + 1]] - img[[y, x - 1]];
            let dy = img[[y + 1, x]] - img[[y - 1, x]];
            let magnitude = (dx * dx + dy * dy).sqrt();
            if magnitude == 0.0 {
                continue;
            }
            let mut obin = (dy.atan2(dx) - keypoint.orientation) * bins_per_rad;
            while obin < 0.0 {
                obin += n as f32;
            }
            while obin >= n as f32 {
                obin -= n as f32;
            }
            let weight = ((c_rot * c_rot + r_rot * r_rot) * exp_scale).exp();

            accumulate(&mut raw, d, n, rbin, cbin, obin, magnitude * weight);
        }
    }

    // fold the circular orientation margin and flatten
    let mut values = [0.0f32; DESCRIPTOR_SIZE];
    for r in 0..d {
        for c in 0..d {
            let base = ((r + 1) * (d + 2) + (c + 1)) * (n + 2);
            raw[base] += raw[base + n];
            raw[base + 1] += raw[base + n + 1];
            for o in 0..n {
                values[(r * d + c) * n + o] = raw[base + o];
            }
        }
    }

    normalize(&mut values);
    Descriptor(values)
}

/// Trilinear accumulation of one weighted gradient sample
fn accumulate(raw: &mut [f32], d: usize, n: usize, rbin: f32, cbin: f32, obin: f32, value: f32) {
    let r0 = rbin.floor();
    let c0 = cbin.floor();
    let o0 = obin.floor();
    let rfrac = rbin - r0;
    let cfrac = cbin - c0;
    let ofrac = obin - o0;

    // r0/c0 are in [-1, d-1] after the caller's range check, so +1 keeps
    // them inside the padded grid
    let r_idx = (r0 as isize + 1) as usize;
    let c_idx = (c0 as isize + 1) as usize;
    let o_idx = o0 as usize;

    let stride_r = (d + 2) * (n + 2);
    let stride_c = n + 2;
    let base = r_idx * stride_r + c_idx * stride_c + o_idx;

    let v_r1 = value * rfrac;
    let v_r0 = value - v_r1;
    let v_rc11 = v_r1 * cfrac;
    let v_rc10 = v_r1 - v_rc11;
    let v_rc01 = v_r0 * cfrac;
    let v_rc00 = v_r0 - v_rc01;

    raw[base] += v_rc00 * (1.0 - ofrac);
    raw[base + 1] += v_rc00 * ofrac;
    raw[base + stride_c] += v_rc01 * (1.0 - ofrac);
    raw[base + stride_c + 1] += v_rc01 * ofrac;
    raw[base + stride_r] += v_rc10 * (1.0 - ofrac);
    raw[base + stride_r + 1] += v_rc10 * ofrac;
    raw[base + stride_r + stride_c] += v_rc11 * (1.0 - ofrac);
    raw[base + stride_r + stride_c + 1] += v_rc11 * ofrac;
}

/// Normalize to unit length, clamp dominant components, renormalize
fn normalize(values: &mut [f32; DESCRIPTOR_SIZE]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return;
    }
    for v in values.iter_mut() {
        *v = (*v / norm).min(DESC_MAG_THRESHOLD);
    }
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypoint_at(row: usize, col: usize, orientation: f32) -> OrientedExtremum {
        OrientedExtremum {
            octave: 0,
            layer: 1,
            row,
            col,
            sigma_octave: 1.6,
            x: col as f32,
            y: row as f32,
            scale: 1.6,
            orientation,
            response: 0.1,
        }
    }

    fn gradient_image(size: usize) -> Array2<f32> {
        let mut img = Array2::<f32>::zeros((size, size));
        for y in 0..size {
            for x in 0..size {
                img[[y, x]] = x as f32 * 0.01 + (y as f32 * 0.3).sin() * 0.05;
            }
        }
        img
    }

    #[test]
    fn test_descriptor_unit_norm() {
        let img = gradient_image(64);
        let descriptor = compute(&img, &keypoint_at(32, 32, 0.0));
        let norm: f32 = descriptor.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "norm = {}", norm);
    }

    #[test]
    fn test_flat_image_zero_descriptor() {
        let img = Array2::from_elem((64, 64), 0.5f32);
        let descriptor = compute(&img, &keypoint_at(32, 32, 0.0));
        assert!(descriptor.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_components_bounded_after_clamp() {
        let img = gradient_image(64);
        let descriptor = compute(&img, &keypoint_at(32, 32, 1.2));
        for &v in descriptor.iter() {
            assert!(v >= 0.0);
            // the renormalization can push clamped entries slightly above
            // the clamp value, but never much
            assert!(v < 0.3, "component {} suspiciously large", v);
        }
    }

    #[test]
    fn test_deterministic() {
        let img = gradient_image(48);
        let kp = keypoint_at(24, 24, 0.7);
        assert_eq!(compute(&img, &kp).0, compute(&img, &kp).0);
    }
}
