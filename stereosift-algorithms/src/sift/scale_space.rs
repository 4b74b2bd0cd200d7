//! Gaussian scale space and difference-of-Gaussians pyramid

use ndarray::Array2;
use stereosift_core::SiftConfig;

/// Blur already present in an incoming raster
const INITIAL_BLUR: f32 = 0.5;
/// Smallest octave dimension still worth searching
const MIN_OCTAVE_DIM: usize = 16;

/// One pyramid octave: `octave_layers + 3` progressively blurred images
/// and the `octave_layers + 2` differences between neighbors.
pub(crate) struct Octave {
    pub gaussians: Vec<Array2<f32>>,
    pub dogs: Vec<Array2<f32>>,
}

/// The full Gaussian/DoG pyramid for one raster
pub(crate) struct ScaleSpace {
    pub octaves: Vec<Octave>,
    pub octave_layers: usize,
    pub sigma: f32,
}

impl ScaleSpace {
    /// Build the pyramid. Each octave halves the resolution; the next
    /// octave seeds from the gaussian holding twice the base sigma.
    pub fn build(raster: &Array2<f32>, config: &SiftConfig) -> Self {
        let layers = config.octave_layers;
        let (height, width) = raster.dim();
        let min_dim = height.min(width);

        let n_octaves = if min_dim < MIN_OCTAVE_DIM {
            1
        } else {
            ((min_dim as f32).log2().floor() as usize).saturating_sub(3).max(1)
        };

        // bring the raster up to the base blur level
        let base_delta =
            (config.sigma * config.sigma - INITIAL_BLUR * INITIAL_BLUR).max(0.01).sqrt();
        let base = gaussian_blur(raster, base_delta);

        // incremental blur from layer i-1 to layer i, following the
        // geometric sigma schedule k = 2^(1/layers)
        let k = 2f32.powf(1.0 / layers as f32);
        let mut deltas = vec![0.0f32; layers + 3];
        for (i, delta) in deltas.iter_mut().enumerate().skip(1) {
            let prev = config.sigma * k.powi(i as i32 - 1);
            let total = prev * k;
            *delta = (total * total - prev * prev).sqrt();
        }

        let mut octaves = Vec::with_capacity(n_octaves);
        let mut seed = base;
        for _ in 0..n_octaves {
            let mut gaussians = Vec::with_capacity(layers + 3);
            gaussians.push(seed);
            for delta in deltas.iter().skip(1) {
                let blurred = gaussian_blur(gaussians.last().expect("seeded"), *delta);
                gaussians.push(blurred);
            }

            let dogs = (0..layers + 2)
                .map(|i| &gaussians[i + 1] - &gaussians[i])
                .collect();

            seed = downsample(&gaussians[layers]);
            octaves.push(Octave { gaussians, dogs });

            let (h, w) = octaves
                .last()
                .expect("just pushed")
                .gaussians[0]
                .dim();
            if h.min(w) / 2 < MIN_OCTAVE_DIM {
                break;
            }
        }

        Self {
            octaves,
            octave_layers: layers,
            sigma: config.sigma,
        }
    }
}

/// Separable Gaussian blur with replicated borders
pub(crate) fn gaussian_blur(img: &Array2<f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 {
        return img.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let (height, width) = img.dim();

    let mut rows_pass = Array2::<f32>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, &weight) in kernel.iter().enumerate() {
                let xi = (x as isize + k as isize - radius).clamp(0, width as isize - 1);
                acc += weight * img[[y, xi as usize]];
            }
            rows_pass[[y, x]] = acc;
        }
    }

    let mut out = Array2::<f32>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, &weight) in kernel.iter().enumerate() {
                let yi = (y as isize + k as isize - radius).clamp(0, height as isize - 1);
                acc += weight * rows_pass[[yi as usize, x]];
            }
            out[[y, x]] = acc;
        }
    }
    out
}

/// Normalized 1D Gaussian kernel with radius `ceil(3σ)`
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as usize;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..2 * radius + 1)
        .map(|i| {
            let d = i as f32 - radius as f32;
            (-d * d / denom).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// 2× downsample by dropping every other row and column
pub(crate) fn downsample(img: &Array2<f32>) -> Array2<f32> {
    let (height, width) = img.dim();
    let new_h = (height / 2).max(1);
    let new_w = (width / 2).max(1);
    let mut out = Array2::<f32>::zeros((new_h, new_w));
    for y in 0..new_h {
        for x in 0..new_w {
            out[[y, x]] = img[[(y * 2).min(height - 1), (x * 2).min(width - 1)]];
        }
    }
    out
}
