//! Planar projection of a cloud onto a 2D raster
//!
//! This is the bridge between unordered 3D points and the 2D world the
//! feature detector operates on. The cloud is flattened along its
//! shortest-extent axis onto a fixed-size raster; the cell→point index
//! table recorded alongside the raster makes the mapping invertible for
//! lift-back.
//!
//! Conventions, identical for both clouds of a stereo run:
//! - raster columns span the remaining lower-index axis, rows the higher
//! - cell collisions are resolved by the configured [`DepthConvention`];
//!   equal depths keep the earlier point index
//! - a cell's intensity is the winning point's depth, min-max normalized
//!   over the cloud to `[0, 1]` (0.5 when the cloud has no depth spread)
//! - unoccupied cells rasterize at 0.0 and record no indices

use itertools::{Itertools, MinMaxResult};
use ndarray::Array2;
use stereosift_core::{ColoredPointCloud3d, DepthConvention, Error, PipelineConfig, Result};
use std::cmp::Ordering;

const DEGENERATE_EPS: f64 = 1e-10;

/// Axis assignment chosen for a projection: the raster plane spans
/// `u_axis` (columns) and `v_axis` (rows); `depth_axis` resolves cell
/// collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionPlane {
    pub u_axis: usize,
    pub v_axis: usize,
    pub depth_axis: usize,
}

/// A 2D raster derived from a cloud, plus the per-cell point index table.
///
/// Rebuilt fresh per cloud and never mutated after creation; every stored
/// index refers to a valid position in the cloud that was projected.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionMap {
    width: usize,
    height: usize,
    plane: ProjectionPlane,
    convention: DepthConvention,
    /// Row-major `[height, width]` intensity raster
    intensity: Array2<f32>,
    /// All point indices contributing to each cell, in input order
    cells: Vec<Vec<u32>>,
    /// Depth winner per cell under the configured convention
    winners: Vec<Option<u32>>,
    occupied: usize,
}

impl ProjectionMap {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn plane(&self) -> ProjectionPlane {
        self.plane
    }

    pub fn convention(&self) -> DepthConvention {
        self.convention
    }

    /// The intensity raster the feature detector runs over
    pub fn intensity(&self) -> &Array2<f32> {
        &self.intensity
    }

    /// All point indices that projected into the cell
    pub fn cell_indices(&self, row: usize, col: usize) -> &[u32] {
        &self.cells[row * self.width + col]
    }

    /// The cell's depth winner, if any point projected there
    pub fn winner(&self, row: usize, col: usize) -> Option<usize> {
        self.winners[row * self.width + col].map(|idx| idx as usize)
    }

    pub fn is_occupied(&self, row: usize, col: usize) -> bool {
        self.winners[row * self.width + col].is_some()
    }

    /// Number of cells at least one point projected into
    pub fn occupied_cells(&self) -> usize {
        self.occupied
    }

    /// A map with no occupied cells, for exercising degenerate paths
    pub(crate) fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            plane: ProjectionPlane {
                u_axis: 0,
                v_axis: 1,
                depth_axis: 2,
            },
            convention: DepthConvention::NearestWins,
            intensity: Array2::zeros((height, width)),
            cells: vec![Vec::new(); width * height],
            winners: vec![None; width * height],
            occupied: 0,
        }
    }
}

/// Pick the raster plane: the two largest bounding-box extents form the
/// plane, the smallest becomes depth. Ties keep the lower axis index
/// earlier, so an axis-symmetric cloud always projects the same way.
fn choose_plane(extents: &[f64; 3]) -> ProjectionPlane {
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| {
        extents[b]
            .partial_cmp(&extents[a])
            .unwrap_or(Ordering::Equal)
    });
    let depth_axis = order[2];
    let (u_axis, v_axis) = match depth_axis {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    };
    ProjectionPlane {
        u_axis,
        v_axis,
        depth_axis,
    }
}

/// Planar window for one raster axis: the bounding interval expanded by
/// the margin, with a degenerate (zero-extent) interval widened so every
/// point lands in cell 0 instead of dividing by zero.
fn axis_window(lo: f64, hi: f64, margin: f64) -> (f64, f64) {
    let extent = hi - lo;
    let pad = extent * margin;
    let mut range = extent + 2.0 * pad;
    if range < DEGENERATE_EPS {
        range = 1.0;
    }
    (lo - pad, range)
}

fn quantize(value: f64, lo: f64, range: f64, cells: usize) -> usize {
    let t = ((value - lo) / range * (cells - 1) as f64).floor().max(0.0) as usize;
    t.min(cells - 1)
}

/// Project a cloud onto a `raster_width × raster_height` grid.
///
/// Pure: the result is a function of the cloud and configuration alone,
/// and iteration runs in point-index order, so two calls on identical
/// input produce identical maps.
pub fn project(cloud: &ColoredPointCloud3d, config: &PipelineConfig) -> Result<ProjectionMap> {
    if cloud.is_empty() {
        return Err(Error::InvalidCloud(
            "cannot project an empty cloud".to_string(),
        ));
    }
    let width = config.raster_width;
    let height = config.raster_height;
    if width == 0 || height == 0 {
        return Err(Error::InvalidConfig(format!(
            "raster dimensions must be positive, got {}x{}",
            width, height
        )));
    }

    let (min, max) = cloud.bounding_box();
    let extents = [max.x - min.x, max.y - min.y, max.z - min.z];
    let plane = choose_plane(&extents);

    let (u_lo, u_range) = axis_window(min[plane.u_axis], max[plane.u_axis], config.raster_margin);
    let (v_lo, v_range) = axis_window(min[plane.v_axis], max[plane.v_axis], config.raster_margin);

    let (depth_lo, depth_hi) = match cloud.iter().map(|p| p.position[plane.depth_axis]).minmax() {
        MinMaxResult::NoElements => unreachable!("cloud checked non-empty"),
        MinMaxResult::OneElement(d) => (d, d),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };
    let depth_range = depth_hi - depth_lo;

    let mut cells: Vec<Vec<u32>> = vec![Vec::new(); width * height];
    let mut winners: Vec<Option<u32>> = vec![None; width * height];

    for (idx, point) in cloud.iter().enumerate() {
        let col = quantize(point.position[plane.u_axis], u_lo, u_range, width);
        let row = quantize(point.position[plane.v_axis], v_lo, v_range, height);
        let cell = row * width + col;
        let depth = point.position[plane.depth_axis];

        cells[cell].push(idx as u32);

        let wins = match winners[cell] {
            None => true,
            Some(current) => {
                let current_depth = cloud[current as usize].position[plane.depth_axis];
                match config.depth_convention {
                    DepthConvention::NearestWins => depth < current_depth,
                    DepthConvention::FarthestWins => depth > current_depth,
                }
            }
        };
        if wins {
            winners[cell] = Some(idx as u32);
        }
    }

    let mut intensity = Array2::<f32>::zeros((height, width));
    let mut occupied = 0;
    for row in 0..height {
        for col in 0..width {
            if let Some(winner) = winners[row * width + col] {
                occupied += 1;
                let depth = cloud[winner as usize].position[plane.depth_axis];
                intensity[[row, col]] = if depth_range < DEGENERATE_EPS {
                    0.5
                } else {
                    ((depth - depth_lo) / depth_range) as f32
                };
            }
        }
    }

    Ok(ProjectionMap {
        width,
        height,
        plane,
        convention: config.depth_convention,
        intensity,
        cells,
        winners,
        occupied,
    })
}
