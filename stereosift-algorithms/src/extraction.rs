//! 2D feature detection and 3D lift-back
//!
//! Runs the detector over a projection raster and resolves every 2D
//! detection back to a 3D position through the projection's index table.
//! Individual detections that cannot be resolved are dropped and logged;
//! losing single features is acceptable, losing the whole cloud is not.

use crate::projection::ProjectionMap;
use crate::sift;
use log::{debug, warn};
use stereosift_core::{
    ColoredPointCloud3d, Error, FeatureSet, Keypoint3d, PipelineConfig, Result,
};

/// Non-fatal degeneracies observed during extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegeneracyWarning {
    /// The raster contained no occupied cells at all
    EmptyRaster,
    /// Keypoints were detected but every one failed lift-back
    AllKeypointsDropped,
}

/// Outcome of feature extraction over one cloud
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub features: FeatureSet,
    pub degeneracy: Option<DegeneracyWarning>,
    /// Detections dropped because no occupied cell was found nearby
    pub dropped: usize,
}

/// Extract a feature set from a projected cloud.
///
/// Keypoints and descriptors stay index-aligned and keep the detector's
/// output order (minus dropped detections). A degenerate raster produces
/// an empty set plus a warning marker rather than an error; the caller
/// decides whether zero features is acceptable.
pub fn extract_features(
    map: &ProjectionMap,
    cloud: &ColoredPointCloud3d,
    config: &PipelineConfig,
) -> Result<ExtractionReport> {
    // the index table must refer into this cloud
    if let Some(max_idx) = max_recorded_index(map) {
        if max_idx >= cloud.len() {
            return Err(Error::InvalidCloud(format!(
                "projection references point {} but the cloud has {} points",
                max_idx,
                cloud.len()
            )));
        }
    }

    if map.occupied_cells() == 0 {
        warn!("raster has no occupied cells; returning an empty feature set");
        return Ok(ExtractionReport {
            features: FeatureSet::new(),
            degeneracy: Some(DegeneracyWarning::EmptyRaster),
            dropped: 0,
        });
    }

    let detections = sift::detect_and_describe(map.intensity(), &config.sift);

    let mut features = FeatureSet::with_capacity(detections.len());
    let mut dropped = 0;
    for detection in &detections {
        match lift_keypoint(map, detection.x, detection.y, config.lift_radius) {
            Some(index) => {
                features.push(
                    Keypoint3d {
                        position: cloud[index].position,
                        scale: detection.scale,
                        orientation: detection.orientation,
                        response: detection.response,
                    },
                    detection.descriptor,
                );
            }
            None => {
                dropped += 1;
                debug!(
                    "dropped keypoint at ({:.1}, {:.1}): no occupied cell within {} rings",
                    detection.x, detection.y, config.lift_radius
                );
            }
        }
    }

    let degeneracy = if !detections.is_empty() && features.is_empty() {
        warn!(
            "all {} detections failed lift-back; returning an empty feature set",
            detections.len()
        );
        Some(DegeneracyWarning::AllKeypointsDropped)
    } else {
        None
    };

    let features = match config.max_features {
        Some(max_count) => limit_feature_count(features, max_count),
        None => features,
    };

    Ok(ExtractionReport {
        features,
        degeneracy,
        dropped,
    })
}

/// Resolve a sub-pixel detection to a contributing point index.
///
/// The detection rounds to its nearest cell; an occupied cell resolves to
/// that cell's depth winner. Otherwise square rings around the cell are
/// probed outward (ring 1 is the 8-neighborhood) up to `lift_radius`,
/// picking the occupied cell whose center is nearest to the detection;
/// distance ties keep the first cell in row-major scan order.
fn lift_keypoint(map: &ProjectionMap, x: f32, y: f32, lift_radius: usize) -> Option<usize> {
    let width = map.width() as isize;
    let height = map.height() as isize;
    let col0 = (x.round() as isize).clamp(0, width - 1);
    let row0 = (y.round() as isize).clamp(0, height - 1);

    if let Some(winner) = map.winner(row0 as usize, col0 as usize) {
        return Some(winner);
    }

    for ring in 1..=lift_radius as isize {
        let mut best: Option<(f32, usize)> = None;
        for dr in -ring..=ring {
            for dc in -ring..=ring {
                if dr.abs() != ring && dc.abs() != ring {
                    continue;
                }
                let row = row0 + dr;
                let col = col0 + dc;
                if row < 0 || col < 0 || row >= height || col >= width {
                    continue;
                }
                if let Some(winner) = map.winner(row as usize, col as usize) {
                    let ddx = x - col as f32;
                    let ddy = y - row as f32;
                    let dist_sq = ddx * ddx + ddy * ddy;
                    if best.map_or(true, |(best_dist, _)| dist_sq < best_dist) {
                        best = Some((dist_sq, winner));
                    }
                }
            }
        }
        if let Some((_, winner)) = best {
            return Some(winner);
        }
    }
    None
}

/// Drop features whose quality score falls at or below `quality_threshold`.
///
/// The score is the descriptor norm relative to the strongest descriptor
/// in the set, so it lies in `(0, 1]`; a threshold of 0.0 keeps
/// everything. Survivors keep their original relative order.
pub fn filter_features_by_quality(features: FeatureSet, quality_threshold: f32) -> FeatureSet {
    if features.is_empty() {
        return features;
    }

    let norms: Vec<f32> = features.descriptors.iter().map(|d| d.norm()).collect();
    let max_norm = norms.iter().cloned().fold(0.0f32, f32::max).max(f32::EPSILON);

    let mut filtered = FeatureSet::with_capacity(features.len());
    for (idx, norm) in norms.iter().enumerate() {
        if norm / max_norm > quality_threshold {
            filtered.push(features.keypoints[idx], features.descriptors[idx]);
        }
    }
    filtered
}

/// Keep the `max_count` strongest features, scored by descriptor norm.
/// The survivors keep their original relative order.
pub fn limit_feature_count(features: FeatureSet, max_count: usize) -> FeatureSet {
    if features.len() <= max_count {
        return features;
    }

    let norms: Vec<f32> = features.descriptors.iter().map(|d| d.norm()).collect();
    let mut order: Vec<usize> = (0..features.len()).collect();
    order.sort_by(|&a, &b| {
        norms[b]
            .partial_cmp(&norms[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    order.truncate(max_count);
    order.sort_unstable();

    let mut limited = FeatureSet::with_capacity(max_count);
    for idx in order {
        limited.push(features.keypoints[idx], features.descriptors[idx]);
    }
    limited
}

fn max_recorded_index(map: &ProjectionMap) -> Option<usize> {
    let mut max_idx = None;
    for row in 0..map.height() {
        for col in 0..map.width() {
            for &idx in map.cell_indices(row, col) {
                let idx = idx as usize;
                if max_idx.map_or(true, |m| idx > m) {
                    max_idx = Some(idx);
                }
            }
        }
    }
    max_idx
}
