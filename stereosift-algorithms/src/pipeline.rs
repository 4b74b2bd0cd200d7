//! Pipeline orchestration
//!
//! Sequences validate → normalize → filter → project → extract for one
//! cloud, and runs the two clouds of a stereo pair through fully
//! independent pipeline instances in parallel. There is no shared mutable
//! state between the two sides; the only coupling is the shared
//! configuration, which keeps their feature sets comparable.

use crate::extraction::{self, DegeneracyWarning};
use crate::filtering;
use crate::normalization::{self, NormalizationParams};
use crate::projection;
use crate::validation;
use log::info;
use std::fmt;
use stereosift_core::{ColoredPointCloud3d, Error, FeatureSet, PipelineConfig, Result};
use thiserror::Error as ThisError;

/// Which camera of the stereo pair a cloud came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraSide {
    Left,
    Right,
}

impl fmt::Display for CameraSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraSide::Left => write!(f, "left"),
            CameraSide::Right => write!(f, "right"),
        }
    }
}

/// Everything produced while processing one cloud
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub features: FeatureSet,
    /// Mapping from original to normalized coordinates, for callers that
    /// need to lift results back into the original frame
    pub params: NormalizationParams,
    /// The normalized, outlier-filtered cloud the features were extracted
    /// from
    pub filtered: ColoredPointCloud3d,
    pub input_points: usize,
    pub filtered_points: usize,
    pub dropped_keypoints: usize,
    pub degeneracy: Option<DegeneracyWarning>,
}

/// Run the full feature-extraction pipeline over one cloud.
///
/// Validation, normalization and filtering failures abort the run and
/// surface immediately. Extraction degeneracies do not: they yield an
/// empty feature set plus a warning marker in the report.
pub fn process_cloud(
    cloud: &ColoredPointCloud3d,
    config: &PipelineConfig,
) -> Result<PipelineReport> {
    config.validate()?;
    validation::validate(cloud, config.min_points)?;

    let (normalized, params) = normalization::normalize(cloud, config.normalization_mode);
    let filtered = filtering::filter_outliers(&normalized, config.outlier_threshold)?;
    info!(
        "retained {} of {} points after outlier filtering",
        filtered.len(),
        cloud.len()
    );

    let map = projection::project(&filtered, config)?;
    let report = extraction::extract_features(&map, &filtered, config)?;
    info!(
        "extracted {} keypoints ({} dropped in lift-back)",
        report.features.len(),
        report.dropped
    );

    Ok(PipelineReport {
        features: report.features,
        params,
        input_points: cloud.len(),
        filtered_points: filtered.len(),
        filtered,
        dropped_keypoints: report.dropped,
        degeneracy: report.degeneracy,
    })
}

/// A stage failure tagged with the camera it came from
#[derive(Debug, ThisError)]
#[error("{side} camera pipeline failed: {source}")]
pub struct StereoPipelineError {
    pub side: CameraSide,
    #[source]
    pub source: Error,
}

/// Reports for both sides of a stereo pair
#[derive(Debug, Clone)]
pub struct StereoReport {
    pub left: PipelineReport,
    pub right: PipelineReport,
}

/// Process both clouds of a stereo pair through independent pipelines.
///
/// The two runs share nothing mutable and execute in parallel. A failure
/// on one side does not disturb the other; the first failing side (left
/// checked first) is reported with its camera named.
pub fn process_stereo_pair(
    left: &ColoredPointCloud3d,
    right: &ColoredPointCloud3d,
    config: &PipelineConfig,
) -> std::result::Result<StereoReport, StereoPipelineError> {
    let (left_result, right_result) = rayon::join(
        || process_cloud(left, config),
        || process_cloud(right, config),
    );

    let left = left_result.map_err(|source| StereoPipelineError {
        side: CameraSide::Left,
        source,
    })?;
    let right = right_result.map_err(|source| StereoPipelineError {
        side: CameraSide::Right,
        source,
    })?;

    Ok(StereoReport { left, right })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereosift_core::{ColoredPoint3d, Point3d};

    fn wave_cloud(n: usize) -> ColoredPointCloud3d {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                let x = i as f64 * 0.05;
                let y = j as f64 * 0.05;
                let z = (x * 3.0).sin() * (y * 2.0).cos() * 0.3;
                points.push(ColoredPoint3d::new(Point3d::new(x, y, z), [0.5, 0.5, 0.5]));
            }
        }
        ColoredPointCloud3d::from_points(points)
    }

    #[test]
    fn test_process_cloud_reports_counts() {
        let cloud = wave_cloud(50);
        let config = PipelineConfig::default().with_raster_size(64, 64);
        let report = process_cloud(&cloud, &config).unwrap();
        assert_eq!(report.input_points, 2500);
        assert!(report.filtered_points <= report.input_points);
        assert!(report.filtered_points > 0);
        assert_eq!(report.filtered.len(), report.filtered_points);
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let cloud = wave_cloud(10);
        let config = PipelineConfig::default().with_raster_size(0, 0);
        assert!(matches!(
            process_cloud(&cloud, &config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_stereo_error_names_the_failing_side() {
        let good = wave_cloud(20);
        let empty = ColoredPointCloud3d::new();
        let config = PipelineConfig::default().with_raster_size(64, 64);

        let err = process_stereo_pair(&good, &empty, &config).unwrap_err();
        assert_eq!(err.side, CameraSide::Right);
        assert!(matches!(err.source, Error::InvalidCloud(_)));

        let err = process_stereo_pair(&empty, &good, &config).unwrap_err();
        assert_eq!(err.side, CameraSide::Left);
    }

    #[test]
    fn test_stereo_sides_are_independent() {
        let left = wave_cloud(30);
        let right = wave_cloud(40);
        let config = PipelineConfig::default().with_raster_size(64, 64);

        let stereo = process_stereo_pair(&left, &right, &config).unwrap();
        let alone = process_cloud(&left, &config).unwrap();
        // running the left cloud beside a different right cloud changes
        // nothing about its result
        assert_eq!(stereo.left.features, alone.features);
    }
}
