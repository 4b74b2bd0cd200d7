//! Pipeline configuration
//!
//! All tuning is carried in explicit configuration values threaded into
//! each stage; no stage reads ambient or global state. Raster dimensions
//! and the depth convention must be identical for both clouds of a stereo
//! run so the resulting feature sets are comparable.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// How the isotropic normalization scale factor is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizationMode {
    /// Reciprocal of the largest absolute centered coordinate, mapping the
    /// cloud into `[-1, 1]` on every axis
    MaxAbs,
    /// Reciprocal of the RMS distance from the centroid
    RmsDistance,
}

impl Default for NormalizationMode {
    fn default() -> Self {
        NormalizationMode::MaxAbs
    }
}

/// Which point wins when several project into the same raster cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthConvention {
    /// Smallest depth coordinate wins (visible-surface / z-buffer policy)
    NearestWins,
    /// Largest depth coordinate wins
    FarthestWins,
}

impl Default for DepthConvention {
    fn default() -> Self {
        DepthConvention::NearestWins
    }
}

/// Tuning for the 2D detector/descriptor stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiftConfig {
    /// DoG layers searched per octave
    pub octave_layers: usize,
    /// Minimum absolute DoG contrast for a keypoint, on `[0, 1]` intensities
    pub contrast_threshold: f32,
    /// Maximum principal-curvature ratio before a keypoint is rejected as
    /// an edge response
    pub edge_threshold: f32,
    /// Blur level of the scale-space base image, in raster pixels
    pub sigma: f32,
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            octave_layers: 3,
            contrast_threshold: 0.04,
            edge_threshold: 10.0,
            sigma: 1.6,
        }
    }
}

/// Configuration for the full per-cloud pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum number of points a cloud must carry to be valid
    pub min_points: usize,
    /// Standard-deviation multiplier for outlier removal
    pub outlier_threshold: f64,
    pub normalization_mode: NormalizationMode,
    /// Raster width in cells
    pub raster_width: usize,
    /// Raster height in cells
    pub raster_height: usize,
    /// Extra window around the planar bounding box, as a fraction of the
    /// extent per side
    pub raster_margin: f64,
    pub depth_convention: DepthConvention,
    /// How many cell rings around a detection the lift-back probe searches
    /// before dropping the keypoint
    pub lift_radius: usize,
    /// Keep only the strongest N features when set
    pub max_features: Option<usize>,
    pub sift: SiftConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_points: 1,
            outlier_threshold: 2.0,
            normalization_mode: NormalizationMode::default(),
            raster_width: 256,
            raster_height: 256,
            raster_margin: 0.0,
            depth_convention: DepthConvention::default(),
            lift_radius: 2,
            max_features: None,
            sift: SiftConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reject configurations no stage could act on
    pub fn validate(&self) -> Result<()> {
        if self.raster_width == 0 || self.raster_height == 0 {
            return Err(Error::InvalidConfig(format!(
                "raster dimensions must be positive, got {}x{}",
                self.raster_width, self.raster_height
            )));
        }
        if !self.outlier_threshold.is_finite() || self.outlier_threshold <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "outlier threshold must be positive, got {}",
                self.outlier_threshold
            )));
        }
        if !self.raster_margin.is_finite() || self.raster_margin < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "raster margin must be non-negative, got {}",
                self.raster_margin
            )));
        }
        if self.sift.octave_layers == 0 {
            return Err(Error::InvalidConfig(
                "SIFT needs at least one octave layer".to_string(),
            ));
        }
        if self.sift.contrast_threshold <= 0.0 || self.sift.sigma <= 0.0 {
            return Err(Error::InvalidConfig(
                "SIFT contrast threshold and sigma must be positive".to_string(),
            ));
        }
        if self.sift.edge_threshold <= 1.0 {
            return Err(Error::InvalidConfig(format!(
                "SIFT edge threshold must exceed 1, got {}",
                self.sift.edge_threshold
            )));
        }
        Ok(())
    }

    pub fn with_raster_size(mut self, width: usize, height: usize) -> Self {
        self.raster_width = width;
        self.raster_height = height;
        self
    }

    pub fn with_outlier_threshold(mut self, threshold: f64) -> Self {
        self.outlier_threshold = threshold;
        self
    }

    pub fn with_normalization_mode(mut self, mode: NormalizationMode) -> Self {
        self.normalization_mode = mode;
        self
    }

    pub fn with_depth_convention(mut self, convention: DepthConvention) -> Self {
        self.depth_convention = convention;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_raster_rejected() {
        let config = PipelineConfig::default().with_raster_size(0, 256);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let config = PipelineConfig::default().with_outlier_threshold(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_chains() {
        let config = PipelineConfig::default()
            .with_raster_size(128, 64)
            .with_depth_convention(DepthConvention::FarthestWins)
            .with_max_features(500);
        assert_eq!(config.raster_width, 128);
        assert_eq!(config.raster_height, 64);
        assert_eq!(config.depth_convention, DepthConvention::FarthestWins);
        assert_eq!(config.max_features, Some(500));
    }
}
