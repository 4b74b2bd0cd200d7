//! Error types for stereosift

use thiserror::Error;

/// Main error type for stereosift operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structural validation failure; processing of the offending cloud
    /// aborts. The message names the violated check.
    #[error("invalid point cloud: {0}")]
    InvalidCloud(String),

    /// The outlier threshold removed every point. Recoverable by retrying
    /// with a looser threshold.
    #[error("outlier threshold {threshold} removed all {total} points")]
    AllPointsFiltered { threshold: f64, total: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for stereosift operations
pub type Result<T> = std::result::Result<T, Error>;
