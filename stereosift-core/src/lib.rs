//! Core data structures for stereosift
//!
//! This crate provides the fundamental types shared by the stereo
//! point-cloud pipeline: points, point clouds, feature sets, pipeline
//! configuration and error types.

pub mod point;
pub mod point_cloud;
pub mod features;
pub mod config;
pub mod error;
pub mod synthetic;

pub use point::*;
pub use point_cloud::*;
pub use features::*;
pub use config::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};
