//! Feature set artifacts produced by the extraction pipeline

use crate::point::Point3d;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// Length of a feature descriptor vector
pub const DESCRIPTOR_SIZE: usize = 128;

/// Fixed-length gradient-histogram descriptor.
///
/// Serialized as a plain sequence of floats; deserialization rejects any
/// other length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descriptor(pub [f32; DESCRIPTOR_SIZE]);

impl Descriptor {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean norm, used as a feature quality score
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|v| v * v).sum::<f32>().sqrt()
    }
}

impl Default for Descriptor {
    fn default() -> Self {
        Self([0.0; DESCRIPTOR_SIZE])
    }
}

impl From<[f32; DESCRIPTOR_SIZE]> for Descriptor {
    fn from(values: [f32; DESCRIPTOR_SIZE]) -> Self {
        Self(values)
    }
}

impl Deref for Descriptor {
    type Target = [f32; DESCRIPTOR_SIZE];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Descriptor {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Serialize for Descriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de> Deserialize<'de> for Descriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let values = Vec::<f32>::deserialize(deserializer)?;
        let len = values.len();
        let array: [f32; DESCRIPTOR_SIZE] = values
            .try_into()
            .map_err(|_| de::Error::invalid_length(len, &"a 128-element descriptor"))?;
        Ok(Self(array))
    }
}

/// A feature point lifted back into the 3D cloud.
///
/// The position is the 3D position of the contributing cloud point chosen
/// during lift-back; it need not coincide with the sub-pixel 2D detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint3d {
    pub position: Point3d,
    /// Detection scale (sigma) in raster pixels
    pub scale: f32,
    /// Dominant gradient orientation in radians
    pub orientation: f32,
    /// Detector response (absolute interpolated DoG contrast)
    pub response: f32,
}

/// Keypoints and their descriptors for one cloud.
///
/// `keypoints[i]` corresponds to `descriptors[i]`; the pair is immutable
/// once produced and is the terminal artifact handed to persistence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureSet {
    pub keypoints: Vec<Keypoint3d>,
    pub descriptors: Vec<Descriptor>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keypoints: Vec::with_capacity(capacity),
            descriptors: Vec::with_capacity(capacity),
        }
    }

    /// Append one keypoint/descriptor pair, keeping the arrays aligned
    pub fn push(&mut self, keypoint: Keypoint3d, descriptor: Descriptor) {
        self.keypoints.push(keypoint);
        self.descriptors.push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Keypoint3d, &Descriptor)> {
        self.keypoints.iter().zip(self.descriptors.iter())
    }
}
