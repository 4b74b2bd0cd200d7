//! Binary persistence for extracted feature sets
//!
//! Feature sets round-trip exactly: `load_features(save_features(fs))`
//! returns the same keypoints and descriptors bit for bit.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use stereosift_core::{Error, FeatureSet, Result};

/// Save a feature set to a bincode-encoded file
pub fn save_features<P: AsRef<Path>>(features: &FeatureSet, path: P) -> Result<()> {
    if features.keypoints.len() != features.descriptors.len() {
        return Err(Error::Serialization(format!(
            "feature set has {} keypoints but {} descriptors",
            features.keypoints.len(),
            features.descriptors.len()
        )));
    }

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, features).map_err(|e| Error::Serialization(e.to_string()))
}

/// Load a previously saved feature set
pub fn load_features<P: AsRef<Path>>(path: P) -> Result<FeatureSet> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let features: FeatureSet =
        bincode::deserialize_from(reader).map_err(|e| Error::Serialization(e.to_string()))?;

    if features.keypoints.len() != features.descriptors.len() {
        return Err(Error::Serialization(format!(
            "feature file has {} keypoints but {} descriptors",
            features.keypoints.len(),
            features.descriptors.len()
        )));
    }

    Ok(features)
}
