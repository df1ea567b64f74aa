//! Preprocessors: structures materialized over a static snapshot.
//!
//! Each preprocessor is built once from a database and a distance function,
//! then registered as an index. They declare themselves static: mutation
//! calls fail with [`crate::LocusError::UnsupportedOperation`], so callers
//! rebuild after changing the data.
//!
//! Configuration is explicit: plain structs with defaults and an up-front
//! `validate()`, checked before any work starts.

pub mod materialized;
pub mod partitioned;
pub mod preference;

use crate::error::{LocusError, Result};

/// Configuration for the exact materialized-KNN preprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterializeKnnConfig {
    /// Number of neighbors materialized per record.
    pub k: usize,
}

impl Default for MaterializeKnnConfig {
    fn default() -> Self {
        Self { k: 10 }
    }
}

impl MaterializeKnnConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(LocusError::InvalidArgument(
                "neighbor count k must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the partitioned approximate materialized-KNN
/// preprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionedKnnConfig {
    /// Number of neighbors materialized per record.
    pub k: usize,
    /// Number of round-robin partitions. Must exceed one; a single
    /// partition would be the exact preprocessor at full quadratic cost.
    pub partitions: usize,
}

impl Default for PartitionedKnnConfig {
    fn default() -> Self {
        Self {
            k: 10,
            partitions: 2,
        }
    }
}

impl PartitionedKnnConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(LocusError::InvalidArgument(
                "neighbor count k must be positive".to_string(),
            ));
        }
        if self.partitions <= 1 {
            return Err(LocusError::InvalidArgument(format!(
                "partition count must exceed 1, got {}",
                self.partitions
            )));
        }
        Ok(())
    }
}

/// Configuration for the preference-vector preprocessor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PreferenceVectorConfig {
    /// Neighbors consulted per record. Defaults to three times the data
    /// dimensionality when unset.
    pub k: Option<usize>,
    /// Variance threshold below which a dimension counts as preferred.
    /// Open interval (0, 1).
    pub alpha: f64,
}

impl Default for PreferenceVectorConfig {
    fn default() -> Self {
        Self {
            k: None,
            alpha: 0.01,
        }
    }
}

impl PreferenceVectorConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(k) = self.k {
            if k == 0 {
                return Err(LocusError::InvalidArgument(
                    "neighbor count k must be positive".to_string(),
                ));
            }
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(LocusError::InvalidArgument(format!(
                "alpha must lie in the open interval (0, 1), got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// Build statistics reported by the partitioned preprocessor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PreprocessStats {
    /// Number of materialized neighbor lists.
    pub entries: usize,
    /// Mean materialized list size.
    pub mean_list_size: f64,
    /// Population standard deviation of list sizes.
    pub stddev_list_size: f64,
    /// Entries left in the symmetric distance cache across all partitions.
    /// Zero when the cache-draining invariant held throughout the build.
    pub cache_residue: usize,
}

/// Streaming mean and variance (Welford).
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MeanVariance {
    n: u64,
    mean: f64,
    m2: f64,
}

impl MeanVariance {
    pub(crate) fn put(&mut self, value: f64) {
        self.n += 1;
        let delta = value - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub(crate) fn mean(&self) -> f64 {
        self.mean
    }

    pub(crate) fn stddev(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            (self.m2 / self.n as f64).sqrt()
        }
    }
}
