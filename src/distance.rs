//! Distance and similarity functions.
//!
//! The engine treats distances as opaque ordered values: any type with a
//! total order and an "infinite" sentinel works as a distance. Functions are
//! injected by the caller; errors they raise propagate uncaught — the core
//! performs no retries and no silent recovery.
//!
//! Indexes accelerate queries only for the distance function they were built
//! with. Matching is by the function's stable [`DistanceFunction::name`],
//! which replaces runtime type inspection with an explicit contract.

use crate::data::NumberVector;
use crate::database::Database;
use crate::error::{LocusError, Result};
use crate::ids::ObjectId;
use std::cmp::Ordering;

/// An ordered distance (or similarity) value.
///
/// `INFINITE` is the maximal sentinel: an empty bounded heap reports it as
/// its threshold so that every real distance is accepted.
pub trait DistanceValue: Copy + PartialOrd + std::fmt::Debug {
    /// Maximal sentinel value.
    const INFINITE: Self;

    /// Total order, including values that `PartialOrd` cannot rank (NaN).
    fn total_cmp(&self, other: &Self) -> Ordering;
}

impl DistanceValue for f64 {
    const INFINITE: Self = f64::INFINITY;

    fn total_cmp(&self, other: &Self) -> Ordering {
        f64::total_cmp(self, other)
    }
}

impl DistanceValue for f32 {
    const INFINITE: Self = f32::INFINITY;

    fn total_cmp(&self, other: &Self) -> Ordering {
        f32::total_cmp(self, other)
    }
}

/// A distance function over records of type `O`.
pub trait DistanceFunction<O> {
    /// The ordered value type this function produces.
    type Value: DistanceValue;

    /// Stable identifier used to match accelerated indexes to requests.
    fn name(&self) -> &str;

    /// Distance between two records.
    fn distance(&self, a: &O, b: &O) -> Result<Self::Value>;
}

/// A similarity function over records of type `O`.
///
/// Larger values mean more similar; consumers order results themselves.
pub trait SimilarityFunction<O> {
    type Value: DistanceValue;

    fn name(&self) -> &str;

    /// Similarity between two records.
    fn similarity(&self, a: &O, b: &O) -> Result<Self::Value>;
}

fn check_dimensionality<V: NumberVector>(a: &V, b: &V) -> Result<usize> {
    let (da, db) = (a.dimensionality(), b.dimensionality());
    if da != db {
        return Err(LocusError::InvalidArgument(format!(
            "dimensionality mismatch: {da} vs {db}"
        )));
    }
    Ok(da)
}

/// Euclidean (L2) distance over vector records.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanDistance;

impl<O: NumberVector> DistanceFunction<O> for EuclideanDistance {
    type Value = f64;

    fn name(&self) -> &str {
        "euclidean"
    }

    fn distance(&self, a: &O, b: &O) -> Result<f64> {
        let dim = check_dimensionality(a, b)?;
        let mut sum = 0.0;
        for d in 0..dim {
            let diff = a.coordinate(d) - b.coordinate(d);
            sum += diff * diff;
        }
        Ok(sum.sqrt())
    }
}

/// Manhattan (L1) distance over vector records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManhattanDistance;

impl<O: NumberVector> DistanceFunction<O> for ManhattanDistance {
    type Value = f64;

    fn name(&self) -> &str {
        "manhattan"
    }

    fn distance(&self, a: &O, b: &O) -> Result<f64> {
        let dim = check_dimensionality(a, b)?;
        let mut sum = 0.0;
        for d in 0..dim {
            sum += (a.coordinate(d) - b.coordinate(d)).abs();
        }
        Ok(sum)
    }
}

/// Cosine similarity over vector records.
///
/// Zero-norm inputs yield similarity `0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineSimilarity;

impl<O: NumberVector> SimilarityFunction<O> for CosineSimilarity {
    type Value = f64;

    fn name(&self) -> &str {
        "cosine"
    }

    fn similarity(&self, a: &O, b: &O) -> Result<f64> {
        let dim = check_dimensionality(a, b)?;
        let (mut dot, mut na, mut nb) = (0.0, 0.0, 0.0);
        for d in 0..dim {
            let (x, y) = (a.coordinate(d), b.coordinate(d));
            dot += x * y;
            na += x * x;
            nb += y * y;
        }
        if na == 0.0 || nb == 0.0 {
            return Ok(0.0);
        }
        Ok(dot / (na.sqrt() * nb.sqrt()))
    }
}

/// A distance function bound to a database, resolving identifiers to records.
///
/// Pure: holds only non-owning references and never mutates the store.
pub struct DistanceQueryBound<'a, O, F: DistanceFunction<O>> {
    database: &'a Database<O, F::Value>,
    function: &'a F,
}

impl<'a, O, F: DistanceFunction<O>> DistanceQueryBound<'a, O, F> {
    pub(crate) fn new(database: &'a Database<O, F::Value>, function: &'a F) -> Self {
        Self { database, function }
    }

    /// Distance between two stored records.
    pub fn between_ids(&self, a: ObjectId, b: ObjectId) -> Result<F::Value> {
        self.function
            .distance(self.database.get(a)?, self.database.get(b)?)
    }

    /// Distance between an ad-hoc record and a stored record.
    pub fn to_id(&self, query: &O, id: ObjectId) -> Result<F::Value> {
        self.function.distance(query, self.database.get(id)?)
    }

    /// The underlying distance function.
    pub fn function(&self) -> &'a F {
        self.function
    }
}

/// A similarity function bound to a database.
pub struct SimilarityQueryBound<'a, O, F: SimilarityFunction<O>> {
    database: &'a Database<O, F::Value>,
    function: &'a F,
}

impl<'a, O, F: SimilarityFunction<O>> SimilarityQueryBound<'a, O, F> {
    pub(crate) fn new(database: &'a Database<O, F::Value>, function: &'a F) -> Self {
        Self { database, function }
    }

    /// Similarity between two stored records.
    pub fn between_ids(&self, a: ObjectId, b: ObjectId) -> Result<F::Value> {
        self.function
            .similarity(self.database.get(a)?, self.database.get(b)?)
    }

    /// Similarity between an ad-hoc record and a stored record.
    pub fn to_id(&self, query: &O, id: ObjectId) -> Result<F::Value> {
        self.function.similarity(query, self.database.get(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataVector;

    #[test]
    fn test_euclidean_basic() {
        let a = DataVector::new(vec![0.0, 0.0]);
        let b = DataVector::new(vec![3.0, 4.0]);
        let d = EuclideanDistance.distance(&a, &b).unwrap();
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_dimensionality_mismatch_is_invalid_argument() {
        let a = DataVector::new(vec![0.0, 0.0]);
        let b = DataVector::new(vec![1.0]);
        assert!(matches!(
            EuclideanDistance.distance(&a, &b),
            Err(LocusError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_cosine_identical_direction() {
        let a = DataVector::new(vec![1.0, 2.0]);
        let b = DataVector::new(vec![2.0, 4.0]);
        let s = CosineSimilarity.similarity(&a, &b).unwrap();
        assert!((s - 1.0).abs() < 1e-12);
    }
}
