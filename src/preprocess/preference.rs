//! Preference-vector preprocessor.
//!
//! For every record, inspects its k nearest neighbors and flags each
//! dimension whose neighbor coordinates vary little around the record's own
//! coordinate. The resulting per-record bit-vector marks locally
//! low-variance ("preferred") axes for subspace-aware consumers.
//!
//! Neighbor lists come from whatever KNN search the database resolves, so a
//! registered materialized cache accelerates this build transparently.

use crate::data::NumberVector;
use crate::database::Database;
use crate::distance::{DistanceFunction, DistanceValue};
use crate::error::{LocusError, Result};
use crate::ids::ObjectId;
use crate::index::Index;
use crate::preprocess::PreferenceVectorConfig;
use crate::query::QueryHint;
use bitvec::vec::BitVec;
use std::collections::HashMap;
use tracing::info;

/// Per-record preference vectors, one bit per dimension.
pub struct PreferenceVectors {
    vectors: HashMap<ObjectId, BitVec>,
    dimensionality: usize,
}

impl PreferenceVectors {
    /// Compute a preference vector for every record in the database.
    ///
    /// An unset `k` defaults to three times the data dimensionality.
    pub fn build<O, D>(
        database: &Database<O, D>,
        distance: &dyn DistanceFunction<O, Value = D>,
        config: PreferenceVectorConfig,
    ) -> Result<Self>
    where
        O: NumberVector,
        D: DistanceValue,
    {
        config.validate()?;
        let dimensionality = database.dimensionality()?;
        let k = config.k.unwrap_or(3 * dimensionality);
        let knn = database
            .knn_query(distance, &[QueryHint::Bulk])
            .ok_or_else(|| {
                LocusError::Configuration("no KNN implementation available".to_string())
            })?;

        let mut vectors = HashMap::new();
        for id in database.ids() {
            let record = database.get(id)?;
            let neighbors = knn.knn_by_id(id, k)?;
            let mut bits = BitVec::repeat(false, dimensionality);
            if !neighbors.is_empty() {
                for dim in 0..dimensionality {
                    let center = record.coordinate(dim);
                    let mut sum_sq = 0.0;
                    for neighbor in &neighbors {
                        let delta = database.get(neighbor.id)?.coordinate(dim) - center;
                        sum_sq += delta * delta;
                    }
                    if sum_sq / (neighbors.len() as f64) < config.alpha {
                        bits.set(dim, true);
                    }
                }
            }
            vectors.insert(id, bits);
        }
        info!(
            entries = vectors.len(),
            dimensionality,
            k,
            alpha = config.alpha,
            "computed preference vectors"
        );
        Ok(Self {
            vectors,
            dimensionality,
        })
    }

    /// Preference vector for a record, if it existed at build time.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&BitVec> {
        self.vectors.get(&id)
    }

    /// Width of every stored vector.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    /// Number of stored vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl<O, D: DistanceValue> Index<O, D> for PreferenceVectors {
    fn name(&self) -> &str {
        "preference-vectors"
    }

    fn insert(&mut self, _batch: &[(ObjectId, &O)]) -> Result<()> {
        Err(LocusError::UnsupportedOperation(
            "preference vectors are static; rebuild after inserts".to_string(),
        ))
    }

    fn delete(&mut self, _batch: &[(ObjectId, &O)]) -> Result<()> {
        Err(LocusError::UnsupportedOperation(
            "preference vectors are static; rebuild after deletes".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataVector;
    use crate::distance::EuclideanDistance;

    #[test]
    fn test_flags_low_variance_dimension() {
        // Dimension 0 barely varies; dimension 1 spreads wide.
        let mut db: Database<DataVector> = Database::new();
        let items = [
            [0.00, 0.0],
            [0.01, 3.0],
            [0.02, 6.0],
            [0.00, 9.0],
            [0.01, 12.0],
        ]
        .iter()
        .map(|p| (DataVector::new(p.to_vec()), None))
        .collect();
        db.bulk_insert(items).unwrap();

        let prefs = PreferenceVectors::build(
            &db,
            &EuclideanDistance,
            PreferenceVectorConfig {
                k: Some(5),
                alpha: 0.01,
            },
        )
        .unwrap();

        assert_eq!(prefs.dimensionality(), 2);
        for id in db.ids() {
            let bits = prefs.get(id).unwrap();
            assert!(bits[0]);
            assert!(!bits[1]);
        }
    }

    #[test]
    fn test_empty_database_fails() {
        let db: Database<DataVector> = Database::new();
        assert!(PreferenceVectors::build(
            &db,
            &EuclideanDistance,
            PreferenceVectorConfig::default(),
        )
        .is_err());
    }

    #[test]
    fn test_unknown_id_has_no_vector() {
        let mut db: Database<DataVector> = Database::new();
        db.insert(DataVector::new(vec![1.0]), None).unwrap();
        let prefs =
            PreferenceVectors::build(&db, &EuclideanDistance, PreferenceVectorConfig::default())
                .unwrap();
        assert!(prefs.get(ObjectId::from_raw(42)).is_none());
    }
}
