//! Linear-scan baseline query engines.
//!
//! Always correct, used whenever no registered index accelerates a request.
//! KNN is O(n log k) via the bounded heap; range is a filtered scan; the
//! reverse-KNN baseline bulk-computes each candidate's own neighbor list and
//! is O(n·k).

use crate::database::Database;
use crate::distance::{DistanceFunction, DistanceValue};
use crate::error::{LocusError, Result};
use crate::heap::{KnnHeap, Neighbor};
use crate::ids::ObjectId;
use crate::query::{KnnSearch, QueryHint, RangeSearch, RknnSearch};
use std::cmp::Ordering;

/// Linear-scan k-nearest-neighbor search.
pub struct LinearScanKnn<'a, O, D: DistanceValue> {
    database: &'a Database<O, D>,
    distance: &'a dyn DistanceFunction<O, Value = D>,
}

impl<'a, O, D: DistanceValue> LinearScanKnn<'a, O, D> {
    pub fn new(
        database: &'a Database<O, D>,
        distance: &'a dyn DistanceFunction<O, Value = D>,
    ) -> Self {
        Self { database, distance }
    }
}

impl<O, D: DistanceValue> KnnSearch<O, D> for LinearScanKnn<'_, O, D> {
    fn knn_by_id(&self, id: ObjectId, k: usize) -> Result<Vec<Neighbor<D>>> {
        self.knn_by_object(self.database.get(id)?, k)
    }

    fn knn_by_object(&self, query: &O, k: usize) -> Result<Vec<Neighbor<D>>> {
        let mut heap = KnnHeap::new(k)?;
        for (id, record) in self.database.iter() {
            let d = self.distance.distance(query, record)?;
            heap.insert(d, id);
        }
        Ok(heap.into_sorted())
    }
}

/// Linear-scan range (epsilon-neighborhood) search.
pub struct LinearScanRange<'a, O, D: DistanceValue> {
    database: &'a Database<O, D>,
    distance: &'a dyn DistanceFunction<O, Value = D>,
}

impl<'a, O, D: DistanceValue> LinearScanRange<'a, O, D> {
    pub fn new(
        database: &'a Database<O, D>,
        distance: &'a dyn DistanceFunction<O, Value = D>,
    ) -> Self {
        Self { database, distance }
    }
}

impl<O, D: DistanceValue> RangeSearch<O, D> for LinearScanRange<'_, O, D> {
    fn range_by_id(&self, id: ObjectId, radius: D) -> Result<Vec<Neighbor<D>>> {
        self.range_by_object(self.database.get(id)?, radius)
    }

    fn range_by_object(&self, query: &O, radius: D) -> Result<Vec<Neighbor<D>>> {
        let mut result = Vec::new();
        for (id, record) in self.database.iter() {
            let d = self.distance.distance(query, record)?;
            if d.total_cmp(&radius) != Ordering::Greater {
                result.push(Neighbor::new(d, id));
            }
        }
        result.sort_unstable();
        Ok(result)
    }
}

/// Linear-scan reverse-k-nearest-neighbor search.
///
/// Candidate neighbor lists are obtained through whatever KNN search the
/// database resolves, so a materialized cache accelerates this baseline too.
pub struct LinearScanRknn<'a, O, D: DistanceValue> {
    database: &'a Database<O, D>,
    distance: &'a dyn DistanceFunction<O, Value = D>,
    max_k: Option<usize>,
}

impl<'a, O, D: DistanceValue> LinearScanRknn<'a, O, D> {
    pub fn new(
        database: &'a Database<O, D>,
        distance: &'a dyn DistanceFunction<O, Value = D>,
        max_k: Option<usize>,
    ) -> Self {
        Self {
            database,
            distance,
            max_k,
        }
    }

    fn check_k(&self, k: usize) -> Result<()> {
        if k == 0 {
            return Err(LocusError::InvalidArgument(
                "neighbor count k must be positive".to_string(),
            ));
        }
        if let Some(max_k) = self.max_k {
            if k > max_k {
                return Err(LocusError::InvalidArgument(format!(
                    "k = {k} exceeds the declared maximum {max_k}"
                )));
            }
        }
        Ok(())
    }
}

impl<O, D: DistanceValue> RknnSearch<O, D> for LinearScanRknn<'_, O, D> {
    fn rknn_by_id(&self, id: ObjectId, k: usize) -> Result<Vec<Neighbor<D>>> {
        self.rknn_by_object(self.database.get(id)?, k)
    }

    fn rknn_by_object(&self, query: &O, k: usize) -> Result<Vec<Neighbor<D>>> {
        self.check_k(k)?;
        let knn = self
            .database
            .knn_query(self.distance, &[QueryHint::Bulk])
            .ok_or_else(|| {
                LocusError::Configuration("no KNN implementation available".to_string())
            })?;

        let all = self.database.ids();
        let lists = knn.knn_bulk(&all, k)?;

        let mut result = Vec::new();
        for (&candidate, list) in all.iter().zip(&lists) {
            let d = self.distance.distance(query, self.database.get(candidate)?)?;
            // A candidate qualifies when its own list is still short of k
            // entries, or the query is no farther than its k-th neighbor.
            // The short-list boundary intentionally uses the last available
            // entry, matching the long-standing baseline behavior.
            let qualifies = match list.len() {
                0 => true,
                len => {
                    let last = usize::min(k - 1, len - 1);
                    last < k - 1 || d.total_cmp(&list[last].distance) != Ordering::Greater
                }
            };
            if qualifies {
                result.push(Neighbor::new(d, candidate));
            }
        }
        result.sort_unstable();
        Ok(result)
    }
}
