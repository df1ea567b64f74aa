//! Partitioned approximate materialized-KNN preprocessor.
//!
//! Splits the identifier set round-robin into `P` partitions and computes
//! neighbor lists only within each partition, cutting the quadratic build
//! cost to O(n²/P). The approximation: neighbors outside a record's own
//! partition are never seen.
//!
//! Within a partition every distance is computed once. The first lookup of a
//! pair caches the value keyed by the unordered pair; the mirror lookup
//! consumes it. Every pair is looked up from both sides exactly once, so the
//! cache is empty when a partition finishes — a violation is counted in
//! [`PreprocessStats::cache_residue`] and logged.

use crate::database::Database;
use crate::distance::{DistanceFunction, DistanceValue};
use crate::error::{LocusError, Result};
use crate::heap::KnnHeap;
use crate::ids::ObjectId;
use crate::index::{Index, KnnIndex};
use crate::preprocess::materialized::MaterializedStore;
use crate::preprocess::{MeanVariance, PartitionedKnnConfig, PreprocessStats};
use crate::query::{KnnSearch, QueryHint};
use std::collections::HashMap;
use tracing::{info, warn};

/// Split identifiers round-robin: element `i` goes to partition `i mod P`.
///
/// The first `n mod P` partitions hold `⌈n/P⌉` identifiers, the rest
/// `⌊n/P⌋`; together they cover the input exactly once.
#[must_use]
pub fn partition_round_robin(ids: &[ObjectId], partitions: usize) -> Vec<Vec<ObjectId>> {
    let mut parts: Vec<Vec<ObjectId>> = vec![Vec::new(); partitions];
    for (i, &id) in ids.iter().enumerate() {
        parts[i % partitions].push(id);
    }
    parts
}

/// Approximate materialized-KNN index over round-robin partitions.
pub struct PartitionedKnn<D: DistanceValue> {
    store: MaterializedStore<D>,
    stats: PreprocessStats,
}

impl<D: DistanceValue> PartitionedKnn<D> {
    /// Materialize within-partition neighbor lists for every record.
    pub fn build<O>(
        database: &Database<O, D>,
        distance: &dyn DistanceFunction<O, Value = D>,
        config: PartitionedKnnConfig,
    ) -> Result<Self> {
        config.validate()?;
        let ids = database.ids();
        let parts = partition_round_robin(&ids, config.partitions);

        let mut store = MaterializedStore::new(config.k, distance.name());
        let mut sizes = MeanVariance::default();
        let mut residue = 0usize;
        let mut cache: HashMap<(ObjectId, ObjectId), D> = HashMap::new();

        for part in &parts {
            for &a in part {
                let record = database.get(a)?;
                let mut heap = KnnHeap::new(config.k)?;
                for &b in part {
                    // Self distances are computed directly; an unordered
                    // self-pair key would be its own mirror and could never
                    // drain from the cache.
                    let d = if a == b {
                        distance.distance(record, record)?
                    } else {
                        let key = if a < b { (a, b) } else { (b, a) };
                        match cache.remove(&key) {
                            Some(d) => d,
                            None => {
                                let d = distance.distance(record, database.get(b)?)?;
                                cache.insert(key, d);
                                d
                            }
                        }
                    };
                    heap.insert(d, b);
                }
                let list = heap.into_sorted();
                sizes.put(list.len() as f64);
                store.lists.insert(a, list);
            }
            if !cache.is_empty() {
                residue += cache.len();
                warn!(
                    residue = cache.len(),
                    "distance cache not drained after partition"
                );
                cache.clear();
            }
        }

        let stats = PreprocessStats {
            entries: store.lists.len(),
            mean_list_size: sizes.mean(),
            stddev_list_size: sizes.stddev(),
            cache_residue: residue,
        };
        info!(
            entries = stats.entries,
            partitions = config.partitions,
            mean_list_size = stats.mean_list_size,
            stddev_list_size = stats.stddev_list_size,
            "materialized partitioned KNN lists"
        );
        Ok(Self { store, stats })
    }

    /// Statistics collected while building.
    #[must_use]
    pub fn stats(&self) -> &PreprocessStats {
        &self.stats
    }

    /// Number of materialized lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.lists.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.lists.is_empty()
    }
}

impl<O, D: DistanceValue> Index<O, D> for PartitionedKnn<D> {
    fn name(&self) -> &str {
        "partitioned-knn"
    }

    fn insert(&mut self, _batch: &[(ObjectId, &O)]) -> Result<()> {
        Err(LocusError::UnsupportedOperation(
            "partitioned KNN cache is static; rebuild after inserts".to_string(),
        ))
    }

    fn delete(&mut self, _batch: &[(ObjectId, &O)]) -> Result<()> {
        Err(LocusError::UnsupportedOperation(
            "partitioned KNN cache is static; rebuild after deletes".to_string(),
        ))
    }

    fn as_knn(&self) -> Option<&dyn KnnIndex<O, D>> {
        Some(self)
    }
}

impl<O, D: DistanceValue> KnnIndex<O, D> for PartitionedKnn<D> {
    fn knn_search<'a>(
        &'a self,
        _database: &'a Database<O, D>,
        distance: &'a dyn DistanceFunction<O, Value = D>,
        _hints: &[QueryHint],
    ) -> Option<Box<dyn KnnSearch<O, D> + 'a>> {
        if distance.name() != self.store.distance_name {
            return None;
        }
        Some(Box::new(super::materialized::PreprocessorKnnSearch::new(
            &self.store,
        )))
    }
}
