//! Exact materialized-KNN preprocessor.
//!
//! Computes every record's neighbor list once, up front, through whatever
//! KNN search the database resolves, and serves cached lists afterwards.
//! The cache assumes a static dataset: inserts and deletes are refused.

use crate::database::Database;
use crate::distance::{DistanceFunction, DistanceValue};
use crate::error::{LocusError, Result};
use crate::heap::Neighbor;
use crate::ids::ObjectId;
use crate::index::{Index, KnnIndex};
use crate::preprocess::MaterializeKnnConfig;
use crate::query::{KnnSearch, QueryHint};
use std::cell::Cell;
use std::collections::HashMap;
use tracing::{info, warn};

/// Materialized neighbor lists keyed by identifier.
///
/// Shared between the exact and partitioned preprocessors; remembers the
/// distance function name and the `k` it was built for.
pub(crate) struct MaterializedStore<D: DistanceValue> {
    pub(crate) lists: HashMap<ObjectId, Vec<Neighbor<D>>>,
    pub(crate) k: usize,
    pub(crate) distance_name: String,
}

impl<D: DistanceValue> MaterializedStore<D> {
    pub(crate) fn new(k: usize, distance_name: &str) -> Self {
        Self {
            lists: HashMap::new(),
            k,
            distance_name: distance_name.to_string(),
        }
    }
}

/// Serves a materialized neighbor list per lookup.
///
/// A requested `k` different from the materialized one is logged once per
/// search object and the stale cached list is returned anyway. Lookups for
/// identifiers absent at preprocessing time fail; there is no fallback.
pub struct PreprocessorKnnSearch<'a, D: DistanceValue> {
    store: &'a MaterializedStore<D>,
    warned: Cell<bool>,
}

impl<'a, D: DistanceValue> PreprocessorKnnSearch<'a, D> {
    pub(crate) fn new(store: &'a MaterializedStore<D>) -> Self {
        Self {
            store,
            warned: Cell::new(false),
        }
    }
}

impl<O, D: DistanceValue> KnnSearch<O, D> for PreprocessorKnnSearch<'_, D> {
    fn knn_by_id(&self, id: ObjectId, k: usize) -> Result<Vec<Neighbor<D>>> {
        if k != self.store.k && !self.warned.get() {
            warn!(
                requested = k,
                materialized = self.store.k,
                "requested k differs from the materialized k; serving the cached list"
            );
            self.warned.set(true);
        }
        self.store
            .lists
            .get(&id)
            .cloned()
            .ok_or(LocusError::ObjectNotFound { id })
    }

    fn knn_by_object(&self, _query: &O, _k: usize) -> Result<Vec<Neighbor<D>>> {
        Err(LocusError::UnsupportedOperation(
            "materialized KNN answers identifier queries only".to_string(),
        ))
    }
}

/// Exact materialized-KNN index.
pub struct MaterializedKnn<D: DistanceValue> {
    store: MaterializedStore<D>,
}

impl<D: DistanceValue> MaterializedKnn<D> {
    /// Materialize all neighbor lists from the database's current content.
    pub fn build<O>(
        database: &Database<O, D>,
        distance: &dyn DistanceFunction<O, Value = D>,
        config: MaterializeKnnConfig,
    ) -> Result<Self> {
        config.validate()?;
        let knn = database
            .knn_query(distance, &[QueryHint::Bulk])
            .ok_or_else(|| {
                LocusError::Configuration("no KNN implementation available".to_string())
            })?;

        let mut store = MaterializedStore::new(config.k, distance.name());
        for id in database.ids() {
            let list = knn.knn_by_id(id, config.k)?;
            store.lists.insert(id, list);
        }
        info!(
            entries = store.lists.len(),
            k = config.k,
            distance = distance.name(),
            "materialized exact KNN lists"
        );
        Ok(Self { store })
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

impl<O, D: DistanceValue> Index<O, D> for MaterializedKnn<D> {
    fn name(&self) -> &str {
        "materialized-knn"
    }

    fn insert(&mut self, _batch: &[(ObjectId, &O)]) -> Result<()> {
        Err(LocusError::UnsupportedOperation(
            "materialized KNN cache is static; rebuild after inserts".to_string(),
        ))
    }

    fn delete(&mut self, _batch: &[(ObjectId, &O)]) -> Result<()> {
        Err(LocusError::UnsupportedOperation(
            "materialized KNN cache is static; rebuild after deletes".to_string(),
        ))
    }

    fn as_knn(&self) -> Option<&dyn KnnIndex<O, D>> {
        Some(self)
    }
}

impl<O, D: DistanceValue> KnnIndex<O, D> for MaterializedKnn<D> {
    fn knn_search<'a>(
        &'a self,
        _database: &'a Database<O, D>,
        distance: &'a dyn DistanceFunction<O, Value = D>,
        _hints: &[QueryHint],
    ) -> Option<Box<dyn KnnSearch<O, D> + 'a>> {
        if distance.name() != self.store.distance_name {
            return None;
        }
        Some(Box::new(PreprocessorKnnSearch::new(&self.store)))
    }
}
