//! The in-memory object database.
//!
//! Owns the identifier-to-record mapping, lazily created metadata columns,
//! the id allocator, the registered indexes, and the event manager. All
//! mutation and query operations run synchronously on the calling thread.
//!
//! # Mutation ordering
//!
//! Every insert/delete updates the store first, then each index in
//! registration order, then notifies listeners. Observers therefore never
//! see a mutation applied to only part of the system.
//!
//! # Query resolution
//!
//! Query factories scan registered indexes newest-first and return the first
//! accelerated search the request's distance function and hints allow. With
//! the [`QueryHint::OptimizedOnly`] hint and no qualifying index, resolution
//! yields `None` — the caller asked for acceleration or nothing. Otherwise
//! the linear-scan baseline is returned, so a correct answer always exists.

use crate::data::{ClassLabel, Metadata, NumberVector};
use crate::distance::{
    DistanceFunction, DistanceQueryBound, DistanceValue, SimilarityFunction, SimilarityQueryBound,
};
use crate::error::{LocusError, Result};
use crate::events::{DataStoreListener, EventManager, ListenerId};
use crate::ids::{IdAllocator, ObjectId};
use crate::index::Index;
use crate::query::linear::{LinearScanKnn, LinearScanRange, LinearScanRknn};
use crate::query::{KnnSearch, QueryHint, RangeSearch, RknnSearch};
use std::collections::{BTreeSet, HashMap};
use tracing::info;

/// In-memory object database with pluggable query acceleration.
///
/// Generic over the record type `O` and the ordered distance value type `D`
/// used by registered indexes and resolved queries.
pub struct Database<O, D: DistanceValue = f64> {
    content: HashMap<ObjectId, O>,
    ids: BTreeSet<ObjectId>,
    object_labels: Option<HashMap<ObjectId, String>>,
    class_labels: Option<HashMap<ObjectId, ClassLabel>>,
    external_ids: Option<HashMap<ObjectId, String>>,
    allocator: IdAllocator,
    indexes: Vec<Box<dyn Index<O, D>>>,
    events: EventManager,
}

impl<O, D: DistanceValue> Default for Database<O, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O, D: DistanceValue> Database<O, D> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            content: HashMap::new(),
            ids: BTreeSet::new(),
            object_labels: None,
            class_labels: None,
            external_ids: None,
            allocator: IdAllocator::new(),
            indexes: Vec::new(),
            events: EventManager::new(),
        }
    }

    /// Create a database with indexes registered at construction.
    #[must_use]
    pub fn with_indexes(indexes: Vec<Box<dyn Index<O, D>>>) -> Self {
        let mut db = Self::new();
        db.indexes = indexes;
        db
    }

    // ------------------------------------------------------------------
    // Object store and id lifecycle
    // ------------------------------------------------------------------

    /// Insert a record with a freshly allocated identifier.
    pub fn insert(&mut self, record: O, metadata: Option<Metadata>) -> Result<ObjectId> {
        let id = self.allocator.allocate()?;
        self.store_record(id, record, metadata);
        self.update_indexes_insert(&[id])?;
        self.events.objects_inserted(&[id]);
        Ok(id)
    }

    /// Insert a record under a caller-assigned identifier.
    ///
    /// Fails with [`LocusError::DuplicateIdentifier`] if the identifier is
    /// already live; the insertion is aborted.
    pub fn insert_with_id(
        &mut self,
        id: ObjectId,
        record: O,
        metadata: Option<Metadata>,
    ) -> Result<ObjectId> {
        if self.ids.contains(&id) {
            return Err(LocusError::DuplicateIdentifier { id });
        }
        self.allocator.reserve(id)?;
        self.store_record(id, record, metadata);
        self.update_indexes_insert(&[id])?;
        self.events.objects_inserted(&[id]);
        Ok(id)
    }

    /// Insert several records; output identifiers preserve input order.
    ///
    /// Equivalent to repeated [`Database::insert`], but indexes see one
    /// batched update and listeners one merged event.
    pub fn bulk_insert(&mut self, items: Vec<(O, Option<Metadata>)>) -> Result<Vec<ObjectId>> {
        let mut new_ids = Vec::with_capacity(items.len());
        for (record, metadata) in items {
            let id = self.allocator.allocate()?;
            self.store_record(id, record, metadata);
            new_ids.push(id);
        }
        self.update_indexes_insert(&new_ids)?;
        self.events.objects_inserted(&new_ids);
        Ok(new_ids)
    }

    /// Remove a record, returning it. Absence is reported as `Ok(None)`,
    /// keeping bulk deletion paths idempotent.
    pub fn delete(&mut self, id: ObjectId) -> Result<Option<O>> {
        let record = match self.remove_record(id) {
            Some(record) => record,
            None => return Ok(None),
        };
        let batch = [(id, &record)];
        for index in &mut self.indexes {
            index.delete(&batch)?;
        }
        self.events.objects_removed(&[id]);
        Ok(Some(record))
    }

    /// Remove several records in one batched index/event pass. Absent
    /// identifiers are skipped.
    pub fn delete_all(&mut self, ids: &[ObjectId]) -> Result<Vec<O>> {
        let mut removed_ids = Vec::new();
        let mut removed = Vec::new();
        for &id in ids {
            if let Some(record) = self.remove_record(id) {
                removed_ids.push(id);
                removed.push(record);
            }
        }
        let batch: Vec<(ObjectId, &O)> = removed_ids
            .iter()
            .copied()
            .zip(removed.iter())
            .collect();
        for index in &mut self.indexes {
            index.delete(&batch)?;
        }
        self.events.objects_removed(&removed_ids);
        Ok(removed)
    }

    /// Fetch a record by identifier.
    pub fn get(&self, id: ObjectId) -> Result<&O> {
        self.content
            .get(&id)
            .ok_or(LocusError::ObjectNotFound { id })
    }

    /// Number of live records.
    #[must_use]
    pub fn size(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Sorted snapshot of all live identifiers, isolated from later
    /// mutation of the database.
    #[must_use]
    pub fn ids(&self) -> Vec<ObjectId> {
        self.ids.iter().copied().collect()
    }

    /// Iterate over live (identifier, record) pairs in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &O)> {
        self.ids
            .iter()
            .filter_map(move |id| self.content.get(id).map(|record| (*id, record)))
    }

    /// Draw `k` distinct identifiers, deterministic for a given seed.
    pub fn random_sample(&self, k: usize, seed: u64) -> Result<Vec<ObjectId>> {
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        if k == 0 || k > self.size() {
            return Err(LocusError::InvalidArgument(format!(
                "sample size {k} not in 1..={}",
                self.size()
            )));
        }
        let ids = self.ids();
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut sample: Vec<ObjectId> = ids.choose_multiple(&mut rng, k).copied().collect();
        sample.sort_unstable();
        Ok(sample)
    }

    fn store_record(&mut self, id: ObjectId, record: O, metadata: Option<Metadata>) {
        self.content.insert(id, record);
        self.ids.insert(id);
        if let Some(meta) = metadata {
            if let Some(label) = meta.object_label {
                self.object_labels
                    .get_or_insert_with(HashMap::new)
                    .insert(id, label);
            }
            if let Some(label) = meta.class_label {
                self.class_labels
                    .get_or_insert_with(HashMap::new)
                    .insert(id, label);
            }
            if let Some(external) = meta.external_id {
                self.external_ids
                    .get_or_insert_with(HashMap::new)
                    .insert(id, external);
            }
        }
    }

    fn remove_record(&mut self, id: ObjectId) -> Option<O> {
        if !self.ids.remove(&id) {
            return None;
        }
        let record = self.content.remove(&id)?;
        if let Some(labels) = &mut self.object_labels {
            labels.remove(&id);
        }
        if let Some(labels) = &mut self.class_labels {
            labels.remove(&id);
        }
        if let Some(externals) = &mut self.external_ids {
            externals.remove(&id);
        }
        self.allocator.release(id);
        Some(record)
    }

    fn update_indexes_insert(&mut self, ids: &[ObjectId]) -> Result<()> {
        if self.indexes.is_empty() || ids.is_empty() {
            return Ok(());
        }
        let content = &self.content;
        let mut batch = Vec::with_capacity(ids.len());
        for &id in ids {
            let record = content.get(&id).ok_or(LocusError::ObjectNotFound { id })?;
            batch.push((id, record));
        }
        for index in &mut self.indexes {
            index.insert(&batch)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Metadata columns
    // ------------------------------------------------------------------

    #[must_use]
    pub fn object_label(&self, id: ObjectId) -> Option<&str> {
        self.object_labels
            .as_ref()
            .and_then(|labels| labels.get(&id))
            .map(String::as_str)
    }

    pub fn set_object_label(&mut self, id: ObjectId, label: impl Into<String>) -> Result<()> {
        self.check_live(id)?;
        self.object_labels
            .get_or_insert_with(HashMap::new)
            .insert(id, label.into());
        Ok(())
    }

    #[must_use]
    pub fn class_label(&self, id: ObjectId) -> Option<ClassLabel> {
        self.class_labels
            .as_ref()
            .and_then(|labels| labels.get(&id))
            .copied()
    }

    pub fn set_class_label(&mut self, id: ObjectId, label: ClassLabel) -> Result<()> {
        self.check_live(id)?;
        self.class_labels
            .get_or_insert_with(HashMap::new)
            .insert(id, label);
        Ok(())
    }

    #[must_use]
    pub fn external_id(&self, id: ObjectId) -> Option<&str> {
        self.external_ids
            .as_ref()
            .and_then(|externals| externals.get(&id))
            .map(String::as_str)
    }

    pub fn set_external_id(&mut self, id: ObjectId, external: impl Into<String>) -> Result<()> {
        self.check_live(id)?;
        self.external_ids
            .get_or_insert_with(HashMap::new)
            .insert(id, external.into());
        Ok(())
    }

    /// Assemble all metadata columns for an identifier.
    #[must_use]
    pub fn metadata(&self, id: ObjectId) -> Metadata {
        Metadata {
            object_label: self.object_label(id).map(str::to_owned),
            class_label: self.class_label(id),
            external_id: self.external_id(id).map(str::to_owned),
        }
    }

    fn check_live(&self, id: ObjectId) -> Result<()> {
        if self.ids.contains(&id) {
            Ok(())
        } else {
            Err(LocusError::ObjectNotFound { id })
        }
    }

    // ------------------------------------------------------------------
    // Index registry and query resolution
    // ------------------------------------------------------------------

    /// Register an index. Newer indexes win query resolution.
    pub fn add_index(&mut self, index: Box<dyn Index<O, D>>) {
        self.indexes.push(index);
    }

    /// Names of registered indexes, in registration order.
    #[must_use]
    pub fn index_names(&self) -> Vec<&str> {
        self.indexes.iter().map(|index| index.name()).collect()
    }

    /// Bind a distance function to this database.
    pub fn distance_query<'a, F>(&'a self, function: &'a F) -> DistanceQueryBound<'a, O, F>
    where
        F: DistanceFunction<O, Value = D>,
    {
        DistanceQueryBound::new(self, function)
    }

    /// Bind a similarity function to this database.
    pub fn similarity_query<'a, F>(&'a self, function: &'a F) -> SimilarityQueryBound<'a, O, F>
    where
        F: SimilarityFunction<O, Value = D>,
    {
        SimilarityQueryBound::new(self, function)
    }

    /// Resolve a KNN search for the given distance function and hints.
    ///
    /// Returns `None` only under [`QueryHint::OptimizedOnly`] when no
    /// registered index accelerates the request.
    pub fn knn_query<'a>(
        &'a self,
        distance: &'a dyn DistanceFunction<O, Value = D>,
        hints: &[QueryHint],
    ) -> Option<Box<dyn KnnSearch<O, D> + 'a>> {
        for index in self.indexes.iter().rev() {
            if let Some(knn) = index.as_knn() {
                if let Some(search) = knn.knn_search(self, distance, hints) {
                    return Some(search);
                }
            }
        }
        if hints.contains(&QueryHint::OptimizedOnly) {
            return None;
        }
        Some(Box::new(LinearScanKnn::new(self, distance)))
    }

    /// Resolve a range search for the given distance function and hints.
    pub fn range_query<'a>(
        &'a self,
        distance: &'a dyn DistanceFunction<O, Value = D>,
        hints: &[QueryHint],
    ) -> Option<Box<dyn RangeSearch<O, D> + 'a>> {
        for index in self.indexes.iter().rev() {
            if let Some(range) = index.as_range() {
                if let Some(search) = range.range_search(self, distance, hints) {
                    return Some(search);
                }
            }
        }
        if hints.contains(&QueryHint::OptimizedOnly) {
            return None;
        }
        Some(Box::new(LinearScanRange::new(self, distance)))
    }

    /// Resolve a reverse-KNN search. A [`QueryHint::MaxK`] hint caps the
    /// `k` accepted by the returned search.
    pub fn rknn_query<'a>(
        &'a self,
        distance: &'a dyn DistanceFunction<O, Value = D>,
        hints: &[QueryHint],
    ) -> Option<Box<dyn RknnSearch<O, D> + 'a>> {
        for index in self.indexes.iter().rev() {
            if let Some(rknn) = index.as_rknn() {
                if let Some(search) = rknn.rknn_search(self, distance, hints) {
                    return Some(search);
                }
            }
        }
        let mut max_k = None;
        for hint in hints {
            match hint {
                QueryHint::OptimizedOnly => return None,
                QueryHint::MaxK(k) => max_k = Some(*k),
                QueryHint::Bulk => {}
            }
        }
        Some(Box::new(LinearScanRknn::new(self, distance, max_k)))
    }

    /// Log page access statistics for indexes that track physical I/O.
    /// Safe to call with any mix of indexes; those without statistics are
    /// skipped.
    pub fn report_page_accesses(&self) {
        for index in &self.indexes {
            if let Some(stats) = index.page_accesses() {
                info!(
                    index = index.name(),
                    physical_reads = stats.physical_reads,
                    physical_writes = stats.physical_writes,
                    logical_accesses = stats.logical_accesses,
                    "page accesses"
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    pub fn add_listener(&mut self, listener: Box<dyn DataStoreListener>) -> ListenerId {
        self.events.add_listener(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    /// Begin buffering events for a bulk operation.
    pub fn accumulate_events(&mut self) {
        self.events.accumulate();
    }

    /// Deliver buffered events as one merged notification.
    pub fn flush_events(&mut self) {
        self.events.flush();
    }
}

impl<O: NumberVector, D: DistanceValue> Database<O, D> {
    /// Dimensionality of the stored records, taken from the first record.
    pub fn dimensionality(&self) -> Result<usize> {
        match self.iter().next() {
            Some((_, record)) => Ok(record.dimensionality()),
            None => Err(LocusError::UnsupportedOperation(
                "empty database has no dimensionality".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataVector;
    use crate::distance::EuclideanDistance;

    fn vector_db(points: &[&[f64]]) -> Database<DataVector> {
        let mut db = Database::new();
        let items = points
            .iter()
            .map(|p| (DataVector::new(p.to_vec()), None))
            .collect();
        db.bulk_insert(items).unwrap();
        db
    }

    #[test]
    fn test_insert_get_roundtrip() {
        let mut db: Database<DataVector> = Database::new();
        let id = db.insert(DataVector::new(vec![1.0, 2.0]), None).unwrap();
        assert_eq!(db.get(id).unwrap().values(), &[1.0, 2.0]);
        assert_eq!(db.size(), 1);
    }

    #[test]
    fn test_delete_then_get_fails() {
        let mut db: Database<DataVector> = Database::new();
        let id = db.insert(DataVector::new(vec![1.0]), None).unwrap();
        let removed = db.delete(id).unwrap();
        assert_eq!(removed.unwrap().values(), &[1.0]);
        assert!(matches!(
            db.get(id),
            Err(LocusError::ObjectNotFound { .. })
        ));
        // Idempotent second delete.
        assert!(db.delete(id).unwrap().is_none());
    }

    #[test]
    fn test_insert_with_id_duplicate_fails() {
        let mut db: Database<DataVector> = Database::new();
        let id = db.insert(DataVector::new(vec![1.0]), None).unwrap();
        assert!(matches!(
            db.insert_with_id(id, DataVector::new(vec![2.0]), None),
            Err(LocusError::DuplicateIdentifier { .. })
        ));
        // The failed insertion left the original record untouched.
        assert_eq!(db.get(id).unwrap().values(), &[1.0]);
    }

    #[test]
    fn test_ids_snapshot_isolated_from_mutation() {
        let mut db = vector_db(&[&[0.0], &[1.0], &[2.0]]);
        let snapshot = db.ids();
        db.delete(snapshot[0]).unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(db.size(), 2);
    }

    #[test]
    fn test_metadata_columns_lazy_and_sparse() {
        let mut db: Database<DataVector> = Database::new();
        let a = db.insert(DataVector::new(vec![0.0]), None).unwrap();
        let b = db
            .insert(
                DataVector::new(vec![1.0]),
                Some(Metadata {
                    object_label: Some("b".to_string()),
                    class_label: Some(ClassLabel(7)),
                    external_id: None,
                }),
            )
            .unwrap();

        assert_eq!(db.object_label(a), None);
        assert_eq!(db.object_label(b), Some("b"));
        assert_eq!(db.class_label(b), Some(ClassLabel(7)));
        assert!(db.metadata(a).is_empty());

        db.set_external_id(a, "ext-0").unwrap();
        assert_eq!(db.external_id(a), Some("ext-0"));
        assert!(matches!(
            db.set_object_label(ObjectId::from_raw(999), "x"),
            Err(LocusError::ObjectNotFound { .. })
        ));
    }

    #[test]
    fn test_bulk_insert_preserves_order() {
        let mut db: Database<DataVector> = Database::new();
        let ids = db
            .bulk_insert(vec![
                (DataVector::new(vec![0.0]), None),
                (DataVector::new(vec![1.0]), None),
                (DataVector::new(vec![2.0]), None),
            ])
            .unwrap();
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(db.get(*id).unwrap().values(), &[i as f64]);
        }
    }

    #[test]
    fn test_random_sample_deterministic() {
        let db = vector_db(&[&[0.0], &[1.0], &[2.0], &[3.0], &[4.0]]);
        let a = db.random_sample(3, 42).unwrap();
        let b = db.random_sample(3, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert!(db.random_sample(0, 1).is_err());
        assert!(db.random_sample(6, 1).is_err());
    }

    #[test]
    fn test_dimensionality() {
        let db = vector_db(&[&[0.0, 1.0, 2.0]]);
        assert_eq!(db.dimensionality().unwrap(), 3);
        let empty: Database<DataVector> = Database::new();
        assert!(empty.dimensionality().is_err());
    }

    #[test]
    fn test_optimized_only_without_index_yields_none() {
        let db = vector_db(&[&[0.0]]);
        assert!(db
            .knn_query(&EuclideanDistance, &[QueryHint::OptimizedOnly])
            .is_none());
        assert!(db
            .range_query(&EuclideanDistance, &[QueryHint::OptimizedOnly])
            .is_none());
        assert!(db
            .rknn_query(&EuclideanDistance, &[QueryHint::OptimizedOnly])
            .is_none());
    }
}
