//! Pluggable index structures.
//!
//! An index is built over the identifier-to-record mapping and must be kept
//! in sync with every insert and delete — or answer those calls with
//! [`crate::LocusError::UnsupportedOperation`] to declare itself static
//! after construction.
//!
//! Capabilities are separate traits: an index advertises KNN, range or
//! reverse-KNN acceleration by returning itself from the matching `as_*`
//! accessor, and is then asked for a concrete search object per request.
//! Returning `None` from the search constructor declines the request (wrong
//! distance function, unsupported hints) without failing resolution.

use crate::database::Database;
use crate::distance::{DistanceFunction, DistanceValue};
use crate::error::Result;
use crate::ids::ObjectId;
use crate::query::{KnnSearch, QueryHint, RangeSearch, RknnSearch};

/// Page access counters for indexes backed by paged storage.
///
/// Purely informational; in-memory indexes simply report nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageAccesses {
    pub physical_reads: u64,
    pub physical_writes: u64,
    pub logical_accesses: u64,
}

/// A structure maintained alongside the object store.
pub trait Index<O, D: DistanceValue> {
    /// Short name for logs and statistics output.
    fn name(&self) -> &str;

    /// Incorporate newly inserted records. Called once per mutation with
    /// the whole batch, before any listener is notified.
    fn insert(&mut self, batch: &[(ObjectId, &O)]) -> Result<()>;

    /// Remove deleted records.
    fn delete(&mut self, batch: &[(ObjectId, &O)]) -> Result<()>;

    /// Physical I/O statistics, if this index tracks any.
    fn page_accesses(&self) -> Option<PageAccesses> {
        None
    }

    /// KNN capability, if supported.
    fn as_knn(&self) -> Option<&dyn KnnIndex<O, D>> {
        None
    }

    /// Range capability, if supported.
    fn as_range(&self) -> Option<&dyn RangeIndex<O, D>> {
        None
    }

    /// Reverse-KNN capability, if supported.
    fn as_rknn(&self) -> Option<&dyn RknnIndex<O, D>> {
        None
    }
}

/// KNN acceleration.
pub trait KnnIndex<O, D: DistanceValue> {
    /// Construct an accelerated KNN search for the given distance function,
    /// or decline with `None`.
    fn knn_search<'a>(
        &'a self,
        database: &'a Database<O, D>,
        distance: &'a dyn DistanceFunction<O, Value = D>,
        hints: &[QueryHint],
    ) -> Option<Box<dyn KnnSearch<O, D> + 'a>>;
}

/// Range acceleration.
pub trait RangeIndex<O, D: DistanceValue> {
    fn range_search<'a>(
        &'a self,
        database: &'a Database<O, D>,
        distance: &'a dyn DistanceFunction<O, Value = D>,
        hints: &[QueryHint],
    ) -> Option<Box<dyn RangeSearch<O, D> + 'a>>;
}

/// Reverse-KNN acceleration.
pub trait RknnIndex<O, D: DistanceValue> {
    fn rknn_search<'a>(
        &'a self,
        database: &'a Database<O, D>,
        distance: &'a dyn DistanceFunction<O, Value = D>,
        hints: &[QueryHint],
    ) -> Option<Box<dyn RknnSearch<O, D> + 'a>>;
}
