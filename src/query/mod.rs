//! Query interfaces and resolution hints.
//!
//! Each query kind is a small capability trait; the database resolves a
//! request to the best accelerated implementation a registered index offers,
//! or to the always-correct linear-scan baseline in [`linear`].
//!
//! All result lists are sorted ascending by distance with ties broken by
//! identifier, regardless of which implementation produced them.

pub mod linear;

use crate::distance::DistanceValue;
use crate::error::Result;
use crate::heap::Neighbor;
use crate::ids::ObjectId;

/// Out-of-band request modifier guiding query resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryHint {
    /// Only an accelerated implementation is acceptable; the resolver must
    /// not fall back to a linear scan.
    OptimizedOnly,
    /// The caller will issue bulk requests; prefer bulk-capable paths.
    Bulk,
    /// Upper bound on the `k` that will be requested (reverse-KNN only).
    MaxK(usize),
}

/// k-nearest-neighbor search.
pub trait KnnSearch<O, D: DistanceValue> {
    /// The k nearest neighbors of a stored record, sorted ascending.
    fn knn_by_id(&self, id: ObjectId, k: usize) -> Result<Vec<Neighbor<D>>>;

    /// The k nearest neighbors of an ad-hoc record.
    fn knn_by_object(&self, query: &O, k: usize) -> Result<Vec<Neighbor<D>>>;

    /// Neighbor lists for several stored records at once.
    fn knn_bulk(&self, ids: &[ObjectId], k: usize) -> Result<Vec<Vec<Neighbor<D>>>> {
        ids.iter().map(|&id| self.knn_by_id(id, k)).collect()
    }
}

/// Range (epsilon-neighborhood) search.
pub trait RangeSearch<O, D: DistanceValue> {
    /// All records within `radius` of a stored record, sorted ascending.
    fn range_by_id(&self, id: ObjectId, radius: D) -> Result<Vec<Neighbor<D>>>;

    /// All records within `radius` of an ad-hoc record.
    fn range_by_object(&self, query: &O, radius: D) -> Result<Vec<Neighbor<D>>>;
}

/// Reverse-k-nearest-neighbor search.
///
/// A record `o` is a reverse-k-NN of the query `q` iff `q` is among `o`'s
/// own k nearest neighbors.
pub trait RknnSearch<O, D: DistanceValue> {
    fn rknn_by_id(&self, id: ObjectId, k: usize) -> Result<Vec<Neighbor<D>>>;

    fn rknn_by_object(&self, query: &O, k: usize) -> Result<Vec<Neighbor<D>>>;

    fn rknn_bulk(&self, ids: &[ObjectId], k: usize) -> Result<Vec<Vec<Neighbor<D>>>> {
        ids.iter().map(|&id| self.rknn_by_id(id, k)).collect()
    }
}
