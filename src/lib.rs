//! # locus
//!
//! An in-memory object database for distance-based workloads. Records get
//! stable, reusable identifiers and optional metadata; nearest-neighbor,
//! range and reverse-nearest-neighbor queries resolve against pluggable
//! acceleration structures with an always-correct linear-scan fallback.
//!
//! ## Design
//!
//! - **Identity first.** Every record is addressed by an [`ObjectId`]
//!   allocated by the store. Freed ids are reused, never while live.
//! - **Capability-based resolution.** Indexes advertise the query kinds
//!   they accelerate; the [`Database`] picks the newest qualifying index
//!   per request, falling back to a linear scan unless the caller forbids
//!   it with [`QueryHint::OptimizedOnly`].
//! - **Opaque distances.** The engine only compares distance values; any
//!   [`DistanceValue`] type works. Distance functions are injected and
//!   matched to indexes by stable name.
//! - **Synchronous and single-threaded.** Mutations take `&mut self`,
//!   queries `&self`; listeners and indexes observe every mutation as an
//!   atomic whole.
//!
//! ## Example
//!
//! ```
//! use locus::{Database, DataVector, EuclideanDistance};
//!
//! # fn main() -> locus::Result<()> {
//! let mut db: Database<DataVector> = Database::new();
//! db.insert(DataVector::new(vec![0.0, 0.0]), None)?;
//! db.insert(DataVector::new(vec![1.0, 0.0]), None)?;
//! let target = db.insert(DataVector::new(vec![5.0, 5.0]), None)?;
//!
//! let knn = db.knn_query(&EuclideanDistance, &[]).ok_or(
//!     locus::LocusError::Configuration("no KNN available".into()),
//! )?;
//! let neighbors = knn.knn_by_id(target, 2)?;
//! assert_eq!(neighbors[0].id, target); // a record is its own 1-NN
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod database;
pub mod distance;
pub mod error;
pub mod events;
pub mod heap;
pub mod ids;
pub mod index;
pub mod preprocess;
pub mod query;

pub use data::{ClassLabel, DataVector, Metadata, NumberVector};
pub use database::Database;
pub use distance::{
    CosineSimilarity, DistanceFunction, DistanceQueryBound, DistanceValue, EuclideanDistance,
    ManhattanDistance, SimilarityFunction, SimilarityQueryBound,
};
pub use error::{LocusError, Result};
pub use events::{DataStoreEvent, DataStoreListener, ListenerId};
pub use heap::{KnnHeap, Neighbor};
pub use ids::ObjectId;
pub use index::{Index, KnnIndex, PageAccesses, RangeIndex, RknnIndex};
pub use preprocess::materialized::MaterializedKnn;
pub use preprocess::partitioned::PartitionedKnn;
pub use preprocess::preference::PreferenceVectors;
pub use preprocess::{
    MaterializeKnnConfig, PartitionedKnnConfig, PreferenceVectorConfig, PreprocessStats,
};
pub use query::{KnnSearch, QueryHint, RangeSearch, RknnSearch};
