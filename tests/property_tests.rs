//! Property-based tests for locus invariants.
//!
//! These verify invariants that should hold regardless of input:
//! - A bounded heap never exceeds its capacity and keeps the k smallest
//! - Round-robin partitioning covers every identifier exactly once
//! - The partitioned build always drains its symmetric distance cache
//! - The materialized cache agrees with a fresh linear scan

use locus::preprocess::partitioned::partition_round_robin;
use locus::{
    Database, DataVector, EuclideanDistance, KnnHeap, MaterializeKnnConfig, MaterializedKnn,
    ObjectId, PartitionedKnn, PartitionedKnnConfig,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn build_db(points: &[f64]) -> Database<DataVector> {
    let mut db = Database::new();
    let items = points
        .iter()
        .map(|&p| (DataVector::new(vec![p]), None))
        .collect();
    db.bulk_insert(items).unwrap();
    db
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn heap_never_exceeds_capacity_and_is_sorted(
        distances in prop::collection::vec(0.0f64..1000.0, 1..200),
        k in 1usize..20,
    ) {
        let mut heap = KnnHeap::new(k).unwrap();
        for (i, &d) in distances.iter().enumerate() {
            heap.insert(d, ObjectId::from_raw(i as u32));
            prop_assert!(heap.len() <= k);
        }
        let result = heap.into_sorted();
        prop_assert_eq!(result.len(), k.min(distances.len()));
        for pair in result.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn heap_excludes_everything_beyond_the_kth(
        distances in prop::collection::vec(0.0f64..1000.0, 1..200),
        k in 1usize..20,
    ) {
        let mut heap = KnnHeap::new(k).unwrap();
        for (i, &d) in distances.iter().enumerate() {
            heap.insert(d, ObjectId::from_raw(i as u32));
        }
        let retained = heap.into_sorted();

        let mut sorted = distances.clone();
        sorted.sort_unstable_by(f64::total_cmp);
        // Everything retained ranks within the k smallest distances.
        if let Some(worst) = retained.last() {
            let kth = sorted[retained.len() - 1];
            prop_assert!(worst.distance <= kth);
        }
    }

    #[test]
    fn partitions_cover_ids_exactly_once(
        n in 0usize..300,
        partitions in 2usize..12,
    ) {
        let ids: Vec<ObjectId> = (0..n as u32).map(ObjectId::from_raw).collect();
        let parts = partition_round_robin(&ids, partitions);
        prop_assert_eq!(parts.len(), partitions);

        // Sizes differ by at most one; the first n mod P partitions are
        // the larger ones.
        let small = n / partitions;
        let large_count = n % partitions;
        for (p, part) in parts.iter().enumerate() {
            let expected = if p < large_count { small + 1 } else { small };
            prop_assert_eq!(part.len(), expected);
        }

        let seen: BTreeSet<ObjectId> = parts.iter().flatten().copied().collect();
        prop_assert_eq!(seen.len(), n);
        prop_assert!(ids.iter().all(|id| seen.contains(id)));
    }

    #[test]
    fn partitioned_build_always_drains_cache(
        points in prop::collection::vec(-100.0f64..100.0, 2..60),
        partitions in 2usize..6,
        k in 1usize..8,
    ) {
        let db = build_db(&points);
        let index = PartitionedKnn::build(
            &db,
            &EuclideanDistance,
            PartitionedKnnConfig { k, partitions },
        ).unwrap();
        prop_assert_eq!(index.stats().cache_residue, 0);
        prop_assert_eq!(index.stats().entries, points.len());
    }

    #[test]
    fn materialized_cache_matches_linear_scan(
        points in prop::collection::vec(-100.0f64..100.0, 1..50),
        k in 1usize..10,
    ) {
        let db = build_db(&points);
        let mut indexed = build_db(&points);
        let index = MaterializedKnn::build(
            &indexed,
            &EuclideanDistance,
            MaterializeKnnConfig { k },
        ).unwrap();
        indexed.add_index(Box::new(index));

        let linear = db.knn_query(&EuclideanDistance, &[]).unwrap();
        let cached = indexed.knn_query(&EuclideanDistance, &[]).unwrap();
        for id in db.ids() {
            prop_assert_eq!(
                linear.knn_by_id(id, k).unwrap(),
                cached.knn_by_id(id, k).unwrap()
            );
        }
    }

    #[test]
    fn knn_results_sorted_with_deterministic_ties(
        points in prop::collection::vec(-10.0f64..10.0, 1..60),
        k in 1usize..10,
    ) {
        let db = build_db(&points);
        let knn = db.knn_query(&EuclideanDistance, &[]).unwrap();
        for id in db.ids() {
            let list = knn.knn_by_id(id, k).unwrap();
            for pair in list.windows(2) {
                prop_assert!(
                    pair[0].distance < pair[1].distance
                        || (pair[0].distance == pair[1].distance && pair[0].id < pair[1].id)
                );
            }
        }
    }
}
