//! Distance/identifier result pairs and the bounded k-nearest-neighbor heap.

use crate::distance::DistanceValue;
use crate::error::{LocusError, Result};
use crate::ids::ObjectId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A (distance, identifier) result pair.
///
/// Ordered by distance first, then by identifier, so result lists are
/// deterministic on ties and directly comparable between the linear-scan
/// baseline and any accelerated implementation.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<D> {
    pub distance: D,
    pub id: ObjectId,
}

impl<D: DistanceValue> Neighbor<D> {
    #[must_use]
    pub fn new(distance: D, id: ObjectId) -> Self {
        Self { distance, id }
    }
}

impl<D: DistanceValue> PartialEq for Neighbor<D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<D: DistanceValue> Eq for Neighbor<D> {}

impl<D: DistanceValue> PartialOrd for Neighbor<D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<D: DistanceValue> Ord for Neighbor<D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Bounded heap holding the `k` smallest neighbors observed.
///
/// Internally a max-heap with the worst retained neighbor on top. An empty
/// heap reports the infinite sentinel as its threshold, so all capacities
/// start open; the heap never holds more than `k` entries.
#[derive(Debug)]
pub struct KnnHeap<D: DistanceValue> {
    k: usize,
    heap: BinaryHeap<Neighbor<D>>,
}

impl<D: DistanceValue> KnnHeap<D> {
    /// Create a heap of capacity `k`. Fails for `k == 0`.
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 {
            return Err(LocusError::InvalidArgument(
                "neighbor count k must be positive".to_string(),
            ));
        }
        Ok(Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        })
    }

    /// Capacity of this heap.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of neighbors currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Distance of the worst retained neighbor, or the infinite sentinel
    /// while capacity remains. Candidates at or below this threshold are
    /// worth offering.
    #[must_use]
    pub fn threshold(&self) -> D {
        if self.heap.len() < self.k {
            D::INFINITE
        } else {
            self.heap.peek().map_or(D::INFINITE, |worst| worst.distance)
        }
    }

    /// Offer a candidate; it is retained if it ranks among the k smallest
    /// seen so far (ties broken by identifier).
    pub fn insert(&mut self, distance: D, id: ObjectId) {
        let candidate = Neighbor::new(distance, id);
        if self.heap.len() < self.k {
            self.heap.push(candidate);
            return;
        }
        if let Some(worst) = self.heap.peek() {
            if candidate < *worst {
                self.heap.pop();
                self.heap.push(candidate);
            }
        }
    }

    /// Drain into a list sorted ascending by (distance, identifier).
    #[must_use]
    pub fn into_sorted(self) -> Vec<Neighbor<D>> {
        let mut result = self.heap.into_vec();
        result.sort_unstable();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> ObjectId {
        ObjectId::from_raw(raw)
    }

    #[test]
    fn test_empty_heap_threshold_is_infinite() {
        let heap: KnnHeap<f64> = KnnHeap::new(3).unwrap();
        assert_eq!(heap.threshold(), f64::INFINITY);
    }

    #[test]
    fn test_keeps_k_smallest_sorted() {
        let mut heap = KnnHeap::new(2).unwrap();
        for (i, d) in [5.0, 1.0, 3.0, 2.0, 4.0].iter().enumerate() {
            heap.insert(*d, id(i as u32));
        }
        let result = heap.into_sorted();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].distance, 1.0);
        assert_eq!(result[1].distance, 2.0);
    }

    #[test]
    fn test_tie_break_prefers_smaller_id() {
        let mut heap = KnnHeap::new(1).unwrap();
        heap.insert(1.0, id(7));
        heap.insert(1.0, id(3));
        let result = heap.into_sorted();
        assert_eq!(result[0].id, id(3));
    }

    #[test]
    fn test_zero_k_rejected() {
        assert!(matches!(
            KnnHeap::<f64>::new(0),
            Err(LocusError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut heap = KnnHeap::new(4).unwrap();
        for i in 0..100u32 {
            heap.insert(f64::from(i), id(i));
            assert!(heap.len() <= 4);
        }
    }
}
