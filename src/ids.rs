//! Object identifiers and their lifecycle.
//!
//! Identifiers are opaque, totally ordered values. They are compared and
//! hashed by value only, never by the content of the record they refer to,
//! and they are reused after deletion — but never while the previous holder
//! is still live.

use crate::error::{LocusError, Result};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque identifier of a database record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectId(u32);

impl ObjectId {
    /// Construct an identifier from its raw value.
    ///
    /// Intended for tests and for embedding applications that persist ids
    /// externally; within the database, ids come from the allocator.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        ObjectId(raw)
    }

    /// The raw value of this identifier.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues unique identifiers and reclaims freed ones.
///
/// Freed ids are kept in a sorted pool and handed out lowest-first before
/// the monotone counter advances, so the id space stays compact.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u32,
    free: BTreeSet<u32>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh identifier.
    pub fn allocate(&mut self) -> Result<ObjectId> {
        if let Some(&raw) = self.free.iter().next() {
            self.free.remove(&raw);
            return Ok(ObjectId(raw));
        }
        if self.next == u32::MAX {
            return Err(LocusError::CapacityExhausted);
        }
        let raw = self.next;
        self.next += 1;
        Ok(ObjectId(raw))
    }

    /// Claim a specific identifier, e.g. one pre-assigned by the caller.
    ///
    /// Fails with [`LocusError::DuplicateIdentifier`] if the id was handed
    /// out and has not been freed since. Claiming an id beyond the counter
    /// releases the skipped range into the free pool.
    pub fn reserve(&mut self, id: ObjectId) -> Result<()> {
        let raw = id.raw();
        if self.free.remove(&raw) {
            return Ok(());
        }
        if raw < self.next {
            return Err(LocusError::DuplicateIdentifier { id });
        }
        if raw == u32::MAX {
            return Err(LocusError::CapacityExhausted);
        }
        for skipped in self.next..raw {
            self.free.insert(skipped);
        }
        self.next = raw + 1;
        Ok(())
    }

    /// Return an identifier to the pool, making it available for reuse.
    pub fn release(&mut self, id: ObjectId) {
        self.free.insert(id.raw());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_sequential() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.allocate().unwrap(), ObjectId::from_raw(0));
        assert_eq!(alloc.allocate().unwrap(), ObjectId::from_raw(1));
        assert_eq!(alloc.allocate().unwrap(), ObjectId::from_raw(2));
    }

    #[test]
    fn test_released_id_is_reused() {
        let mut alloc = IdAllocator::new();
        let a = alloc.allocate().unwrap();
        let _b = alloc.allocate().unwrap();
        alloc.release(a);
        assert_eq!(alloc.allocate().unwrap(), a);
    }

    #[test]
    fn test_reserve_live_id_fails() {
        let mut alloc = IdAllocator::new();
        let a = alloc.allocate().unwrap();
        assert!(matches!(
            alloc.reserve(a),
            Err(LocusError::DuplicateIdentifier { .. })
        ));
    }

    #[test]
    fn test_reserve_ahead_releases_gap() {
        let mut alloc = IdAllocator::new();
        alloc.reserve(ObjectId::from_raw(5)).unwrap();
        // The skipped range 0..5 is free; fresh allocations draw from it.
        assert_eq!(alloc.allocate().unwrap(), ObjectId::from_raw(0));
        assert!(matches!(
            alloc.reserve(ObjectId::from_raw(5)),
            Err(LocusError::DuplicateIdentifier { .. })
        ));
    }
}
