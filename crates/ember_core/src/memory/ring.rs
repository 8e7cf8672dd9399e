//! # Ring Cursors
//!
//! Circular bookkeeping for fixed-capacity pools that are filled and drained
//! strictly in FIFO order (particle rings).
//!
//! ```text
//!   first_retired     first_active       first_new        first_free
//!        │  retired      │  active (drawn) │  new (pending)  │  free ...
//!  ──────┴───────────────┴─────────────────┴─────────────────┴──────────▶ wraps
//! ```
//!
//! ## Full/empty rule
//!
//! One slot is always reserved. The ring is empty when
//! `first_free == first_retired` and full when advancing `first_free` would
//! make it equal `first_retired`. A ring of capacity `N` therefore holds at
//! most `N - 1` occupied slots, and `first_free` only ever catches up with
//! `first_retired` from behind by the ring draining, never by a push.

use std::ops::Range;

/// The four cursors of a FIFO ring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingCursors {
    capacity: usize,
    first_active: usize,
    first_new: usize,
    first_free: usize,
    first_retired: usize,
}

impl RingCursors {
    /// Creates an empty ring.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2` (one slot is reserved, so smaller rings can
    /// never hold anything).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "Ring capacity must be at least 2");

        Self {
            capacity,
            first_active: 0,
            first_new: 0,
            first_free: 0,
            first_retired: 0,
        }
    }

    /// Returns the total capacity (including the reserved slot).
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Index of the oldest slot that is live and already flushed.
    #[inline]
    #[must_use]
    pub const fn first_active(&self) -> usize {
        self.first_active
    }

    /// Index of the oldest slot that has not been flushed yet.
    #[inline]
    #[must_use]
    pub const fn first_new(&self) -> usize {
        self.first_new
    }

    /// Index of the next slot a push will fill.
    #[inline]
    #[must_use]
    pub const fn first_free(&self) -> usize {
        self.first_free
    }

    /// Index of the oldest retired slot still inside its grace period.
    #[inline]
    #[must_use]
    pub const fn first_retired(&self) -> usize {
        self.first_retired
    }

    #[inline]
    const fn advance(&self, index: usize) -> usize {
        (index + 1) % self.capacity
    }

    #[inline]
    const fn distance(&self, from: usize, to: usize) -> usize {
        (to + self.capacity - from) % self.capacity
    }

    /// Splits the circular span `from..to` into at most two linear ranges.
    #[inline]
    const fn split(&self, from: usize, to: usize) -> (Range<usize>, Range<usize>) {
        if from <= to {
            (from..to, 0..0)
        } else {
            (from..self.capacity, 0..to)
        }
    }

    /// Whether no slot is occupied.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_free == self.first_retired
    }

    /// Whether the next push would be refused.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.advance(self.first_free) == self.first_retired
    }

    /// Number of live slots (flushed or not), i.e. `first_active..first_free`.
    #[inline]
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.distance(self.first_active, self.first_free)
    }

    /// Number of slots pushed but not flushed yet.
    #[inline]
    #[must_use]
    pub const fn new_count(&self) -> usize {
        self.distance(self.first_new, self.first_free)
    }

    /// Number of retired slots waiting out their grace period.
    #[inline]
    #[must_use]
    pub const fn retired_count(&self) -> usize {
        self.distance(self.first_retired, self.first_active)
    }

    /// Number of occupied slots (retired + live).
    #[inline]
    #[must_use]
    pub const fn occupied_count(&self) -> usize {
        self.distance(self.first_retired, self.first_free)
    }

    /// Claims the next free slot.
    ///
    /// Returns the claimed index, or `None` when the ring is full. A full
    /// ring never overwrites: the oldest data stays put.
    #[inline]
    pub fn try_push(&mut self) -> Option<usize> {
        let next_free = self.advance(self.first_free);
        if next_free == self.first_retired {
            return None;
        }

        let slot = self.first_free;
        self.first_free = next_free;
        Some(slot)
    }

    /// Oldest flushed live slot, if any.
    #[inline]
    #[must_use]
    pub const fn peek_active(&self) -> Option<usize> {
        if self.first_active == self.first_new {
            None
        } else {
            Some(self.first_active)
        }
    }

    /// Moves the oldest flushed live slot into the retired region.
    ///
    /// Returns `false` if there was nothing to retire.
    #[inline]
    pub fn retire_front(&mut self) -> bool {
        if self.first_active == self.first_new {
            return false;
        }
        self.first_active = self.advance(self.first_active);
        true
    }

    /// Oldest retired slot, if any.
    #[inline]
    #[must_use]
    pub const fn peek_retired(&self) -> Option<usize> {
        if self.first_retired == self.first_active {
            None
        } else {
            Some(self.first_retired)
        }
    }

    /// Returns the oldest retired slot to the free region.
    ///
    /// Returns `false` if there was nothing to free.
    #[inline]
    pub fn free_front(&mut self) -> bool {
        if self.first_retired == self.first_active {
            return false;
        }
        self.first_retired = self.advance(self.first_retired);
        true
    }

    /// Marks every new slot as flushed and returns the ranges that were new.
    pub fn flush_new(&mut self) -> (Range<usize>, Range<usize>) {
        let ranges = self.split(self.first_new, self.first_free);
        self.first_new = self.first_free;
        ranges
    }

    /// Ranges of the new (unflushed) region.
    #[must_use]
    pub const fn new_ranges(&self) -> (Range<usize>, Range<usize>) {
        self.split(self.first_new, self.first_free)
    }

    /// Ranges of the live region `first_active..first_free`.
    #[must_use]
    pub const fn live_ranges(&self) -> (Range<usize>, Range<usize>) {
        self.split(self.first_active, self.first_free)
    }

    /// Empties the ring.
    pub fn clear(&mut self) {
        self.first_active = 0;
        self.first_new = 0;
        self.first_free = 0;
        self.first_retired = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_slot() {
        let mut ring = RingCursors::new(4);
        assert_eq!(ring.try_push(), Some(0));
        assert_eq!(ring.try_push(), Some(1));
        assert_eq!(ring.try_push(), Some(2));
        assert!(ring.is_full());
        assert_eq!(ring.try_push(), None);
        assert_eq!(ring.live_count(), 3);
        assert_eq!(ring.occupied_count(), 3);
    }

    #[test]
    fn test_retire_requires_flush() {
        let mut ring = RingCursors::new(8);
        let _ = ring.try_push();
        let _ = ring.try_push();
        assert_eq!(ring.peek_active(), None);
        assert!(!ring.retire_front());

        let (a, b) = ring.flush_new();
        assert_eq!(a, 0..2);
        assert!(b.is_empty());
        assert_eq!(ring.peek_active(), Some(0));
        assert!(ring.retire_front());
        assert_eq!(ring.retired_count(), 1);
        assert_eq!(ring.live_count(), 1);
    }

    #[test]
    fn test_wrapping_ranges() {
        let mut ring = RingCursors::new(4);
        for _ in 0..3 {
            let _ = ring.try_push();
        }
        let _ = ring.flush_new();
        assert!(ring.retire_front());
        assert!(ring.retire_front());
        assert!(ring.free_front());
        assert!(ring.free_front());

        // first_retired = first_active = 2, first_free = 3
        assert_eq!(ring.try_push(), Some(3));
        assert_eq!(ring.try_push(), Some(0));
        assert_eq!(ring.try_push(), None);

        let (a, b) = ring.live_ranges();
        assert_eq!(a, 2..4);
        assert_eq!(b, 0..1);
        assert_eq!(ring.live_count(), 3);

        let (a, b) = ring.new_ranges();
        assert_eq!(a, 3..4);
        assert_eq!(b, 0..1);
    }

    #[test]
    fn test_drain_to_empty() {
        let mut ring = RingCursors::new(3);
        let _ = ring.try_push();
        let _ = ring.flush_new();
        assert!(ring.retire_front());
        assert!(!ring.is_empty());
        assert!(ring.free_front());
        assert!(ring.is_empty());
        assert!(!ring.free_front());
    }
}
