//! # Ping-Pong Buffer Pair
//!
//! Two buffers with fixed roles per frame:
//!
//! ```text
//!        frame N                     frame N+1
//!   ┌──────────┐  ┌──────────┐   ┌──────────┐  ┌──────────┐
//!   │ source A │→ │ target B │   │ target A │ ←│ source B │
//!   └──────────┘  └──────────┘   └──────────┘  └──────────┘
//!           toggle() ────────────────▶
//! ```
//!
//! The source is read, the target is written, and the borrow checker
//! guarantees the two never alias: [`PingPong::split_mut`] hands out one
//! shared and one exclusive reference to different halves.

/// A pair of buffers where exactly one is the source at any time.
#[derive(Clone, Debug)]
pub struct PingPong<T> {
    buffers: [T; 2],
    source_index: usize,
    toggle_count: u64,
}

impl<T> PingPong<T> {
    /// Creates a pair; `source` starts as the read side.
    #[must_use]
    pub fn new(source: T, target: T) -> Self {
        Self {
            buffers: [source, target],
            source_index: 0,
            toggle_count: 0,
        }
    }

    /// Index (0 or 1) of the current source buffer.
    #[inline]
    #[must_use]
    pub const fn source_index(&self) -> usize {
        self.source_index
    }

    /// Index (0 or 1) of the current target buffer.
    #[inline]
    #[must_use]
    pub const fn target_index(&self) -> usize {
        self.source_index ^ 1
    }

    /// Number of toggles since creation.
    #[inline]
    #[must_use]
    pub const fn toggle_count(&self) -> u64 {
        self.toggle_count
    }

    /// The buffer currently read from.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &T {
        &self.buffers[self.source_index]
    }

    /// Mutable access to the source buffer (seeding, not simulation).
    #[inline]
    pub fn source_mut(&mut self) -> &mut T {
        &mut self.buffers[self.source_index]
    }

    /// The buffer currently written to.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &T {
        &self.buffers[self.source_index ^ 1]
    }

    /// Source for reading and target for writing, at the same time.
    #[inline]
    pub fn split_mut(&mut self) -> (&T, &mut T) {
        let [first, second] = &mut self.buffers;
        if self.source_index == 0 {
            (&*first, second)
        } else {
            (&*second, first)
        }
    }

    /// Swaps the roles: last frame's target becomes the new source.
    #[inline]
    pub fn toggle(&mut self) {
        self.source_index ^= 1;
        self.toggle_count += 1;
    }

    /// Both buffers, in index order.
    #[must_use]
    pub fn buffers(&self) -> &[T; 2] {
        &self.buffers
    }
}
