//! # Memory Management
//!
//! Fixed-capacity bookkeeping. Pools are sized once and never grow.

mod ring;

pub use ring::RingCursors;
