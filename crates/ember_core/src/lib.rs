//! # Ember Core
//!
//! Foundations shared by every Ember crate:
//! - Plain-old-data math types that can be uploaded to the GPU as-is
//! - Seeded random sources, so every simulation is reproducible
//! - `RingCursors`, the circular bookkeeping behind particle pools
//! - `PingPong`, a pair of buffers where exactly one side is read at a time
//! - `EngineError` and TOML config loading
//!
//! ## Example
//!
//! ```rust
//! use ember_core::{RingCursors, Seed, SeededRandom, RandomSource};
//!
//! let mut ring = RingCursors::new(4);
//! assert!(ring.try_push().is_some());
//!
//! let mut rng = SeededRandom::new(Seed::new(42));
//! let x = rng.next_f32();
//! assert!((0.0..1.0).contains(&x));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod math;
pub mod memory;
pub mod random;
pub mod sync;

pub use error::{EngineError, EngineResult};
pub use math::{BoundingBox, Color4, Ray, Vec2, Vec3, Vec4};
pub use memory::RingCursors;
pub use random::{RandomSource, Seed, SeededRandom};
pub use sync::PingPong;
