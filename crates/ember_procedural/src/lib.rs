//! # Ember Procedural
//!
//! Deterministic placement helpers for the world around the effects.
//!
//! ## Core Components
//!
//! - `BezierPath`: smooth paths through polylines, with arc-length lookup
//! - `FoliagePatch`: rejection-sampled vegetation over a terrain node
//! - `DensityMap` / `GroundMesh`: what a patch samples and lands on
//!
//! ## Example
//!
//! ```rust
//! use ember_core::{BoundingBox, Seed, Vec2, Vec3};
//! use ember_procedural::{BezierPath, FoliageChannel, FoliagePatch, GroundMesh};
//!
//! let path = BezierPath::from_points(
//!     &[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 10.0)],
//!     0.3,
//! );
//! assert_eq!(path.segment_count(), 2);
//!
//! let node = BoundingBox::new(Vec3::ZERO, Vec3::new(16.0, 2.0, 16.0));
//! let ground = GroundMesh::flat(&node, 4, 0.0);
//! let grass = FoliageChannel::new("grass", 0.1, Vec2::new(0.5, 0.5), Vec2::new(1.0, 1.0));
//!
//! let mut patch = FoliagePatch::new();
//! patch.plant(&node, &ground, None, &grass, Seed::new(7));
//! assert!(patch.is_planted());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod bezier;
pub mod foliage;

pub use bezier::{BezierPath, ARC_LENGTH_STEPS};
pub use foliage::{
    DensityMap, FoliageChannel, FoliageChannelConfig, FoliageGeometry, FoliagePatch, FoliageVertex,
    GroundHit, GroundMesh, GroundTag, PlantStats, Triangle, FOLIAGE_PATCH_CAPACITY,
};
