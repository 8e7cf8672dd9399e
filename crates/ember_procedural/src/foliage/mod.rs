//! # Foliage
//!
//! Density maps, tagged ground meshes, channel configuration and the patch
//! that scatters a channel over a terrain node.

mod channel;
mod density_map;
mod ground;
mod patch;

pub use channel::{FoliageChannel, FoliageChannelConfig, FoliageGeometry};
pub use density_map::DensityMap;
pub use ground::{GroundHit, GroundMesh, GroundTag, Triangle};
pub use patch::{FoliagePatch, FoliageVertex, PlantStats, FOLIAGE_PATCH_CAPACITY};
