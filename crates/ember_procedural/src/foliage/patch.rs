//! # Foliage Patch
//!
//! Scatters one foliage channel over a terrain node by rejection sampling:
//!
//! 1. Pick a uniform (x, z) inside the node box.
//! 2. Keep it with probability equal to the density-map value there.
//! 3. Drop it onto the ground with a top-down raycast; only upward-facing
//!    ground triangles (`normal.y > 0.5`) take foliage.
//!
//! ## Determinism
//!
//! Candidates are split into fixed batches evaluated in parallel. Each batch
//! draws from its own random source derived from the patch seed and the
//! batch index, and batches are concatenated in index order, so a seed
//! always yields the same patch regardless of thread count.

use ember_core::math::lerp;
use ember_core::{BoundingBox, RandomSource, Ray, Seed, SeededRandom, Vec2, Vec3};
use rayon::prelude::*;

use super::channel::FoliageChannel;
use super::density_map::DensityMap;
use super::ground::{GroundMesh, GroundTag};

/// Maximum instances in one patch.
pub const FOLIAGE_PATCH_CAPACITY: usize = 8192;

/// Candidates per parallel batch.
const BATCH_SIZE: usize = 256;

/// Ground raycasts per candidate before it is given up.
const MAX_ATTEMPTS: usize = 3;

/// Steepest ground foliage grows on (about 60 degrees).
const MIN_GROUND_NORMAL_Y: f32 = 0.5;

/// One placed foliage instance, laid out for upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FoliageVertex {
    /// Base of the instance, on the ground
    pub position: Vec3,
    /// Width and height
    pub size: Vec2,
    /// Per-instance variation in `[0, 1)` (sway phase, tint)
    pub random: f32,
}

/// Outcome counts of the last planting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlantStats {
    /// Candidates drawn
    pub candidates: usize,
    /// Candidates rejected by the density map
    pub density_rejected: usize,
    /// Candidates that found no suitable ground in every attempt
    pub ground_missed: usize,
    /// Instances kept (after truncation to capacity)
    pub planted: usize,
}

enum Candidate {
    Placed(FoliageVertex),
    Rejected,
    Missed,
}

#[derive(Default)]
struct Batch {
    vertices: Vec<FoliageVertex>,
    rejected: usize,
    missed: usize,
}

/// Placed instances of one foliage channel over one terrain node.
#[derive(Debug, Clone, Default)]
pub struct FoliagePatch {
    vertices: Vec<FoliageVertex>,
    planted: bool,
    stats: PlantStats,
}

impl FoliagePatch {
    /// Creates an empty, unplanted patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`FoliagePatch::plant`] has populated the patch.
    #[must_use]
    pub fn is_planted(&self) -> bool {
        self.planted
    }

    /// Number of placed instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether no instance is placed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Placed instances, in placement order until sorted by
    /// [`FoliagePatch::get_data`].
    #[must_use]
    pub fn vertices(&self) -> &[FoliageVertex] {
        &self.vertices
    }

    /// Counts from the last planting.
    #[must_use]
    pub fn stats(&self) -> PlantStats {
        self.stats
    }

    /// Populates the patch. Does nothing if it is already planted.
    ///
    /// `map` supplies per-position densities from the channel's
    /// `map_channel`; without a map every position is accepted. Returns the number
    /// of instances in the patch.
    pub fn plant(
        &mut self,
        node_bounds: &BoundingBox,
        ground: &GroundMesh,
        map: Option<&DensityMap>,
        channel: &FoliageChannel,
        seed: Seed,
    ) -> usize {
        if self.planted {
            return self.vertices.len();
        }

        let candidates = ((channel.density.clamp(0.0, 1.0) * FOLIAGE_PATCH_CAPACITY as f32).round()
            as usize)
            .min(FOLIAGE_PATCH_CAPACITY);
        let batches = candidates.div_ceil(BATCH_SIZE);

        let results: Vec<Batch> = (0..batches)
            .into_par_iter()
            .map(|index| {
                let count = BATCH_SIZE.min(candidates - index * BATCH_SIZE);
                let mut rng = SeededRandom::new(seed.derive(index as u64));
                let mut batch = Batch {
                    vertices: Vec::with_capacity(count),
                    ..Batch::default()
                };
                for _ in 0..count {
                    match place_candidate(node_bounds, ground, map, channel, &mut rng) {
                        Candidate::Placed(vertex) => batch.vertices.push(vertex),
                        Candidate::Rejected => batch.rejected += 1,
                        Candidate::Missed => batch.missed += 1,
                    }
                }
                batch
            })
            .collect();

        self.vertices.clear();
        let mut stats = PlantStats {
            candidates,
            ..PlantStats::default()
        };
        for batch in results {
            stats.density_rejected += batch.rejected;
            stats.ground_missed += batch.missed;
            self.vertices.extend(batch.vertices);
        }
        self.vertices.truncate(FOLIAGE_PATCH_CAPACITY);
        stats.planted = self.vertices.len();

        self.stats = stats;
        self.planted = true;

        tracing::debug!(
            "Planted '{}': {}/{} candidates ({} rejected by density, {} missed ground)",
            channel.name,
            stats.planted,
            stats.candidates,
            stats.density_rejected,
            stats.ground_missed
        );

        self.vertices.len()
    }

    /// Clears the planted flag so the next [`FoliagePatch::plant`] runs
    /// again. The current instances stay until then.
    pub fn replant(&mut self) {
        self.planted = false;
    }

    /// Instances sorted by distance to `eye`: nearest first for opaque
    /// drawing, farthest first when `transparent` for back-to-front
    /// blending.
    pub fn get_data(&mut self, eye: Vec3, transparent: bool) -> &[FoliageVertex] {
        if transparent {
            self.vertices.sort_unstable_by(|a, b| {
                b.position
                    .distance_squared(eye)
                    .total_cmp(&a.position.distance_squared(eye))
            });
        } else {
            self.vertices.sort_unstable_by(|a, b| {
                a.position
                    .distance_squared(eye)
                    .total_cmp(&b.position.distance_squared(eye))
            });
        }
        &self.vertices
    }
}

fn place_candidate<R: RandomSource + ?Sized>(
    bounds: &BoundingBox,
    ground: &GroundMesh,
    map: Option<&DensityMap>,
    channel: &FoliageChannel,
    rng: &mut R,
) -> Candidate {
    let size = bounds.size();

    for _ in 0..MAX_ATTEMPTS {
        let x = rng.range(bounds.min.x, bounds.max.x);
        let z = rng.range(bounds.min.z, bounds.max.z);

        if let Some(map) = map {
            let u = if size.x > 0.0 { (x - bounds.min.x) / size.x } else { 0.0 };
            let v = if size.z > 0.0 { (z - bounds.min.z) / size.z } else { 0.0 };
            let Some(density) = map.channel_at(u, v, channel.map_channel) else {
                return Candidate::Rejected;
            };
            if rng.next_f32() >= density {
                return Candidate::Rejected;
            }
        }

        let ray = Ray::new(Vec3::new(x, bounds.max.y + 1.0, z), -Vec3::Y);
        match ground.find_top_ground_position(&ray) {
            Some(hit) if hit.tag == GroundTag::Ground && hit.normal.y > MIN_GROUND_NORMAL_Y => {
                let t = rng.next_f32();
                return Candidate::Placed(FoliageVertex {
                    position: hit.position,
                    size: Vec2::new(
                        lerp(channel.min_size.x, channel.max_size.x, t),
                        lerp(channel.min_size.y, channel.max_size.y, t),
                    ),
                    random: rng.next_f32(),
                });
            }
            _ => {}
        }
    }

    Candidate::Missed
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::Color4;

    fn node() -> BoundingBox {
        BoundingBox::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(32.0, 4.0, 32.0))
    }

    fn grass(density: f32) -> FoliageChannel {
        FoliageChannel::new("grass", density, Vec2::new(0.5, 0.5), Vec2::new(1.0, 2.0))
    }

    #[test]
    fn test_full_density_flat_ground_fills_patch() {
        let ground = GroundMesh::flat(&node(), 8, 1.0);
        let mut patch = FoliagePatch::new();
        let planted = patch.plant(&node(), &ground, None, &grass(1.0), Seed::new(1));

        assert_eq!(planted, FOLIAGE_PATCH_CAPACITY);
        assert!(patch.is_planted());
        for vertex in patch.vertices() {
            assert!((vertex.position.y - 1.0).abs() < 1e-4);
            assert!((0.5..=1.0).contains(&vertex.size.x));
            assert!((0.5..=2.0).contains(&vertex.size.y));
        }
    }

    #[test]
    fn test_planted_flag_guards_work() {
        let ground = GroundMesh::flat(&node(), 2, 0.0);
        let mut patch = FoliagePatch::new();
        patch.plant(&node(), &ground, None, &grass(0.1), Seed::new(1));
        let first = patch.vertices().to_vec();

        // Different seed, but already planted
        patch.plant(&node(), &ground, None, &grass(0.1), Seed::new(2));
        assert_eq!(patch.vertices(), first.as_slice());

        patch.replant();
        assert!(!patch.is_planted());
        patch.plant(&node(), &ground, None, &grass(0.1), Seed::new(2));
        assert_ne!(patch.vertices(), first.as_slice());
    }

    #[test]
    fn test_missing_channel_rejects_all() {
        let ground = GroundMesh::flat(&node(), 2, 0.0);
        let map = DensityMap::uniform(Color4::WHITE);
        let mut patch = FoliagePatch::new();
        let channel = FoliageChannel {
            map_channel: 7,
            ..grass(0.5)
        };
        let planted = patch.plant(&node(), &ground, Some(&map), &channel, Seed::new(1));

        assert_eq!(planted, 0);
        assert_eq!(patch.stats().density_rejected, patch.stats().candidates);
        assert!(patch.is_planted());
    }

    #[test]
    fn test_no_ground_misses() {
        let mut patch = FoliagePatch::new();
        let planted = patch.plant(&node(), &GroundMesh::new(), None, &grass(0.05), Seed::new(1));
        assert_eq!(planted, 0);
        assert_eq!(patch.stats().ground_missed, patch.stats().candidates);
    }

    #[test]
    fn test_get_data_sorting() {
        let ground = GroundMesh::flat(&node(), 2, 0.0);
        let mut patch = FoliagePatch::new();
        patch.plant(&node(), &ground, None, &grass(0.05), Seed::new(4));
        let eye = Vec3::new(0.0, 2.0, 0.0);

        let near_first: Vec<f32> = patch
            .get_data(eye, false)
            .iter()
            .map(|v| v.position.distance_squared(eye))
            .collect();
        assert!(near_first.windows(2).all(|w| w[0] <= w[1]));

        let far_first: Vec<f32> = patch
            .get_data(eye, true)
            .iter()
            .map(|v| v.position.distance_squared(eye))
            .collect();
        assert!(far_first.windows(2).all(|w| w[0] >= w[1]));
    }
}
