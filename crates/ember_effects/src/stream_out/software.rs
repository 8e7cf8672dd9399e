//! CPU rendition of a stream-output device.
//!
//! Models exactly the behavior the particle loop depends on:
//! - every buffer has a stream-output counter, zero until the buffer is
//!   first written by stream output (initial data does not count)
//! - `draw_auto` processes as many vertices as that counter says
//! - while a stream target is bound, draws run the geometry stage and write
//!   into the target; otherwise they only rasterize
//! - a buffer can never be source and target at once
//!
//! The geometry stage matches the particle shader: the emitter vertex keeps
//! a spawn timer and emits particles, particle vertices age and die.

use ember_core::{EngineError, EngineResult, Seed, SeededRandom};

use super::{BufferHandle, StreamOutConstants, StreamOutDevice, StreamOutVertex};
use crate::params::ParticleSystemParams;

struct SoftwareBuffer {
    capacity: usize,
    vertices: Vec<StreamOutVertex>,
    /// Vertices written by the last stream output
    stream_count: usize,
}

/// Counters kept by [`SoftwareStreamOut`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwareStats {
    /// Explicit-count draws
    pub draws: u64,
    /// `draw_auto` calls
    pub auto_draws: u64,
    /// Vertices run through the geometry stage
    pub vertices_processed: u64,
    /// Particles spawned by the emitter vertex
    pub particles_emitted: u64,
    /// Output vertices lost to a full target
    pub particles_dropped: u64,
    /// Vertices rasterized by the last non-stream draw
    pub last_rasterized: usize,
}

/// Software stream-output device.
pub struct SoftwareStreamOut {
    buffers: Vec<SoftwareBuffer>,
    source: Option<BufferHandle>,
    target: Option<BufferHandle>,
    constants: Option<StreamOutConstants>,
    rng: SeededRandom,
    /// Reused copy of the source range while the target is written
    scratch: Vec<StreamOutVertex>,
    stats: SoftwareStats,
}

impl SoftwareStreamOut {
    /// Creates a device whose particle randomness comes from `seed`.
    #[must_use]
    pub fn new(seed: Seed) -> Self {
        Self {
            buffers: Vec::new(),
            source: None,
            target: None,
            constants: None,
            rng: SeededRandom::new(seed),
            scratch: Vec::new(),
            stats: SoftwareStats::default(),
        }
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> SoftwareStats {
        self.stats
    }

    /// Contents of a buffer (all vertices, regardless of the counter).
    #[must_use]
    pub fn vertices(&self, buffer: BufferHandle) -> Option<&[StreamOutVertex]> {
        self.buffers.get(buffer.0 as usize).map(|b| b.vertices.as_slice())
    }

    /// Stream-output counter of a buffer.
    #[must_use]
    pub fn stream_count(&self, buffer: BufferHandle) -> Option<usize> {
        self.buffers.get(buffer.0 as usize).map(|b| b.stream_count)
    }

    /// Number of particle vertices (excluding the emitter) in a buffer.
    #[must_use]
    pub fn particle_count(&self, buffer: BufferHandle) -> usize {
        self.vertices(buffer)
            .map_or(0, |v| v.iter().filter(|vertex| !vertex.is_emitter()).count())
    }

    fn check(&self, buffer: BufferHandle) -> EngineResult<()> {
        if (buffer.0 as usize) < self.buffers.len() {
            Ok(())
        } else {
            Err(EngineError::Device(format!("unknown buffer {buffer:?}")))
        }
    }

    fn run(&mut self, requested: usize) -> EngineResult<()> {
        let source = self
            .source
            .ok_or_else(|| EngineError::Device("draw without a vertex source".into()))?;
        let source = &self.buffers[source.0 as usize];
        let count = requested.min(source.vertices.len());

        let Some(target) = self.target else {
            self.stats.last_rasterized = count;
            return Ok(());
        };
        let constants = self
            .constants
            .ok_or_else(|| EngineError::Device("stream output without constants".into()))?;

        self.scratch.clear();
        self.scratch.extend_from_slice(&source.vertices[..count]);
        self.stats.vertices_processed += count as u64;

        let target = &mut self.buffers[target.0 as usize];
        target.vertices.clear();

        let mut dropped = 0u64;
        let mut emitted = 0u64;
        for input in &self.scratch {
            if input.is_emitter() {
                emitted += geometry_emitter(input, &constants, &mut self.rng, target, &mut dropped);
            } else {
                geometry_particle(input, &constants, target, &mut dropped);
            }
        }
        target.stream_count = target.vertices.len();

        self.stats.particles_emitted += emitted;
        self.stats.particles_dropped += dropped;
        Ok(())
    }
}

fn append(target: &mut SoftwareBuffer, vertex: StreamOutVertex, dropped: &mut u64) {
    if target.vertices.len() < target.capacity {
        target.vertices.push(vertex);
    } else {
        *dropped += 1;
    }
}

/// Emitter vertex: re-emit itself, then spawn every particle that is due.
fn geometry_emitter(
    input: &StreamOutVertex,
    constants: &StreamOutConstants,
    rng: &mut SeededRandom,
    target: &mut SoftwareBuffer,
    dropped: &mut u64,
) -> u64 {
    let params = &constants.params;
    let interval = constants.emission_interval;
    let mut timer = input.age + constants.elapsed;

    let mut spawned = Vec::new();
    if constants.emitting && interval > 0.0 {
        // No more than one buffer's worth per step
        while timer >= interval && spawned.len() < target.capacity {
            timer -= interval;
            spawned.push(StreamOutVertex {
                position: constants.emitter_position,
                velocity: params.spawn_velocity(constants.emitter_velocity, rng),
                random: ParticleSystemParams::spawn_random(rng),
                // Spawned `timer` seconds ago within this step
                age: timer,
                kind: StreamOutVertex::KIND_PARTICLE,
            });
        }
    } else {
        timer = 0.0;
    }

    append(
        target,
        StreamOutVertex {
            age: timer,
            ..StreamOutVertex::emitter(constants.emitter_position)
        },
        dropped,
    );

    let emitted = spawned.len() as u64;
    for vertex in spawned {
        append(target, vertex, dropped);
    }
    emitted
}

/// Particle vertex: age it, keep it while its stretched age is in range.
fn geometry_particle(
    input: &StreamOutVertex,
    constants: &StreamOutConstants,
    target: &mut SoftwareBuffer,
    dropped: &mut u64,
) {
    let params = &constants.params;
    let age = input.age + constants.elapsed;
    let stretched = age * (1.0 + input.random.x * params.duration_randomness);
    if stretched < params.duration {
        append(target, StreamOutVertex { age, ..*input }, dropped);
    }
}

impl StreamOutDevice for SoftwareStreamOut {
    fn create_buffer(&mut self, capacity: usize, initial: &[StreamOutVertex]) -> EngineResult<BufferHandle> {
        if initial.len() > capacity {
            return Err(EngineError::Device(format!(
                "initial data ({} vertices) exceeds capacity {capacity}",
                initial.len()
            )));
        }

        let handle = BufferHandle(self.buffers.len() as u32);
        let mut vertices = Vec::with_capacity(capacity);
        vertices.extend_from_slice(initial);
        self.buffers.push(SoftwareBuffer {
            capacity,
            vertices,
            stream_count: 0,
        });
        Ok(handle)
    }

    fn set_constants(&mut self, constants: &StreamOutConstants) -> EngineResult<()> {
        self.constants = Some(*constants);
        Ok(())
    }

    fn bind_vertex_source(&mut self, buffer: BufferHandle) -> EngineResult<()> {
        self.check(buffer)?;
        if self.target == Some(buffer) {
            return Err(EngineError::Device(format!(
                "{buffer:?} is bound as stream target, cannot also be vertex source"
            )));
        }
        self.source = Some(buffer);
        Ok(())
    }

    fn bind_stream_target(&mut self, buffer: BufferHandle) -> EngineResult<()> {
        self.check(buffer)?;
        if self.source == Some(buffer) {
            return Err(EngineError::Device(format!(
                "{buffer:?} is bound as vertex source, cannot also be stream target"
            )));
        }
        self.target = Some(buffer);
        Ok(())
    }

    fn unbind_stream_target(&mut self) -> EngineResult<()> {
        self.target = None;
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32) -> EngineResult<()> {
        self.stats.draws += 1;
        self.run(vertex_count as usize)
    }

    fn draw_auto(&mut self) -> EngineResult<()> {
        self.stats.auto_draws += 1;
        let source = self
            .source
            .ok_or_else(|| EngineError::Device("draw_auto without a vertex source".into()))?;
        let count = self.buffers[source.0 as usize].stream_count;
        self.run(count)
    }
}
