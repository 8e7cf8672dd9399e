//! # CPU Particle Ring
//!
//! A fixed-capacity particle pool driven entirely by [`RingCursors`].
//!
//! Lifecycle of a slot:
//!
//! 1. `add_particle` claims the next free slot and stamps it with the
//!    current time. The particle is *new*.
//! 2. `flush_new_particles` hands the new region to the renderer for upload.
//!    The particle is *active*.
//! 3. Once it has lived `duration` seconds, `retire_active_particles` moves
//!    it to the *retired* region and re-stamps it with the retirement time.
//! 4. After [`RETIREMENT_GRACE`] seconds, `free_retired_particles` returns
//!    the slot to the free region. The grace period keeps a slot from being
//!    overwritten while a frame that still draws it may be in flight.
//!
//! A saturated ring drops new particles; it never evicts old ones.

use ember_core::{EngineError, EngineResult, RandomSource, RingCursors, Vec3};

use crate::emitter::Emitter;
use crate::params::ParticleSystemParams;
use crate::particle::Particle;

/// Seconds a retired slot waits before it can be reused.
pub const RETIREMENT_GRACE: f32 = 3.0;

/// Counters for a particle ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParticleStats {
    /// Ring capacity
    pub capacity: u32,
    /// Live particles (active + new)
    pub live: u32,
    /// Particles waiting to be flushed
    pub pending: u32,
    /// Retired particles still in their grace period
    pub retired: u32,
    /// Particles accepted since creation
    pub added_total: u64,
    /// Particles dropped because the ring was full
    pub dropped_total: u64,
    /// Particles retired since creation
    pub retired_total: u64,
    /// Frames in which at least one particle was dropped
    pub saturated_frames: u64,
}

/// CPU-side particle system over a fixed ring.
pub struct CpuParticleSystem {
    params: ParticleSystemParams,
    particles: Box<[Particle]>,
    ring: RingCursors,
    total_time: f32,
    added_total: u64,
    dropped_total: u64,
    retired_total: u64,
    saturated_frames: u64,
    /// Set by the first drop of a frame, so saturation is logged once per frame
    saturated: bool,
}

impl CpuParticleSystem {
    /// Creates a system with `params.max_particles` slots.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParams`] if the parameters fail
    /// validation.
    pub fn new(params: ParticleSystemParams) -> EngineResult<Self> {
        params.validate()?;

        tracing::debug!(
            "Creating particle ring: capacity={}, duration={}s",
            params.max_particles,
            params.duration
        );

        Ok(Self {
            params,
            particles: vec![Particle::default(); params.max_particles].into_boxed_slice(),
            ring: RingCursors::new(params.max_particles),
            total_time: 0.0,
            added_total: 0,
            dropped_total: 0,
            retired_total: 0,
            saturated_frames: 0,
            saturated: false,
        })
    }

    /// The bound parameter snapshot.
    #[must_use]
    pub fn params(&self) -> &ParticleSystemParams {
        &self.params
    }

    /// Binds a new parameter snapshot. Capacity is fixed at creation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParams`] if the snapshot is invalid or
    /// asks for a different capacity.
    pub fn set_params(&mut self, params: ParticleSystemParams) -> EngineResult<()> {
        params.validate()?;
        if params.max_particles != self.particles.len() {
            return Err(EngineError::InvalidParams(format!(
                "capacity is fixed at {}, cannot rebind with max_particles = {}",
                self.particles.len(),
                params.max_particles
            )));
        }
        self.params = params;
        Ok(())
    }

    /// Ring capacity (one slot reserved).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    /// Seconds of simulated time since the ring last ran empty.
    #[must_use]
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// The ring cursors, read-only.
    #[must_use]
    pub fn cursors(&self) -> &RingCursors {
        &self.ring
    }

    /// Number of live particles: every add not yet retired.
    #[must_use]
    pub fn active_particles(&self) -> usize {
        self.ring.live_count()
    }

    /// Adds a particle.
    ///
    /// Returns `false` and leaves the ring untouched if it is full.
    pub fn add_particle<R: RandomSource + ?Sized>(
        &mut self,
        position: Vec3,
        velocity: Vec3,
        rng: &mut R,
    ) -> bool {
        let Some(slot) = self.ring.try_push() else {
            self.dropped_total += 1;
            if !self.saturated {
                self.saturated = true;
                self.saturated_frames += 1;
                tracing::debug!(
                    "Particle ring saturated at {} live particles, dropping",
                    self.ring.live_count()
                );
            }
            return false;
        };

        self.particles[slot] = Particle {
            position,
            velocity: self.params.spawn_velocity(velocity, rng),
            random: ParticleSystemParams::spawn_random(rng),
            max_age: self.total_time,
        };
        self.added_total += 1;
        true
    }

    /// Runs `emitter` for one step along to `new_position`, adding every
    /// particle it issues. Returns the number accepted.
    pub fn emit<R: RandomSource + ?Sized>(
        &mut self,
        emitter: &mut Emitter,
        elapsed: f32,
        new_position: Vec3,
        rng: &mut R,
    ) -> usize {
        let mut accepted = 0;
        emitter.update(elapsed, new_position, |spawn| {
            if self.add_particle(spawn.position, spawn.velocity, rng) {
                accepted += 1;
            }
        });
        accepted
    }

    /// Advances time and recycles slots.
    pub fn update(&mut self, elapsed: f32) {
        self.total_time += elapsed;
        self.saturated = false;

        self.retire_active_particles();
        self.free_retired_particles();

        // Nothing references the clock once the ring is empty
        if self.ring.is_empty() {
            self.total_time = 0.0;
        }
    }

    /// Retires every flushed particle that has lived its full duration.
    pub fn retire_active_particles(&mut self) {
        let duration = self.params.duration;

        while let Some(slot) = self.ring.peek_active() {
            let age = self.total_time - self.particles[slot].max_age;
            if age < duration {
                break;
            }

            // From here on max_age holds the retirement time
            self.particles[slot].max_age = self.total_time;
            self.ring.retire_front();
            self.retired_total += 1;
        }
    }

    /// Frees every retired slot whose grace period has passed.
    pub fn free_retired_particles(&mut self) {
        while let Some(slot) = self.ring.peek_retired() {
            let since_retired = self.total_time - self.particles[slot].max_age;
            if since_retired < RETIREMENT_GRACE {
                break;
            }
            self.ring.free_front();
        }
    }

    /// Hands over the particles added since the last flush (for upload) and
    /// marks them active. Two slices because the region may wrap.
    pub fn flush_new_particles(&mut self) -> (&[Particle], &[Particle]) {
        let (a, b) = self.ring.flush_new();
        (&self.particles[a], &self.particles[b])
    }

    /// The live slice(s) `first_active..first_free` the renderer draws.
    #[must_use]
    pub fn live_particles(&self) -> (&[Particle], &[Particle]) {
        let (a, b) = self.ring.live_ranges();
        (&self.particles[a], &self.particles[b])
    }

    /// Iterates live particles oldest first.
    pub fn iter_live(&self) -> impl Iterator<Item = &Particle> + '_ {
        let (a, b) = self.live_particles();
        a.iter().chain(b.iter())
    }

    /// Empties the ring and resets the clock. Counters are kept.
    pub fn clear(&mut self) {
        self.ring.clear();
        self.total_time = 0.0;
        self.saturated = false;
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> ParticleStats {
        ParticleStats {
            capacity: self.particles.len() as u32,
            live: self.ring.live_count() as u32,
            pending: self.ring.new_count() as u32,
            retired: self.ring.retired_count() as u32,
            added_total: self.added_total,
            dropped_total: self.dropped_total,
            retired_total: self.retired_total,
            saturated_frames: self.saturated_frames,
        }
    }
}
