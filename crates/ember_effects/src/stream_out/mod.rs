//! # Stream-Output Particle System
//!
//! Same lifecycle contract as the CPU ring, but the simulation runs in the
//! geometry stage of the device and writes its output back into a vertex
//! buffer (stream output). Two buffers ping-pong:
//!
//! ```text
//!  simulate():   drawing ──(vertex source)──▶ geometry stage ──(stream out)──▶ stream_out
//!  toggle():     drawing ◀──────────────────────── swap ───────────────────────▶ stream_out
//!  draw():       drawing ──(vertex source)──▶ rasterizer
//! ```
//!
//! ## Bootstrapping
//!
//! The drawing buffer is created holding exactly one emitter vertex, written
//! as initial data. Initial data does not move the device's stream-output
//! counter, so `draw_auto` on that buffer would process zero vertices and
//! the emitter would never run. The first simulation step therefore draws
//! exactly one vertex explicitly; every later step uses `draw_auto`.

mod software;

pub use software::{SoftwareStats, SoftwareStreamOut};

use bytemuck::{Pod, Zeroable};
use ember_core::{EngineResult, PingPong, Vec3, Vec4};

use crate::emitter::Emitter;
use crate::params::ParticleSystemParams;
use crate::particle::{Particle, ParticleSample};

/// Device-side buffer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Vertex flowing through the stream-output loop: either the emitter or a
/// particle.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct StreamOutVertex {
    /// Emitter position, or particle spawn position
    pub position: Vec3,
    /// Particle spawn velocity (unused for the emitter)
    pub velocity: Vec3,
    /// Particle jitter (unused for the emitter)
    pub random: Vec4,
    /// Particle age, or the emitter's time since its last spawn
    pub age: f32,
    /// [`StreamOutVertex::KIND_EMITTER`] or [`StreamOutVertex::KIND_PARTICLE`]
    pub kind: u32,
}

impl StreamOutVertex {
    /// Kind tag of the emitter vertex.
    pub const KIND_EMITTER: u32 = 0;
    /// Kind tag of a particle vertex.
    pub const KIND_PARTICLE: u32 = 1;

    /// The emitter-initialisation vertex.
    #[must_use]
    pub fn emitter(position: Vec3) -> Self {
        Self {
            position,
            kind: Self::KIND_EMITTER,
            ..Default::default()
        }
    }

    /// Whether this is the emitter vertex.
    #[inline]
    #[must_use]
    pub const fn is_emitter(&self) -> bool {
        self.kind == Self::KIND_EMITTER
    }

    /// Visual state of a particle vertex at its current age.
    #[must_use]
    pub fn evaluate(&self, params: &ParticleSystemParams) -> ParticleSample {
        let particle = Particle {
            position: self.position,
            velocity: self.velocity,
            random: self.random,
            max_age: 0.0,
        };
        particle.evaluate(params, self.age)
    }
}

/// Per-step constants handed to the device before a simulation draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamOutConstants {
    /// Seconds since the previous step
    pub elapsed: f32,
    /// Seconds since the system was created
    pub total_time: f32,
    /// Where the emitter vertex spawns particles
    pub emitter_position: Vec3,
    /// Emitter velocity inherited by new particles
    pub emitter_velocity: Vec3,
    /// Seconds between spawns
    pub emission_interval: f32,
    /// Whether the emitter vertex spawns at all this step
    pub emitting: bool,
    /// The system's parameter snapshot
    pub params: ParticleSystemParams,
}

/// The slice of a native graphics device the stream-output loop needs.
pub trait StreamOutDevice {
    /// Creates a vertex buffer usable both as vertex source and as
    /// stream-output target. `initial` does not set the stream-output counter.
    ///
    /// # Errors
    ///
    /// Fails if the buffer cannot be created.
    fn create_buffer(&mut self, capacity: usize, initial: &[StreamOutVertex]) -> EngineResult<BufferHandle>;

    /// Uploads the constants for the next simulation draw.
    ///
    /// # Errors
    ///
    /// Fails if the device rejects the upload.
    fn set_constants(&mut self, constants: &StreamOutConstants) -> EngineResult<()>;

    /// Binds the buffer vertices are read from.
    ///
    /// # Errors
    ///
    /// Fails for unknown buffers or if `buffer` is the bound stream target.
    fn bind_vertex_source(&mut self, buffer: BufferHandle) -> EngineResult<()>;

    /// Binds the buffer the geometry stage writes into.
    ///
    /// # Errors
    ///
    /// Fails for unknown buffers or if `buffer` is the bound vertex source.
    fn bind_stream_target(&mut self, buffer: BufferHandle) -> EngineResult<()>;

    /// Unbinds the stream-output target; draws rasterize again.
    ///
    /// # Errors
    ///
    /// Fails if the device rejects the unbind.
    fn unbind_stream_target(&mut self) -> EngineResult<()>;

    /// Draws the first `vertex_count` vertices of the source.
    ///
    /// # Errors
    ///
    /// Fails if no source is bound or the draw is rejected.
    fn draw(&mut self, vertex_count: u32) -> EngineResult<()>;

    /// Draws as many vertices as the last stream output wrote into the
    /// source.
    ///
    /// # Errors
    ///
    /// Fails if no source is bound or the draw is rejected.
    fn draw_auto(&mut self) -> EngineResult<()>;
}

/// Particle system simulated by the device's stream-output loop.
pub struct StreamOutParticleSystem {
    params: ParticleSystemParams,
    /// Source = drawing buffer, target = stream-out buffer
    buffers: PingPong<BufferHandle>,
    first_run: bool,
    total_time: f32,
}

impl StreamOutParticleSystem {
    /// Creates both buffers, seeding the drawing buffer with the emitter
    /// vertex at `emitter_position`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid or buffer creation
    /// fails.
    pub fn new<D: StreamOutDevice + ?Sized>(
        device: &mut D,
        params: ParticleSystemParams,
        emitter_position: Vec3,
    ) -> EngineResult<Self> {
        params.validate()?;

        let drawing = device.create_buffer(params.max_particles, &[StreamOutVertex::emitter(emitter_position)])?;
        let stream_out = device.create_buffer(params.max_particles, &[])?;

        tracing::debug!(
            "Creating stream-out particle system: capacity={}, buffers={:?}/{:?}",
            params.max_particles,
            drawing,
            stream_out
        );

        Ok(Self {
            params,
            buffers: PingPong::new(drawing, stream_out),
            first_run: true,
            total_time: 0.0,
        })
    }

    /// The bound parameter snapshot.
    #[must_use]
    pub fn params(&self) -> &ParticleSystemParams {
        &self.params
    }

    /// Whether the bootstrap step has not run yet.
    #[must_use]
    pub fn is_first_run(&self) -> bool {
        self.first_run
    }

    /// Seconds simulated so far.
    #[must_use]
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Buffer currently bound as vertex source.
    #[must_use]
    pub fn drawing_buffer(&self) -> BufferHandle {
        *self.buffers.source()
    }

    /// Buffer currently used as stream-output target.
    #[must_use]
    pub fn stream_out_buffer(&self) -> BufferHandle {
        *self.buffers.target()
    }

    /// Runs one simulation step on the device, then swaps the buffers.
    ///
    /// The emitter supplies position, velocity, rate and whether to spawn;
    /// its own spawn callbacks are not used by this variant.
    ///
    /// # Errors
    ///
    /// Propagates device failures. A failed step leaves the clock, the
    /// first-run flag and the buffers as they were, with no stream target
    /// bound.
    pub fn simulate<D: StreamOutDevice + ?Sized>(
        &mut self,
        device: &mut D,
        elapsed: f32,
        emitter: &Emitter,
    ) -> EngineResult<()> {
        let total_time = self.total_time + elapsed;

        device.set_constants(&StreamOutConstants {
            elapsed,
            total_time,
            emitter_position: emitter.position(),
            emitter_velocity: emitter.velocity(),
            emission_interval: emitter.interval(),
            emitting: emitter.is_emitting(),
            params: self.params,
        })?;

        device.bind_vertex_source(self.drawing_buffer())?;
        device.bind_stream_target(self.stream_out_buffer())?;

        let drawn = if self.first_run {
            // The counter of the seeded buffer is still zero; see module docs
            device.draw(1)
        } else {
            device.draw_auto()
        };
        if let Err(e) = drawn {
            // Release the target; the draw error is the one to report
            let _ = device.unbind_stream_target();
            return Err(e);
        }
        device.unbind_stream_target()?;

        if self.first_run {
            self.first_run = false;
            tracing::debug!("Stream-out particle system bootstrapped");
        }
        self.total_time = total_time;
        self.toggle_buffers();
        Ok(())
    }

    /// Rasterizes the current drawing buffer.
    ///
    /// # Errors
    ///
    /// Propagates device failures.
    pub fn draw<D: StreamOutDevice + ?Sized>(&self, device: &mut D) -> EngineResult<()> {
        device.bind_vertex_source(self.drawing_buffer())?;
        device.draw_auto()
    }

    /// Swaps drawing and stream-out buffers.
    pub fn toggle_buffers(&mut self) {
        self.buffers.toggle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::EngineError;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create(usize, usize),
        Constants,
        Source(u32),
        Target(u32),
        Unbind,
        Draw(u32),
        DrawAuto,
    }

    #[derive(Default)]
    struct RecordingDevice {
        calls: Vec<Call>,
        next: u32,
        fail_draws: bool,
    }

    impl StreamOutDevice for RecordingDevice {
        fn create_buffer(&mut self, capacity: usize, initial: &[StreamOutVertex]) -> EngineResult<BufferHandle> {
            self.calls.push(Call::Create(capacity, initial.len()));
            self.next += 1;
            Ok(BufferHandle(self.next))
        }
        fn set_constants(&mut self, _: &StreamOutConstants) -> EngineResult<()> {
            self.calls.push(Call::Constants);
            Ok(())
        }
        fn bind_vertex_source(&mut self, buffer: BufferHandle) -> EngineResult<()> {
            self.calls.push(Call::Source(buffer.0));
            Ok(())
        }
        fn bind_stream_target(&mut self, buffer: BufferHandle) -> EngineResult<()> {
            self.calls.push(Call::Target(buffer.0));
            Ok(())
        }
        fn unbind_stream_target(&mut self) -> EngineResult<()> {
            self.calls.push(Call::Unbind);
            Ok(())
        }
        fn draw(&mut self, vertex_count: u32) -> EngineResult<()> {
            self.calls.push(Call::Draw(vertex_count));
            self.draw_result()
        }
        fn draw_auto(&mut self) -> EngineResult<()> {
            self.calls.push(Call::DrawAuto);
            self.draw_result()
        }
    }

    impl RecordingDevice {
        fn draw_result(&self) -> EngineResult<()> {
            if self.fail_draws {
                Err(EngineError::Device("lost".into()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_vertex_size() {
        assert_eq!(std::mem::size_of::<StreamOutVertex>(), 48);
    }

    #[test]
    fn test_first_run_draws_exactly_one_vertex() {
        let mut device = RecordingDevice::default();
        let mut system =
            StreamOutParticleSystem::new(&mut device, ParticleSystemParams::default(), Vec3::ZERO).unwrap();
        let emitter = Emitter::new(Vec3::ZERO, 10.0, 1.0);

        assert_eq!(device.calls, vec![Call::Create(100, 1), Call::Create(100, 0)]);
        device.calls.clear();

        system.simulate(&mut device, 0.1, &emitter).unwrap();
        assert!(!system.is_first_run());
        system.simulate(&mut device, 0.1, &emitter).unwrap();

        assert_eq!(
            device.calls,
            vec![
                Call::Constants,
                Call::Source(1),
                Call::Target(2),
                Call::Draw(1),
                Call::Unbind,
                Call::Constants,
                Call::Source(2),
                Call::Target(1),
                Call::DrawAuto,
                Call::Unbind,
            ]
        );
    }

    #[test]
    fn test_buffers_never_alias() {
        let mut device = RecordingDevice::default();
        let mut system =
            StreamOutParticleSystem::new(&mut device, ParticleSystemParams::default(), Vec3::ZERO).unwrap();
        for _ in 0..5 {
            assert_ne!(system.drawing_buffer(), system.stream_out_buffer());
            system.toggle_buffers();
        }
    }

    #[test]
    fn test_failed_step_changes_nothing() {
        let mut device = RecordingDevice::default();
        let mut system =
            StreamOutParticleSystem::new(&mut device, ParticleSystemParams::default(), Vec3::ZERO).unwrap();
        let emitter = Emitter::new(Vec3::ZERO, 10.0, 1.0);
        let drawing = system.drawing_buffer();
        device.calls.clear();

        device.fail_draws = true;
        assert!(matches!(
            system.simulate(&mut device, 0.1, &emitter),
            Err(EngineError::Device(_))
        ));
        assert!(system.total_time().abs() < f32::EPSILON);
        assert!(system.is_first_run());
        assert_eq!(system.drawing_buffer(), drawing);
        assert_eq!(device.calls.last(), Some(&Call::Unbind));

        // The retry still bootstraps with a single vertex
        device.fail_draws = false;
        device.calls.clear();
        system.simulate(&mut device, 0.1, &emitter).unwrap();
        assert!(device.calls.contains(&Call::Draw(1)));
        assert!((system.total_time() - 0.1).abs() < f32::EPSILON);
        assert_ne!(system.drawing_buffer(), drawing);
    }
}
