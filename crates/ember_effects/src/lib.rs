//! # Ember Effects
//!
//! Particle systems with a fixed budget.
//!
//! ## Two Variants, One Contract
//!
//! ```text
//!   Emitter ──spawns──▶ CpuParticleSystem      (ring on the CPU, upload new range)
//!   Emitter ──rate────▶ StreamOutParticleSystem (ping-pong on the device)
//! ```
//!
//! Both hold at most `max_particles - 1` live particles, spawn with the same
//! velocity/jitter rules from [`ParticleSystemParams`] and age particles with
//! the same closed-form evaluation ([`Particle::evaluate`]).
//!
//! ## Example
//!
//! ```rust
//! use ember_core::{Seed, SeededRandom, Vec3};
//! use ember_effects::{CpuParticleSystem, Emitter, ParticleSystemParams};
//!
//! let params = ParticleSystemParams::fire();
//! let mut system = CpuParticleSystem::new(params).unwrap();
//! let mut emitter = Emitter::new(Vec3::ZERO, 60.0, params.duration);
//! let mut rng = SeededRandom::new(Seed::new(1));
//!
//! system.emit(&mut emitter, 1.0 / 60.0, Vec3::ZERO, &mut rng);
//! system.update(1.0 / 60.0);
//! let (new_a, new_b) = system.flush_new_particles();
//! assert!(new_a.len() + new_b.len() <= 1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod cpu_system;
pub mod emitter;
pub mod library;
pub mod params;
pub mod particle;
pub mod stream_out;

pub use cpu_system::{CpuParticleSystem, ParticleStats, RETIREMENT_GRACE};
pub use emitter::{Emitter, Spawn, MAX_SPAWNS_PER_UPDATE};
pub use library::EffectLibrary;
pub use params::{ParticleBlendMode, ParticleSystemParams};
pub use particle::{Particle, ParticleSample};
pub use stream_out::{
    BufferHandle, SoftwareStats, SoftwareStreamOut, StreamOutConstants, StreamOutDevice,
    StreamOutParticleSystem, StreamOutVertex,
};
