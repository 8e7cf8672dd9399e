//! Particle vertex layout and per-particle evaluation.
//!
//! A particle stores only its spawn state. Everything the renderer needs at
//! a given moment (position, size, color, rotation) is a closed-form
//! function of that state, the system parameters and the particle's age,
//! so nothing is integrated per frame.

use bytemuck::{Pod, Zeroable};
use ember_core::math::lerp;
use ember_core::{Color4, Vec3, Vec4};

use crate::params::ParticleSystemParams;

/// A single particle slot in a ring.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// Spawn position
    pub position: Vec3,
    /// Spawn velocity (already perturbed)
    pub velocity: Vec3,
    /// Per-particle jitter in `[0, 1)`: x = duration/rotation, y = size,
    /// z = spare, w = color
    pub random: Vec4,
    /// System time at spawn; overwritten with the retirement time once the
    /// particle retires
    pub max_age: f32,
}

impl Particle {
    /// Size of a particle in bytes
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Age in seconds at `current_time`, stretched by duration randomness.
    #[inline]
    #[must_use]
    pub fn age(&self, params: &ParticleSystemParams, current_time: f32) -> f32 {
        (current_time - self.max_age) * (1.0 + self.random.x * params.duration_randomness)
    }

    /// Normalized age in `[0, 1]` at `current_time`.
    #[inline]
    #[must_use]
    pub fn normalized_age(&self, params: &ParticleSystemParams, current_time: f32) -> f32 {
        (self.age(params, current_time) / params.duration).clamp(0.0, 1.0)
    }

    /// Evaluates the particle's visual state at `current_time`.
    #[must_use]
    pub fn evaluate(&self, params: &ParticleSystemParams, current_time: f32) -> ParticleSample {
        let age = self.age(params, current_time).max(0.0);
        let t = self.normalized_age(params, current_time);

        // Velocity decays linearly from start speed to start * end_velocity
        let start_speed = self.velocity.length();
        let end_speed = start_speed * params.end_velocity;
        let travelled = start_speed * t + (end_speed - start_speed) * t * t / 2.0;
        let position = self.position
            + self.velocity.normalize_or_zero() * (travelled * params.duration)
            + params.gravity * (age * t);

        let start_size = lerp(params.min_start_size, params.max_start_size, self.random.y);
        let end_size = lerp(params.min_end_size, params.max_end_size, self.random.y);

        // Fade in quickly, fade out slowly; peaks at ~1 near t = 1/3
        let fade = t * (1.0 - t) * (1.0 - t) * 6.7;
        let mut color = params.min_color.lerp(params.max_color, self.random.w);
        color.a *= fade;

        ParticleSample {
            position,
            size: lerp(start_size, end_size, t),
            color,
            rotation: lerp(params.min_rotate_speed, params.max_rotate_speed, self.random.x) * age,
        }
    }
}

/// Visual state of a particle at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSample {
    /// World position
    pub position: Vec3,
    /// Billboard size
    pub size: f32,
    /// Tinted, faded color
    pub color: Color4,
    /// Billboard rotation in radians
    pub rotation: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_size() {
        // 11 floats, tightly packed for vertex upload
        assert_eq!(Particle::SIZE, 44);
    }

    #[test]
    fn test_evaluate_at_spawn() {
        let params = ParticleSystemParams::default();
        let particle = Particle {
            position: Vec3::new(1.0, 2.0, 3.0),
            velocity: Vec3::new(0.0, 5.0, 0.0),
            max_age: 10.0,
            ..Default::default()
        };

        let sample = particle.evaluate(&params, 10.0);
        assert!(sample.position.abs_diff_eq(particle.position, 1e-6));
        assert!((sample.size - params.min_start_size).abs() < 1e-6);
        assert!(sample.color.a.abs() < 1e-6);
    }

    #[test]
    fn test_evaluate_moves_along_velocity() {
        let params = ParticleSystemParams {
            duration: 2.0,
            end_velocity: 1.0,
            gravity: Vec3::ZERO,
            ..Default::default()
        };
        let particle = Particle {
            velocity: Vec3::new(3.0, 0.0, 0.0),
            ..Default::default()
        };

        // Constant speed: distance = speed * age
        let sample = particle.evaluate(&params, 1.0);
        assert!(sample.position.abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_jitter_components() {
        let params = ParticleSystemParams {
            duration: 2.0,
            duration_randomness: 1.0,
            min_start_size: 1.0,
            max_start_size: 3.0,
            ..Default::default()
        };
        let particle = Particle {
            random: Vec4::new(1.0, 0.5, 0.0, 0.0),
            ..Default::default()
        };

        // x doubles the ageing speed, y picks the middle of the size range
        assert!((particle.age(&params, 1.0) - 2.0).abs() < 1e-6);
        assert!((particle.evaluate(&params, 0.0).size - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalized_age_clamps() {
        let params = ParticleSystemParams::default();
        let particle = Particle::default();
        assert!((particle.normalized_age(&params, 100.0) - 1.0).abs() < f32::EPSILON);
        assert!(particle.normalized_age(&params, -1.0).abs() < f32::EPSILON);
    }
}
