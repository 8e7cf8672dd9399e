//! # Particle System Parameters
//!
//! An immutable snapshot of everything that shapes a particle system.
//! Systems own their snapshot; changing an effect means building a new
//! snapshot (for instance with [`ParticleSystemParams::scaled`]) and handing
//! it over, never mutating one that is bound to a running system.

use ember_core::math::lerp;
use ember_core::{Color4, EngineError, EngineResult, RandomSource, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Blend mode for particle rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleBlendMode {
    /// Additive blending (ONE + ONE) - fire, sparks, explosions.
    /// No sorting needed.
    Additive,
    /// Classic alpha blending - smoke, dust, anything that occludes.
    #[default]
    AlphaBlend,
    /// Pre-multiplied alpha (ONE + ONE_MINUS_SRC_ALPHA)
    Premultiplied,
}

/// Configuration snapshot for a particle system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParticleSystemParams {
    /// Ring capacity (one slot is reserved, so `max_particles - 1` can live)
    pub max_particles: usize,
    /// Particle lifetime in seconds
    pub duration: f32,
    /// Random stretch of each particle's clock: 0 = all the same,
    /// 1 = some particles age up to twice as fast
    pub duration_randomness: f32,
    /// Fraction of the emitter's velocity inherited by new particles
    pub emitter_velocity_sensitivity: f32,
    /// Minimum random horizontal speed added at spawn
    pub min_horizontal_velocity: f32,
    /// Maximum random horizontal speed added at spawn
    pub max_horizontal_velocity: f32,
    /// Minimum random vertical speed added at spawn
    pub min_vertical_velocity: f32,
    /// Maximum random vertical speed added at spawn
    pub max_vertical_velocity: f32,
    /// Constant acceleration
    pub gravity: Vec3,
    /// End speed as a fraction of start speed (1 = constant, 0 = stops)
    pub end_velocity: f32,
    /// Color range lower bound
    pub min_color: Color4,
    /// Color range upper bound
    pub max_color: Color4,
    /// Rotation speed range lower bound (radians/second)
    pub min_rotate_speed: f32,
    /// Rotation speed range upper bound (radians/second)
    pub max_rotate_speed: f32,
    /// Start size range lower bound
    pub min_start_size: f32,
    /// Start size range upper bound
    pub max_start_size: f32,
    /// End size range lower bound
    pub min_end_size: f32,
    /// End size range upper bound
    pub max_end_size: f32,
    /// How particles are composited
    pub blend_mode: ParticleBlendMode,
}

impl Default for ParticleSystemParams {
    fn default() -> Self {
        Self {
            max_particles: 100,
            duration: 1.0,
            duration_randomness: 0.0,
            emitter_velocity_sensitivity: 1.0,
            min_horizontal_velocity: 0.0,
            max_horizontal_velocity: 0.0,
            min_vertical_velocity: 0.0,
            max_vertical_velocity: 0.0,
            gravity: Vec3::ZERO,
            end_velocity: 1.0,
            min_color: Color4::WHITE,
            max_color: Color4::WHITE,
            min_rotate_speed: 0.0,
            max_rotate_speed: 0.0,
            min_start_size: 1.0,
            max_start_size: 1.0,
            min_end_size: 1.0,
            max_end_size: 1.0,
            blend_mode: ParticleBlendMode::AlphaBlend,
        }
    }
}

impl ParticleSystemParams {
    /// Checks the snapshot for values no system can run with.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParams`] naming the first bad field.
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_particles < 2 {
            return Err(EngineError::InvalidParams(format!(
                "max_particles must be at least 2, got {}",
                self.max_particles
            )));
        }
        if !(self.duration > 0.0 && self.duration.is_finite()) {
            return Err(EngineError::InvalidParams(format!(
                "duration must be positive, got {}",
                self.duration
            )));
        }
        if self.duration_randomness < 0.0 {
            return Err(EngineError::InvalidParams(
                "duration_randomness must not be negative".into(),
            ));
        }

        let ranges = [
            ("horizontal_velocity", self.min_horizontal_velocity, self.max_horizontal_velocity),
            ("vertical_velocity", self.min_vertical_velocity, self.max_vertical_velocity),
            ("rotate_speed", self.min_rotate_speed, self.max_rotate_speed),
            ("start_size", self.min_start_size, self.max_start_size),
            ("end_size", self.min_end_size, self.max_end_size),
        ];
        for (name, min, max) in ranges {
            if min > max {
                return Err(EngineError::InvalidParams(format!(
                    "min_{name} ({min}) is greater than max_{name} ({max})"
                )));
            }
        }

        Ok(())
    }

    /// Returns a copy scaled for an effect drawn at `factor` times the size:
    /// sizes, velocities and gravity grow, timing and colors stay.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            min_horizontal_velocity: self.min_horizontal_velocity * factor,
            max_horizontal_velocity: self.max_horizontal_velocity * factor,
            min_vertical_velocity: self.min_vertical_velocity * factor,
            max_vertical_velocity: self.max_vertical_velocity * factor,
            gravity: self.gravity * factor,
            min_start_size: self.min_start_size * factor,
            max_start_size: self.max_start_size * factor,
            min_end_size: self.min_end_size * factor,
            max_end_size: self.max_end_size * factor,
            ..*self
        }
    }

    /// Velocity a new particle starts with, given the emitter's velocity.
    ///
    /// Inherits `emitter_velocity_sensitivity` of the emitter velocity, then
    /// adds a random horizontal push with a random heading and a random
    /// vertical push.
    pub fn spawn_velocity<R: RandomSource + ?Sized>(&self, emitter_velocity: Vec3, rng: &mut R) -> Vec3 {
        let mut velocity = emitter_velocity * self.emitter_velocity_sensitivity;

        let horizontal = lerp(
            self.min_horizontal_velocity,
            self.max_horizontal_velocity,
            rng.next_f32(),
        );
        let heading = rng.next_f32() * std::f32::consts::TAU;
        velocity.x += horizontal * heading.cos();
        velocity.z += horizontal * heading.sin();

        velocity.y += lerp(
            self.min_vertical_velocity,
            self.max_vertical_velocity,
            rng.next_f32(),
        );

        velocity
    }

    /// Fresh jitter vector for a new particle.
    pub fn spawn_random<R: RandomSource + ?Sized>(rng: &mut R) -> Vec4 {
        Vec4::new(rng.next_f32(), rng.next_f32(), rng.next_f32(), rng.next_f32())
    }

    /// Upper bound on how far a particle can end up from its spawn point,
    /// used to size emitter bounds.
    #[must_use]
    pub fn reach(&self, emitter_speed: f32) -> f32 {
        let longest = self.duration * (1.0 + self.duration_randomness);
        let speed = emitter_speed * self.emitter_velocity_sensitivity.abs()
            + self.max_horizontal_velocity.abs().max(self.min_horizontal_velocity.abs())
            + self.max_vertical_velocity.abs().max(self.min_vertical_velocity.abs());
        let size = self.max_start_size.max(self.max_end_size);
        speed * longest * self.end_velocity.max(1.0) + self.gravity.length() * longest * longest + size
    }

    // =========================================================================
    // PRESETS
    // =========================================================================

    /// Rising additive flames.
    #[must_use]
    pub fn fire() -> Self {
        Self {
            max_particles: 2400,
            duration: 2.0,
            duration_randomness: 1.0,
            min_horizontal_velocity: 0.0,
            max_horizontal_velocity: 15.0,
            min_vertical_velocity: -10.0,
            max_vertical_velocity: 10.0,
            gravity: Vec3::new(0.0, 15.0, 0.0),
            min_color: Color4::new(1.0, 1.0, 1.0, 10.0 / 255.0),
            max_color: Color4::new(1.0, 1.0, 1.0, 40.0 / 255.0),
            min_start_size: 5.0,
            max_start_size: 10.0,
            min_end_size: 10.0,
            max_end_size: 40.0,
            blend_mode: ParticleBlendMode::Additive,
            ..Self::default()
        }
    }

    /// Slow, wind-blown, alpha-blended smoke plume.
    #[must_use]
    pub fn smoke() -> Self {
        Self {
            max_particles: 600,
            duration: 10.0,
            min_horizontal_velocity: 0.0,
            max_horizontal_velocity: 15.0,
            min_vertical_velocity: 10.0,
            max_vertical_velocity: 20.0,
            gravity: Vec3::new(-20.0, -5.0, 0.0),
            end_velocity: 0.75,
            min_rotate_speed: -1.0,
            max_rotate_speed: 1.0,
            min_start_size: 4.0,
            max_start_size: 7.0,
            min_end_size: 35.0,
            max_end_size: 140.0,
            ..Self::default()
        }
    }

    /// Short additive burst that stops dead.
    #[must_use]
    pub fn explosion() -> Self {
        Self {
            max_particles: 100,
            duration: 2.0,
            duration_randomness: 1.0,
            min_horizontal_velocity: 20.0,
            max_horizontal_velocity: 30.0,
            min_vertical_velocity: -20.0,
            max_vertical_velocity: 20.0,
            end_velocity: 0.0,
            min_color: Color4::new(0.66, 0.66, 0.66, 1.0),
            max_color: Color4::new(0.5, 0.5, 0.5, 1.0),
            min_rotate_speed: -1.0,
            max_rotate_speed: 1.0,
            min_start_size: 10.0,
            max_start_size: 10.0,
            min_end_size: 100.0,
            max_end_size: 200.0,
            blend_mode: ParticleBlendMode::Additive,
            ..Self::default()
        }
    }

    /// Thin trail left behind a moving emitter.
    #[must_use]
    pub fn projectile_trail() -> Self {
        Self {
            max_particles: 1000,
            duration: 3.0,
            duration_randomness: 1.5,
            emitter_velocity_sensitivity: 0.1,
            min_horizontal_velocity: 0.0,
            max_horizontal_velocity: 1.0,
            min_vertical_velocity: -1.0,
            max_vertical_velocity: 1.0,
            min_color: Color4::new(0.25, 0.25, 0.25, 0.25),
            max_color: Color4::new(1.0, 1.0, 1.0, 0.5),
            min_rotate_speed: -4.0,
            max_rotate_speed: 4.0,
            min_start_size: 1.0,
            max_start_size: 3.0,
            min_end_size: 4.0,
            max_end_size: 11.0,
            ..Self::default()
        }
    }

    /// Low, drifting ground dust.
    #[must_use]
    pub fn dust() -> Self {
        Self {
            max_particles: 400,
            duration: 4.0,
            duration_randomness: 0.5,
            min_horizontal_velocity: 0.5,
            max_horizontal_velocity: 2.0,
            min_vertical_velocity: 0.0,
            max_vertical_velocity: 0.5,
            gravity: Vec3::new(0.0, -0.2, 0.0),
            end_velocity: 0.2,
            min_color: Color4::new(0.55, 0.45, 0.35, 0.3),
            max_color: Color4::new(0.7, 0.6, 0.5, 0.6),
            min_rotate_speed: -0.5,
            max_rotate_speed: 0.5,
            min_start_size: 0.5,
            max_start_size: 1.0,
            min_end_size: 2.0,
            max_end_size: 4.0,
            ..Self::default()
        }
    }
}

impl std::ops::Mul<f32> for ParticleSystemParams {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        self.scaled(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::{Seed, SeededRandom};

    #[test]
    fn test_presets_validate() {
        for params in [
            ParticleSystemParams::default(),
            ParticleSystemParams::fire(),
            ParticleSystemParams::smoke(),
            ParticleSystemParams::explosion(),
            ParticleSystemParams::projectile_trail(),
            ParticleSystemParams::dust(),
        ] {
            params.validate().unwrap();
        }
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let params = ParticleSystemParams {
            min_start_size: 5.0,
            max_start_size: 1.0,
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("start_size"));
    }

    #[test]
    fn test_validate_rejects_tiny_ring() {
        let params = ParticleSystemParams {
            max_particles: 1,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(EngineError::InvalidParams(_))));
    }

    #[test]
    fn test_scale_leaves_original_untouched() {
        let fire = ParticleSystemParams::fire();
        let big = fire * 2.0;
        assert!((big.max_end_size - 80.0).abs() < f32::EPSILON);
        assert!((big.gravity.y - 30.0).abs() < f32::EPSILON);
        assert!((big.duration - fire.duration).abs() < f32::EPSILON);
        assert!((fire.max_end_size - 40.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_spawn_velocity_ranges() {
        let params = ParticleSystemParams {
            emitter_velocity_sensitivity: 0.5,
            min_horizontal_velocity: 1.0,
            max_horizontal_velocity: 2.0,
            min_vertical_velocity: 3.0,
            max_vertical_velocity: 4.0,
            ..Default::default()
        };
        let mut rng = SeededRandom::new(Seed::new(1));
        for _ in 0..500 {
            let v = params.spawn_velocity(Vec3::new(0.0, 2.0, 0.0), &mut rng);
            let horizontal = (v.x * v.x + v.z * v.z).sqrt();
            assert!((0.999..2.001).contains(&horizontal));
            // 0.5 * 2.0 inherited + [3, 4)
            assert!((4.0..5.0).contains(&v.y));
        }
    }

    #[test]
    fn test_params_from_toml() {
        let params: ParticleSystemParams = ember_core::config::parse_toml(
            r#"
            max_particles = 64
            duration = 3.0
            blend_mode = "additive"
            gravity = { x = 0.0, y = -9.8, z = 0.0 }
            "#,
        )
        .unwrap();
        assert_eq!(params.max_particles, 64);
        assert_eq!(params.blend_mode, ParticleBlendMode::Additive);
        assert!((params.gravity.y + 9.8).abs() < 1e-6);
        assert!((params.end_velocity - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_params_reject_unknown_fields() {
        let result: EngineResult<ParticleSystemParams> =
            ember_core::config::parse_toml("max_particle = 64");
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
