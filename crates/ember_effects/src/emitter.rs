//! # Particle Emitter
//!
//! Turns a moving point and a rate into a steady stream of spawn requests.
//!
//! The emitter is the authority on whether an effect is still relevant:
//! after it stops emitting it stays "active" until the last particle it
//! spawned has had time to die.

use ember_core::{BoundingBox, Vec3};

/// Most spawns a single update issues. Time owed beyond this is dropped
/// rather than carried, so a huge rate cannot stall a frame.
pub const MAX_SPAWNS_PER_UPDATE: usize = 4096;

/// A spawn request produced by an emitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spawn {
    /// Where the particle starts
    pub position: Vec3,
    /// Emitter velocity at the time of the spawn
    pub velocity: Vec3,
}

/// Continuous particle emitter.
#[derive(Debug, Clone)]
pub struct Emitter {
    position: Vec3,
    previous_position: Vec3,
    velocity: Vec3,
    /// Seconds between two spawns
    interval: f32,
    /// Fraction of an interval carried over from the last update
    time_left_over: f32,
    total_time: f32,
    /// Emission stops on its own once `total_time` reaches this
    lifetime: Option<f32>,
    active: bool,
    time_to_end: f32,
    particle_duration: f32,
    reach: f32,
}

impl Emitter {
    /// Creates an emitter spawning `rate` particles per second at `position`.
    ///
    /// `particle_duration` is the lifetime of the particles this emitter
    /// feeds; it sets how long the emitter stays relevant after stopping.
    #[must_use]
    pub fn new(position: Vec3, rate: f32, particle_duration: f32) -> Self {
        Self {
            position,
            previous_position: position,
            velocity: Vec3::ZERO,
            interval: if rate > 0.0 { 1.0 / rate } else { f32::INFINITY },
            time_left_over: 0.0,
            total_time: 0.0,
            lifetime: None,
            active: true,
            time_to_end: 0.0,
            particle_duration,
            reach: 0.0,
        }
    }

    /// Stops emission automatically after `lifetime` seconds.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: f32) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Sets how far particles can travel from the emitter path (see
    /// [`crate::ParticleSystemParams::reach`]); used by [`Emitter::bounds`].
    #[must_use]
    pub fn with_reach(mut self, reach: f32) -> Self {
        self.reach = reach;
        self
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Velocity measured over the last update.
    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Seconds the emitter has been simulated.
    #[must_use]
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Seconds between spawns (infinite for a zero rate).
    #[must_use]
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Whether the emitter is still producing particles.
    #[must_use]
    pub fn is_emitting(&self) -> bool {
        self.active
    }

    /// Whether the effect still matters: emitting, or particles still alive.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active || self.time_to_end > 0.0
    }

    /// Stops emitting; the emitter stays active for one particle lifetime.
    pub fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.time_to_end = self.particle_duration;
        }
    }

    /// Changes the emission rate (particles per second).
    pub fn set_rate(&mut self, rate: f32) {
        self.interval = if rate > 0.0 { 1.0 / rate } else { f32::INFINITY };
    }

    /// Box around the path travelled in the last update, grown by the reach.
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        let mut bounds = BoundingBox::new(self.previous_position, self.previous_position);
        bounds.include(self.position);
        let pad = Vec3::new(self.reach, self.reach, self.reach);
        BoundingBox::new(bounds.min - pad, bounds.max + pad)
    }

    /// Advances the emitter by `elapsed` seconds while it moves to
    /// `new_position`, calling `spawn` once per particle due.
    ///
    /// Spawn positions are interpolated along the segment travelled, so fast
    /// emitters leave an even trail instead of clumps.
    ///
    /// Returns the number of spawns issued, at most
    /// [`MAX_SPAWNS_PER_UPDATE`].
    pub fn update(&mut self, elapsed: f32, new_position: Vec3, mut spawn: impl FnMut(Spawn)) -> usize {
        self.previous_position = self.position;
        self.position = new_position;

        if elapsed <= 0.0 {
            return 0;
        }

        self.total_time += elapsed;
        self.velocity = (new_position - self.previous_position) / elapsed;

        if !self.active {
            self.time_to_end = (self.time_to_end - elapsed).max(0.0);
            return 0;
        }

        let mut issued = 0;
        let mut time_to_spend = self.time_left_over + elapsed;
        let mut current_time = -self.time_left_over;

        while time_to_spend > self.interval && issued < MAX_SPAWNS_PER_UPDATE {
            current_time += self.interval;
            time_to_spend -= self.interval;

            let mu = current_time / elapsed;
            spawn(Spawn {
                position: self.previous_position.lerp(new_position, mu),
                velocity: self.velocity,
            });
            issued += 1;
        }
        self.time_left_over = if issued < MAX_SPAWNS_PER_UPDATE {
            time_to_spend
        } else {
            0.0
        };

        if let Some(lifetime) = self.lifetime {
            if self.total_time >= lifetime {
                self.stop();
            }
        }

        issued
    }

    /// Advances the emitter without issuing spawns, for systems that spawn
    /// on the device from the emitter's rate instead.
    pub fn track(&mut self, elapsed: f32, new_position: Vec3) {
        self.update(elapsed, new_position, |_| {});
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_over_time() {
        let mut emitter = Emitter::new(Vec3::ZERO, 10.0, 1.0);
        let mut count = 0;
        for _ in 0..100 {
            count += emitter.update(0.01, Vec3::ZERO, |_| {});
        }
        // 10/s for one second; the strict comparison may hold back the last
        assert!((9..=10).contains(&count), "spawned {count}");
    }

    #[test]
    fn test_spawns_interpolate_along_path() {
        let mut emitter = Emitter::new(Vec3::ZERO, 4.0, 1.0);
        let mut spawns = Vec::new();
        emitter.update(1.0, Vec3::new(4.0, 0.0, 0.0), |s| spawns.push(s));

        assert_eq!(spawns.len(), 3);
        assert!(spawns[0].position.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));
        assert!(spawns[2].position.abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-5));
        assert!(spawns[0].velocity.abs_diff_eq(Vec3::new(4.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_active_until_particles_die() {
        let mut emitter = Emitter::new(Vec3::ZERO, 10.0, 2.0);
        emitter.stop();
        assert!(!emitter.is_emitting());
        assert!(emitter.is_active());

        assert_eq!(emitter.update(1.5, Vec3::ZERO, |_| {}), 0);
        assert!(emitter.is_active());
        emitter.update(0.5, Vec3::ZERO, |_| {});
        assert!(!emitter.is_active());
    }

    #[test]
    fn test_lifetime_stops_emission() {
        let mut emitter = Emitter::new(Vec3::ZERO, 10.0, 1.0).with_lifetime(0.5);
        emitter.update(0.25, Vec3::ZERO, |_| {});
        assert!(emitter.is_emitting());
        emitter.update(0.25, Vec3::ZERO, |_| {});
        assert!(!emitter.is_emitting());
        assert!(emitter.is_active());
    }

    #[test]
    fn test_bounds_cover_path_and_reach() {
        let mut emitter = Emitter::new(Vec3::ZERO, 0.0, 1.0).with_reach(2.0);
        emitter.update(0.1, Vec3::new(5.0, 0.0, 0.0), |_| {});
        let bounds = emitter.bounds();
        assert!(bounds.contains(Vec3::new(-2.0, 2.0, 0.0)));
        assert!(bounds.contains(Vec3::new(7.0, -2.0, 0.0)));
        assert!(!bounds.contains(Vec3::new(7.5, 0.0, 0.0)));
    }

    #[test]
    fn test_huge_rate_is_capped() {
        let mut emitter = Emitter::new(Vec3::ZERO, 1e12, 1.0);
        assert_eq!(emitter.update(1.0, Vec3::ZERO, |_| {}), MAX_SPAWNS_PER_UPDATE);
        // The backlog is not carried into the next step
        let next = emitter.update(1e-9, Vec3::ZERO, |_| {});
        assert!((900..1100).contains(&next), "spawned {next}");
    }
}
