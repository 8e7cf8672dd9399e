//! # Scenarios
//!
//! A scenario file puts the pieces together: emitters travelling along
//! bezier paths, a terrain node and the foliage channels scattered over it.
//!
//! ```toml
//! seed = 42
//! frames = 600
//!
//! [terrain]
//! kind = "flat"
//! min = { x = 0.0, y = 0.0, z = 0.0 }
//! max = { x = 64.0, y = 8.0, z = 64.0 }
//!
//! [[emitters]]
//! name = "torch"
//! effect = "fire"
//! rate = 120.0
//! speed = 4.0
//! path = [{ x = 8.0, y = 1.0, z = 8.0 }, { x = 56.0, y = 1.0, z = 32.0 }]
//!
//! [[foliage]]
//! name = "grass"
//! density = 0.5
//! min_size = { x = 0.4, y = 0.5 }
//! max_size = { x = 0.8, y = 1.2 }
//! ```
//!
//! Running a scenario steps every emitter for a fixed number of frames
//! through the CPU ring, the stream-out system on the software device, or
//! both, and plants every foliage channel once.

use std::fmt;
use std::path::{Path, PathBuf};

use ember_core::config::{load_toml, parse_toml};
use ember_core::{BoundingBox, Color4, EngineError, EngineResult, Seed, SeededRandom, Vec3};
use ember_effects::{
    CpuParticleSystem, EffectLibrary, Emitter, ParticleStats, ParticleSystemParams, SoftwareStreamOut,
    StreamOutParticleSystem,
};
use ember_procedural::{
    BezierPath, DensityMap, FoliageChannel, FoliageChannelConfig, FoliageGeometry, FoliagePatch, GroundMesh,
    PlantStats,
};
use serde::Deserialize;

/// Fixed step used when a scenario does not set one (60 FPS).
pub const DEFAULT_FRAME_TIME: f32 = 1.0 / 60.0;

/// Frames run when neither the scenario nor the caller sets a count.
pub const DEFAULT_FRAMES: usize = 600;

/// Seed purposes, so emitters and foliage never share a random stream.
const EMITTER_SEED_PURPOSE: u64 = 0xE3;
const FOLIAGE_SEED_PURPOSE: u64 = 0xF0;

/// Distance under which a path's ends count as the same point.
const CLOSED_PATH_EPSILON: f32 = 1e-3;

/// Progress is logged once per this many frames.
const LOG_INTERVAL_FRAMES: usize = 60;

// =============================================================================
// CONFIG
// =============================================================================

/// Scenario file contents.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Seed for every random stream in the scenario
    #[serde(default)]
    pub seed: u64,
    /// Seconds per frame
    #[serde(default = "default_frame_time")]
    pub frame_time: f32,
    /// Frames to run
    #[serde(default = "default_frames")]
    pub frames: usize,
    /// Effect library to load on top of the built-in presets, relative to
    /// the scenario file
    #[serde(default)]
    pub effects: Option<PathBuf>,
    /// The terrain node
    pub terrain: TerrainConfig,
    /// Optional foliage density map over the terrain node
    #[serde(default)]
    pub density_map: Option<DensityMapConfig>,
    /// Particle emitters
    #[serde(default)]
    pub emitters: Vec<EmitterConfig>,
    /// Foliage channels
    #[serde(default)]
    pub foliage: Vec<FoliageChannelConfig>,
}

fn default_frame_time() -> f32 {
    DEFAULT_FRAME_TIME
}

fn default_frames() -> usize {
    DEFAULT_FRAMES
}

/// Terrain shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainKind {
    /// Level ground at `height`
    Flat,
    /// Ground rising by `slope` per unit of X from `height`
    Ramp,
}

/// Terrain node configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerrainConfig {
    /// Terrain shape
    pub kind: TerrainKind,
    /// Node minimum corner
    pub min: Vec3,
    /// Node maximum corner
    pub max: Vec3,
    /// Grid quads per side
    #[serde(default = "default_resolution")]
    pub resolution: usize,
    /// Ground height (at `min.x` for a ramp)
    #[serde(default)]
    pub height: f32,
    /// Rise per unit of X, ramps only
    #[serde(default)]
    pub slope: f32,
}

fn default_resolution() -> usize {
    16
}

/// Density map given inline as RGBA texels, row-major.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DensityMapConfig {
    /// Width in texels
    pub width: usize,
    /// Height in texels
    pub height: usize,
    /// `width * height` RGBA densities in `[0, 1]`
    pub texels: Vec<[f32; 4]>,
}

/// Which particle systems an emitter feeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleVariant {
    /// CPU ring only
    Cpu,
    /// Stream-out system only
    StreamOut,
    /// Both, side by side
    #[default]
    Both,
}

impl ParticleVariant {
    const fn cpu(self) -> bool {
        matches!(self, Self::Cpu | Self::Both)
    }

    const fn stream_out(self) -> bool {
        matches!(self, Self::StreamOut | Self::Both)
    }
}

/// Emitter configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmitterConfig {
    /// Emitter name, for logs
    pub name: String,
    /// Effect name in the library
    pub effect: String,
    /// Particles per second
    pub rate: f32,
    /// Effect scale, see [`ParticleSystemParams::scaled`]
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Units per second along the path. A path that ends where it starts
    /// is looped; any other path is walked back and forth.
    #[serde(default)]
    pub speed: f32,
    /// Polyline the emitter follows (one point for a static emitter)
    pub path: Vec<Vec3>,
    /// Bezier tangent scale of the path
    #[serde(default = "default_path_scale")]
    pub path_scale: f32,
    /// Seconds after which the emitter stops
    #[serde(default)]
    pub lifetime: Option<f32>,
    /// Which particle systems to run
    #[serde(default)]
    pub variant: ParticleVariant,
}

fn default_scale() -> f32 {
    1.0
}

fn default_path_scale() -> f32 {
    0.3
}

// =============================================================================
// SCENARIO
// =============================================================================

#[derive(Debug, Clone)]
struct EmitterSetup {
    name: String,
    effect: String,
    params: ParticleSystemParams,
    rate: f32,
    speed: f32,
    start: Vec3,
    path: BezierPath,
    /// Last point equals the first, so wrapping around is seamless
    closed: bool,
    lifetime: Option<f32>,
    variant: ParticleVariant,
}

impl EmitterSetup {
    fn from_config(config: EmitterConfig, library: &EffectLibrary) -> EngineResult<Self> {
        let Some(&start) = config.path.first() else {
            return Err(EngineError::InvalidParams(format!(
                "emitter '{}': path needs at least one point",
                config.name
            )));
        };
        if config.rate < 0.0 || config.speed < 0.0 {
            return Err(EngineError::InvalidParams(format!(
                "emitter '{}': rate and speed must not be negative",
                config.name
            )));
        }

        let params = library.scaled(&config.effect, config.scale)?;
        let closed = config.path.len() > 2
            && config
                .path
                .last()
                .is_some_and(|&end| end.distance_squared(start) <= CLOSED_PATH_EPSILON * CLOSED_PATH_EPSILON);
        Ok(Self {
            name: config.name,
            effect: config.effect,
            params,
            rate: config.rate,
            speed: config.speed,
            start,
            path: BezierPath::from_points(&config.path, config.path_scale),
            closed,
            lifetime: config.lifetime,
            variant: config.variant,
        })
    }

    /// Where the emitter is after `seconds`. The position never jumps:
    /// closed paths wrap onto themselves, open paths turn around at the ends.
    fn position_at(&self, seconds: f32) -> Vec3 {
        let length = self.path.length();
        if self.speed <= 0.0 || length <= 0.0 {
            return self.start;
        }
        let travelled = seconds * self.speed;
        let distance = if self.closed {
            travelled.rem_euclid(length)
        } else {
            let phase = travelled.rem_euclid(2.0 * length);
            if phase > length {
                2.0 * length - phase
            } else {
                phase
            }
        };
        self.path.position(distance).unwrap_or(self.start)
    }

    fn emitter(&self) -> Emitter {
        let emitter = Emitter::new(self.start, self.rate, self.params.duration)
            .with_reach(self.params.reach(self.speed));
        match self.lifetime {
            Some(lifetime) => emitter.with_lifetime(lifetime),
            None => emitter,
        }
    }
}

/// A validated scenario, ready to run.
#[derive(Debug, Clone)]
pub struct Scenario {
    seed: Seed,
    frame_time: f32,
    frames: usize,
    node: BoundingBox,
    ground: GroundMesh,
    density_map: Option<DensityMap>,
    emitters: Vec<EmitterSetup>,
    foliage: Vec<FoliageChannel>,
}

impl Scenario {
    /// Parses a scenario. An `effects` path is resolved against the
    /// working directory.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML, unknown effects or geometries and invalid
    /// values.
    pub fn from_toml_str(source: &str) -> EngineResult<Self> {
        let config: ScenarioConfig = parse_toml(source)?;
        Self::from_config(config, None)
    }

    /// Loads a scenario file. An `effects` path is resolved against the
    /// scenario file's directory.
    ///
    /// # Errors
    ///
    /// Fails if the file (or its effect library) cannot be read, or for
    /// anything [`Scenario::from_toml_str`] rejects.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let config: ScenarioConfig = load_toml(path)?;
        let scenario = Self::from_config(config, path.parent())?;
        tracing::info!(
            "Loaded scenario {}: {} emitters, {} foliage channels",
            path.display(),
            scenario.emitters.len(),
            scenario.foliage.len()
        );
        Ok(scenario)
    }

    /// Validates a config, loading its effect library relative to
    /// `base_dir` when given.
    ///
    /// # Errors
    ///
    /// See [`Scenario::from_toml_str`].
    pub fn from_config(config: ScenarioConfig, base_dir: Option<&Path>) -> EngineResult<Self> {
        if !(config.frame_time > 0.0 && config.frame_time.is_finite()) {
            return Err(EngineError::InvalidParams(format!(
                "frame_time must be positive, got {}",
                config.frame_time
            )));
        }

        let library = match &config.effects {
            Some(file) => EffectLibrary::load(base_dir.map_or_else(|| file.clone(), |dir| dir.join(file)))?,
            None => EffectLibrary::builtin(),
        };

        let terrain = &config.terrain;
        let area = BoundingBox::new(terrain.min, terrain.max);
        if area.size().x <= 0.0 || area.size().z <= 0.0 {
            return Err(EngineError::InvalidParams(
                "terrain min must be below max on X and Z".into(),
            ));
        }
        let ground = match terrain.kind {
            TerrainKind::Flat => GroundMesh::flat(&area, terrain.resolution, terrain.height),
            TerrainKind::Ramp => GroundMesh::ramp(&area, terrain.resolution, terrain.height, terrain.slope),
        };
        // The node must contain the ground for top-down raycasts to start above it
        let mut node = area;
        if let Some(bounds) = ground.bounds() {
            node.include(bounds.min);
            node.include(bounds.max);
        }

        let density_map = config
            .density_map
            .map(|map| {
                let texels = map
                    .texels
                    .iter()
                    .map(|&[r, g, b, a]| Color4::new(r, g, b, a))
                    .collect();
                DensityMap::new(map.width, map.height, texels)
            })
            .transpose()?;

        let emitters = config
            .emitters
            .into_iter()
            .map(|emitter| EmitterSetup::from_config(emitter, &library))
            .collect::<EngineResult<Vec<_>>>()?;

        let foliage = config
            .foliage
            .into_iter()
            .map(FoliageChannel::from_config)
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(Self {
            seed: Seed::new(config.seed),
            frame_time: config.frame_time,
            frames: config.frames,
            node,
            ground,
            density_map,
            emitters,
            foliage,
        })
    }

    /// Scenario seed.
    #[must_use]
    pub fn seed(&self) -> Seed {
        self.seed
    }

    /// Seconds per frame.
    #[must_use]
    pub fn frame_time(&self) -> f32 {
        self.frame_time
    }

    /// Frames the scenario asks for.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// The terrain node, grown to contain the ground.
    #[must_use]
    pub fn node_bounds(&self) -> BoundingBox {
        self.node
    }

    /// The terrain mesh.
    #[must_use]
    pub fn ground(&self) -> &GroundMesh {
        &self.ground
    }

    /// Number of emitters.
    #[must_use]
    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    /// Validated foliage channels.
    #[must_use]
    pub fn foliage_channels(&self) -> &[FoliageChannel] {
        &self.foliage
    }

    /// Plants every foliage channel over the terrain node.
    #[must_use]
    pub fn plant_foliage(&self) -> Vec<FoliagePatch> {
        let seed = self.seed.derive(FOLIAGE_SEED_PURPOSE);
        self.foliage
            .iter()
            .enumerate()
            .map(|(index, channel)| {
                let mut patch = FoliagePatch::new();
                patch.plant(
                    &self.node,
                    &self.ground,
                    self.density_map.as_ref(),
                    channel,
                    seed.derive(index as u64),
                );
                patch
            })
            .collect()
    }

    /// Runs the scenario for `frames` frames (the scenario's own count if
    /// `None`).
    ///
    /// # Errors
    ///
    /// Fails if a particle system cannot be created or the stream-out
    /// device rejects a step.
    pub fn run(&self, frames: Option<usize>) -> EngineResult<ScenarioSummary> {
        let frames = frames.unwrap_or(self.frames);
        let dt = self.frame_time;

        tracing::info!(
            "Running scenario: {} frames of {:.4}s, {} emitters, {} foliage channels",
            frames,
            dt,
            self.emitters.len(),
            self.foliage.len()
        );

        let patches = self.plant_foliage();
        let foliage = self
            .foliage
            .iter()
            .zip(&patches)
            .map(|(channel, patch)| FoliageSummary {
                name: channel.name.clone(),
                geometry: channel.geometry,
                stats: patch.stats(),
            })
            .collect();

        let mut runs = self
            .emitters
            .iter()
            .enumerate()
            .map(|(index, setup)| EmitterRun::new(setup, self.seed.derive(EMITTER_SEED_PURPOSE).derive(index as u64)))
            .collect::<EngineResult<Vec<_>>>()?;

        for frame in 0..frames {
            let seconds = (frame + 1) as f32 * dt;
            for (setup, run) in self.emitters.iter().zip(&mut runs) {
                run.step(dt, setup.position_at(seconds))?;
            }

            if (frame + 1) % LOG_INTERVAL_FRAMES == 0 {
                let live: usize = runs.iter().map(EmitterRun::live).sum();
                tracing::debug!("Frame {}: {} live particles", frame + 1, live);
            }
        }

        let emitters: Vec<EmitterSummary> = self
            .emitters
            .iter()
            .zip(&runs)
            .map(|(setup, run)| run.summary(setup))
            .collect();

        for emitter in &emitters {
            if let Some(cpu) = &emitter.cpu {
                if cpu.dropped_total > 0 {
                    tracing::warn!(
                        "Emitter '{}' dropped {} particles: ring of {} saturated",
                        emitter.name,
                        cpu.dropped_total,
                        cpu.capacity
                    );
                }
            }
        }

        let summary = ScenarioSummary {
            frames,
            simulated_seconds: frames as f32 * dt,
            emitters,
            foliage,
        };
        tracing::info!(
            "Scenario done: {} live particles, {} foliage instances",
            summary.live_particles(),
            summary.planted()
        );
        Ok(summary)
    }
}

// =============================================================================
// RUNNER
// =============================================================================

struct CpuRun {
    system: CpuParticleSystem,
    emitter: Emitter,
    rng: SeededRandom,
}

struct StreamOutRun {
    device: SoftwareStreamOut,
    system: StreamOutParticleSystem,
    emitter: Emitter,
}

struct EmitterRun {
    cpu: Option<CpuRun>,
    stream_out: Option<StreamOutRun>,
}

impl EmitterRun {
    fn new(setup: &EmitterSetup, seed: Seed) -> EngineResult<Self> {
        let cpu = if setup.variant.cpu() {
            Some(CpuRun {
                system: CpuParticleSystem::new(setup.params)?,
                emitter: setup.emitter(),
                rng: SeededRandom::new(seed.derive(0)),
            })
        } else {
            None
        };

        let stream_out = if setup.variant.stream_out() {
            let mut device = SoftwareStreamOut::new(seed.derive(1));
            let system = StreamOutParticleSystem::new(&mut device, setup.params, setup.start)?;
            Some(StreamOutRun {
                device,
                system,
                emitter: setup.emitter(),
            })
        } else {
            None
        };

        Ok(Self { cpu, stream_out })
    }

    fn step(&mut self, dt: f32, position: Vec3) -> EngineResult<()> {
        if let Some(cpu) = &mut self.cpu {
            cpu.system.emit(&mut cpu.emitter, dt, position, &mut cpu.rng);
            let _ = cpu.system.flush_new_particles();
            cpu.system.update(dt);
        }
        if let Some(gpu) = &mut self.stream_out {
            gpu.emitter.track(dt, position);
            gpu.system.simulate(&mut gpu.device, dt, &gpu.emitter)?;
        }
        Ok(())
    }

    fn live(&self) -> usize {
        let cpu = self.cpu.as_ref().map_or(0, |cpu| cpu.system.active_particles());
        let gpu = self
            .stream_out
            .as_ref()
            .map_or(0, |gpu| gpu.device.particle_count(gpu.system.drawing_buffer()));
        cpu + gpu
    }

    fn summary(&self, setup: &EmitterSetup) -> EmitterSummary {
        EmitterSummary {
            name: setup.name.clone(),
            effect: setup.effect.clone(),
            cpu: self.cpu.as_ref().map(|cpu| cpu.system.stats()),
            stream_out: self.stream_out.as_ref().map(|gpu| {
                let stats = gpu.device.stats();
                StreamOutSummary {
                    live: gpu.device.particle_count(gpu.system.drawing_buffer()),
                    emitted: stats.particles_emitted,
                    dropped: stats.particles_dropped,
                }
            }),
        }
    }
}

// =============================================================================
// SUMMARY
// =============================================================================

/// End state of a stream-out system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOutSummary {
    /// Particles in the drawing buffer
    pub live: usize,
    /// Particles spawned over the run
    pub emitted: u64,
    /// Vertices lost to a full output buffer
    pub dropped: u64,
}

/// End state of one emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterSummary {
    /// Emitter name
    pub name: String,
    /// Effect name
    pub effect: String,
    /// CPU ring counters, if the CPU variant ran
    pub cpu: Option<ParticleStats>,
    /// Stream-out counters, if that variant ran
    pub stream_out: Option<StreamOutSummary>,
}

/// Planting result of one foliage channel.
#[derive(Debug, Clone, PartialEq)]
pub struct FoliageSummary {
    /// Channel name
    pub name: String,
    /// Instance geometry
    pub geometry: FoliageGeometry,
    /// Planting counts
    pub stats: PlantStats,
}

/// Outcome of [`Scenario::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSummary {
    /// Frames run
    pub frames: usize,
    /// Seconds simulated
    pub simulated_seconds: f32,
    /// Per-emitter results
    pub emitters: Vec<EmitterSummary>,
    /// Per-channel results
    pub foliage: Vec<FoliageSummary>,
}

impl ScenarioSummary {
    /// Live particles across every emitter and variant.
    #[must_use]
    pub fn live_particles(&self) -> usize {
        self.emitters
            .iter()
            .map(|e| e.cpu.map_or(0, |c| c.live as usize) + e.stream_out.map_or(0, |s| s.live))
            .sum()
    }

    /// Foliage instances across every channel.
    #[must_use]
    pub fn planted(&self) -> usize {
        self.foliage.iter().map(|f| f.stats.planted).sum()
    }
}

impl fmt::Display for ScenarioSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} frames ({:.2}s simulated)", self.frames, self.simulated_seconds)?;

        for emitter in &self.emitters {
            writeln!(f, "emitter {} ({})", emitter.name, emitter.effect)?;
            if let Some(cpu) = &emitter.cpu {
                writeln!(
                    f,
                    "  cpu:        live {:>6}  added {:>8}  dropped {:>6}  retired {:>8}",
                    cpu.live, cpu.added_total, cpu.dropped_total, cpu.retired_total
                )?;
            }
            if let Some(gpu) = &emitter.stream_out {
                writeln!(
                    f,
                    "  stream-out: live {:>6}  emitted {:>6}  dropped {:>6}",
                    gpu.live, gpu.emitted, gpu.dropped
                )?;
            }
        }

        for channel in &self.foliage {
            writeln!(
                f,
                "foliage {} ({}): planted {} of {} candidates",
                channel.name, channel.geometry, channel.stats.planted, channel.stats.candidates
            )?;
        }
        Ok(())
    }
}
