//! Foliage channel configuration.
//!
//! ```toml
//! [[foliage]]
//! name = "grass"
//! density = 0.6
//! map_channel = 0
//! min_size = { x = 0.4, y = 0.5 }
//! max_size = { x = 0.8, y = 1.2 }
//! geometry = "cross"
//! ```

use std::fmt;
use std::str::FromStr;

use ember_core::{EngineError, EngineResult, Vec2};
use serde::{Deserialize, Serialize};

/// How a foliage instance is expanded into triangles at draw time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FoliageGeometry {
    /// One camera-facing quad
    #[default]
    Billboard,
    /// Two crossed vertical quads
    Cross,
    /// Three quads at 60 degrees
    Star,
}

impl FoliageGeometry {
    /// Quads emitted per instance.
    #[must_use]
    pub const fn quad_count(self) -> usize {
        match self {
            Self::Billboard => 1,
            Self::Cross => 2,
            Self::Star => 3,
        }
    }

    /// Config name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Billboard => "billboard",
            Self::Cross => "cross",
            Self::Star => "star",
        }
    }
}

impl FromStr for FoliageGeometry {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "billboard" => Ok(Self::Billboard),
            "cross" => Ok(Self::Cross),
            "star" => Ok(Self::Star),
            _ => Err(EngineError::UnknownGeometry(s.to_owned())),
        }
    }
}

impl fmt::Display for FoliageGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw channel entry as written in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FoliageChannelConfig {
    /// Channel name, for logs
    pub name: String,
    /// Fraction of the patch capacity to try to place, `[0, 1]`
    pub density: f32,
    /// Density-map channel (0 = r .. 3 = a)
    #[serde(default)]
    pub map_channel: usize,
    /// Smallest instance (width, height)
    pub min_size: Vec2,
    /// Largest instance (width, height)
    pub max_size: Vec2,
    /// Geometry name, see [`FoliageGeometry`]
    #[serde(default = "default_geometry")]
    pub geometry: String,
}

fn default_geometry() -> String {
    FoliageGeometry::Billboard.name().to_owned()
}

/// A validated foliage channel.
#[derive(Debug, Clone, PartialEq)]
pub struct FoliageChannel {
    /// Channel name
    pub name: String,
    /// Fraction of the patch capacity to try to place, `[0, 1]`
    pub density: f32,
    /// Density-map channel
    pub map_channel: usize,
    /// Smallest instance (width, height)
    pub min_size: Vec2,
    /// Largest instance (width, height)
    pub max_size: Vec2,
    /// Instance geometry
    pub geometry: FoliageGeometry,
}

impl FoliageChannel {
    /// Creates a billboard channel on map channel 0.
    #[must_use]
    pub fn new(name: impl Into<String>, density: f32, min_size: Vec2, max_size: Vec2) -> Self {
        Self {
            name: name.into(),
            density,
            map_channel: 0,
            min_size,
            max_size,
            geometry: FoliageGeometry::Billboard,
        }
    }

    /// Validates a config entry.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownGeometry`] for an unrecognised geometry
    /// name and [`EngineError::InvalidParams`] for out-of-range values.
    pub fn from_config(config: FoliageChannelConfig) -> EngineResult<Self> {
        let geometry = config.geometry.parse()?;

        if !(0.0..=1.0).contains(&config.density) {
            return Err(EngineError::InvalidParams(format!(
                "foliage channel '{}': density must be in [0, 1], got {}",
                config.name, config.density
            )));
        }
        if config.min_size.x > config.max_size.x || config.min_size.y > config.max_size.y {
            return Err(EngineError::InvalidParams(format!(
                "foliage channel '{}': min_size is larger than max_size",
                config.name
            )));
        }

        Ok(Self {
            name: config.name,
            density: config.density,
            map_channel: config.map_channel,
            min_size: config.min_size,
            max_size: config.max_size,
            geometry,
        })
    }
}

impl TryFrom<FoliageChannelConfig> for FoliageChannel {
    type Error = EngineError;

    fn try_from(config: FoliageChannelConfig) -> EngineResult<Self> {
        Self::from_config(config)
    }
}
