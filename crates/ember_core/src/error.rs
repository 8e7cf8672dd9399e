//! # Engine Error Types
//!
//! Steady-state simulation never fails: saturated rings drop particles,
//! ground misses discard candidates. Everything in here is a construction
//! or configuration failure.

use thiserror::Error;

/// Errors raised while building or configuring engine systems.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A geometry name in a config file does not name a known geometry.
    #[error("unknown geometry: {0}")]
    UnknownGeometry(String),

    /// Particle or foliage parameters failed validation.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// A named effect was not found in an effect library.
    #[error("effect not found: {0}")]
    EffectNotFound(String),

    /// A TOML document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A config file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream-output device rejected a command.
    #[error("device error: {0}")]
    Device(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
