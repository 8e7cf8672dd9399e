//! TOML config loading.
//!
//! Configs are loaded once at startup, never in the frame loop.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::EngineResult;

/// Parses a TOML document into `T`.
///
/// # Errors
///
/// Returns [`crate::EngineError::Config`] if the document is malformed or
/// does not match `T`.
pub fn parse_toml<T: DeserializeOwned>(source: &str) -> EngineResult<T> {
    Ok(toml::from_str(source)?)
}

/// Reads and parses a TOML file into `T`.
///
/// # Errors
///
/// Returns [`crate::EngineError::Io`] if the file cannot be read and
/// [`crate::EngineError::Config`] if it cannot be parsed.
pub fn load_toml<T: DeserializeOwned>(path: impl AsRef<Path>) -> EngineResult<T> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    tracing::debug!("Loaded config {}", path.display());
    parse_toml(&source)
}
