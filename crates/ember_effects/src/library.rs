//! # Effect Library
//!
//! Named particle parameter sets, loaded once at startup.
//!
//! ```toml
//! [effects.campfire]
//! max_particles = 800
//! duration = 1.5
//! blend_mode = "additive"
//! ```
//!
//! The built-in presets (`fire`, `smoke`, `explosion`, `projectile_trail`,
//! `dust`) are always present unless a file overrides them by name.

use std::collections::BTreeMap;
use std::path::Path;

use ember_core::config::{load_toml, parse_toml};
use ember_core::{EngineError, EngineResult};
use serde::Deserialize;

use crate::params::ParticleSystemParams;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EffectFile {
    #[serde(default)]
    effects: BTreeMap<String, ParticleSystemParams>,
}

/// A set of named, validated particle parameter snapshots.
#[derive(Debug, Clone, Default)]
pub struct EffectLibrary {
    effects: BTreeMap<String, ParticleSystemParams>,
}

impl EffectLibrary {
    /// Library holding only the built-in presets.
    #[must_use]
    pub fn builtin() -> Self {
        let effects = [
            ("fire", ParticleSystemParams::fire()),
            ("smoke", ParticleSystemParams::smoke()),
            ("explosion", ParticleSystemParams::explosion()),
            ("projectile_trail", ParticleSystemParams::projectile_trail()),
            ("dust", ParticleSystemParams::dust()),
        ]
        .into_iter()
        .map(|(name, params)| (name.to_owned(), params))
        .collect();

        Self { effects }
    }

    /// Built-ins plus (overridden by) the effects in a TOML document.
    ///
    /// # Errors
    ///
    /// Fails if the document does not parse or any effect is invalid.
    pub fn from_toml_str(source: &str) -> EngineResult<Self> {
        let file: EffectFile = parse_toml(source)?;
        let mut library = Self::builtin();
        library.extend(file.effects)?;
        Ok(library)
    }

    /// Built-ins plus (overridden by) the effects in a TOML file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, or any effect is invalid.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let file: EffectFile = load_toml(path)?;
        let mut library = Self::builtin();
        library.extend(file.effects)?;
        tracing::info!("Loaded effect library with {} effects", library.len());
        Ok(library)
    }

    fn extend(&mut self, effects: BTreeMap<String, ParticleSystemParams>) -> EngineResult<()> {
        for (name, params) in effects {
            params.validate().map_err(|e| match e {
                EngineError::InvalidParams(reason) => EngineError::InvalidParams(format!("effect '{name}': {reason}")),
                other => other,
            })?;
            self.effects.insert(name, params);
        }
        Ok(())
    }

    /// Adds or replaces an effect.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParams`] if `params` is invalid.
    pub fn insert(&mut self, name: impl Into<String>, params: ParticleSystemParams) -> EngineResult<()> {
        params.validate()?;
        self.effects.insert(name.into(), params);
        Ok(())
    }

    /// Looks up an effect.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EffectNotFound`] for unknown names.
    pub fn get(&self, name: &str) -> EngineResult<&ParticleSystemParams> {
        self.effects
            .get(name)
            .ok_or_else(|| EngineError::EffectNotFound(name.to_owned()))
    }

    /// Looks up an effect and returns a scaled copy.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EffectNotFound`] for unknown names.
    pub fn scaled(&self, name: &str, factor: f32) -> EngineResult<ParticleSystemParams> {
        Ok(self.get(name)?.scaled(factor))
    }

    /// Effect names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.effects.keys().map(String::as_str)
    }

    /// Number of effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether the library is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_presets() {
        let library = EffectLibrary::builtin();
        assert_eq!(library.len(), 5);
        assert_eq!(library.get("fire").unwrap(), &ParticleSystemParams::fire());
        assert!(matches!(library.get("plasma"), Err(EngineError::EffectNotFound(_))));
    }

    #[test]
    fn test_file_overrides_and_extends() {
        let library = EffectLibrary::from_toml_str(
            r#"
            [effects.fire]
            max_particles = 50

            [effects.sparks]
            max_particles = 200
            duration = 0.5
            blend_mode = "additive"
            "#,
        )
        .unwrap();

        assert_eq!(library.len(), 6);
        assert_eq!(library.get("fire").unwrap().max_particles, 50);
        assert!((library.get("sparks").unwrap().duration - 0.5).abs() < f32::EPSILON);
        let names: Vec<&str> = library.names().collect();
        assert_eq!(names[0], "dust");
    }

    #[test]
    fn test_invalid_effect_names_culprit() {
        let err = EffectLibrary::from_toml_str(
            r#"
            [effects.broken]
            duration = -1.0
            "#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid parameters: effect 'broken': duration must be positive, got -1"
        );
    }

    #[test]
    fn test_scaled_lookup() {
        let library = EffectLibrary::builtin();
        let small = library.scaled("smoke", 0.5).unwrap();
        assert!((small.max_end_size - 70.0).abs() < f32::EPSILON);
    }
}
