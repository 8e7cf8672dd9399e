//! Per-channel foliage density over a terrain node.
//!
//! Each texel holds up to four densities in `[0, 1]`, one per foliage
//! channel (grass in red, flowers in green, ...). Lookups use relative
//! coordinates so a map covers whatever node it is applied to.

use ember_core::{Color4, EngineError, EngineResult};

/// RGBA density texture, row-major, `v` growing along +Z.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityMap {
    width: usize,
    height: usize,
    texels: Vec<Color4>,
}

impl DensityMap {
    /// Creates a map from `width * height` texels.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParams`] if the map is empty or the
    /// texel count does not match.
    pub fn new(width: usize, height: usize, texels: Vec<Color4>) -> EngineResult<Self> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidParams(format!(
                "density map must not be empty, got {width}x{height}"
            )));
        }
        if texels.len() != width * height {
            return Err(EngineError::InvalidParams(format!(
                "density map {width}x{height} needs {} texels, got {}",
                width * height,
                texels.len()
            )));
        }
        Ok(Self { width, height, texels })
    }

    /// Creates a map from 8-bit RGBA pixels.
    ///
    /// # Errors
    ///
    /// Same as [`DensityMap::new`], with the pixel count taken as
    /// `rgba.len() / 4`.
    pub fn from_rgba8(width: usize, height: usize, rgba: &[u8]) -> EngineResult<Self> {
        if rgba.len() % 4 != 0 {
            return Err(EngineError::InvalidParams(format!(
                "RGBA data length {} is not a multiple of 4",
                rgba.len()
            )));
        }
        let texels = rgba
            .chunks_exact(4)
            .map(|px| {
                Color4::new(
                    f32::from(px[0]) / 255.0,
                    f32::from(px[1]) / 255.0,
                    f32::from(px[2]) / 255.0,
                    f32::from(px[3]) / 255.0,
                )
            })
            .collect();
        Self::new(width, height, texels)
    }

    /// A 1x1 map with the same densities everywhere.
    #[must_use]
    pub fn uniform(density: Color4) -> Self {
        Self {
            width: 1,
            height: 1,
            texels: vec![density],
        }
    }

    /// Width in texels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in texels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Nearest texel at relative coordinates, clamped to the map.
    #[must_use]
    pub fn get_relative(&self, u: f32, v: f32) -> Color4 {
        let x = ((u.clamp(0.0, 1.0) * self.width as f32) as usize).min(self.width - 1);
        let y = ((v.clamp(0.0, 1.0) * self.height as f32) as usize).min(self.height - 1);
        self.texels[y * self.width + x]
    }

    /// Density of one channel at relative coordinates; `None` if the map
    /// has no such channel.
    #[must_use]
    pub fn channel_at(&self, u: f32, v: f32, channel: usize) -> Option<f32> {
        self.get_relative(u, v).channel(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_lookup_picks_quadrant() {
        let map = DensityMap::new(
            2,
            2,
            vec![
                Color4::new(0.1, 0.0, 0.0, 0.0),
                Color4::new(0.2, 0.0, 0.0, 0.0),
                Color4::new(0.3, 0.0, 0.0, 0.0),
                Color4::new(0.4, 0.0, 0.0, 0.0),
            ],
        )
        .unwrap();

        assert_eq!(map.channel_at(0.25, 0.25, 0), Some(0.1));
        assert_eq!(map.channel_at(0.75, 0.25, 0), Some(0.2));
        assert_eq!(map.channel_at(0.25, 0.75, 0), Some(0.3));
        assert_eq!(map.channel_at(1.0, 1.0, 0), Some(0.4));
        assert_eq!(map.channel_at(-3.0, 0.0, 0), Some(0.1));
    }

    #[test]
    fn test_missing_channel() {
        let map = DensityMap::uniform(Color4::WHITE);
        assert_eq!(map.channel_at(0.5, 0.5, 3), Some(1.0));
        assert_eq!(map.channel_at(0.5, 0.5, 4), None);
    }

    #[test]
    fn test_from_rgba8() {
        let map = DensityMap::from_rgba8(1, 1, &[255, 0, 51, 255]).unwrap();
        let texel = map.get_relative(0.5, 0.5);
        assert!((texel.r - 1.0).abs() < f32::EPSILON);
        assert!((texel.b - 0.2).abs() < 1e-6);

        assert!(DensityMap::from_rgba8(2, 2, &[0; 8]).is_err());
        assert!(DensityMap::from_rgba8(1, 1, &[0; 3]).is_err());
    }
}
