//! Per-level gradient magnitude and orientation maps.
//!
//! Gradients use central differences in the interior and one-sided
//! differences on the outermost rows and columns. Orientations are
//! `atan2(dy, dx)` wrapped to `[-π, π)`.
//!
//! [`GradientCache`] is an explicit value owned by the caller. It holds the
//! maps of exactly one level (per band) and recomputes them only when asked
//! for a different level or octave. Octave identity, not pixel content, is the
//! cache key. A cache is plain mutable state: give each worker thread its own.

use crate::image::{ImageView, OwnedImage};
use crate::octave::Octave;
use crate::util::math::wrap_angle;
use crate::util::{DogSiftError, DogSiftResult};

/// Gradient magnitude and orientation images of one level.
#[derive(Clone, Debug)]
pub struct GradientMaps {
    magnitude: OwnedImage,
    orientation: OwnedImage,
}

impl GradientMaps {
    /// Computes the maps for an intensity image.
    pub fn compute(image: ImageView<'_, f32>) -> DogSiftResult<Self> {
        let mut maps = Self {
            magnitude: OwnedImage::filled(image.width(), image.height(), 0.0)?,
            orientation: OwnedImage::filled(image.width(), image.height(), 0.0)?,
        };
        maps.fill_from(image);
        Ok(maps)
    }

    /// Recomputes the maps in place, reusing the buffers when sizes match.
    pub fn recompute_from(&mut self, image: ImageView<'_, f32>) -> DogSiftResult<()> {
        if self.magnitude.size() != (image.width(), image.height()) {
            *self = Self::compute(image)?;
            return Ok(());
        }
        self.fill_from(image);
        Ok(())
    }

    fn fill_from(&mut self, image: ImageView<'_, f32>) {
        let width = image.width();
        let height = image.height();
        let stride = image.stride();
        let src = image.as_slice();
        let at = |x: usize, y: usize| src[y * stride + x];

        let magnitude = self.magnitude.data_mut();
        let orientation = self.orientation.data_mut();
        for y in 0..height {
            let (ym, yp, ny) = neighbours(y, height);
            for x in 0..width {
                let (xm, xp, nx) = neighbours(x, width);
                let dx = if nx > 0.0 { (at(xp, y) - at(xm, y)) / nx } else { 0.0 };
                let dy = if ny > 0.0 { (at(x, yp) - at(x, ym)) / ny } else { 0.0 };
                let idx = y * width + x;
                magnitude[idx] = (dx * dx + dy * dy).sqrt();
                orientation[idx] = wrap_angle(dy.atan2(dx));
            }
        }
    }

    /// Gradient magnitude image.
    pub fn magnitude(&self) -> &OwnedImage {
        &self.magnitude
    }

    /// Gradient orientation image in radians, `[-π, π)`.
    pub fn orientation(&self) -> &OwnedImage {
        &self.orientation
    }

    /// Returns `(width, height)` of both maps.
    pub fn size(&self) -> (usize, usize) {
        self.magnitude.size()
    }
}

/// Neighbour indices and their distance along one axis.
fn neighbours(i: usize, len: usize) -> (usize, usize, f32) {
    let lo = i.saturating_sub(1);
    let hi = (i + 1).min(len - 1);
    (lo, hi, (hi - lo) as f32)
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct CacheKey {
    octaves: Vec<u64>,
    level: usize,
}

/// Caller-owned cache of the gradient maps for the level being described.
#[derive(Debug, Default)]
pub struct GradientCache {
    key: Option<CacheKey>,
    bands: Vec<GradientMaps>,
    recomputations: usize,
}

impl GradientCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the maps of `level` in `octave`, computing them on a key change.
    pub fn maps_for(&mut self, octave: &Octave, level: usize) -> DogSiftResult<&GradientMaps> {
        let bands = self.bands_for(&[octave], level)?;
        Ok(&bands[0])
    }

    /// Returns one set of maps per band octave for `level`.
    ///
    /// All band octaves must share the level size.
    pub fn bands_for(
        &mut self,
        octaves: &[&Octave],
        level: usize,
    ) -> DogSiftResult<&[GradientMaps]> {
        if octaves.is_empty() {
            return Err(DogSiftError::InvalidConfig {
                reason: "at least one band octave is required",
            });
        }
        let key = CacheKey {
            octaves: octaves.iter().map(|octave| octave.id()).collect(),
            level,
        };
        if self.key.as_ref() == Some(&key) {
            return Ok(&self.bands);
        }

        let size = (octaves[0].width(), octaves[0].height());
        for octave in octaves.iter().skip(1) {
            if (octave.width(), octave.height()) != size {
                return Err(DogSiftError::OctaveMismatch {
                    reason: "band octaves differ in level size",
                });
            }
        }

        self.key = None;
        self.bands.truncate(octaves.len());
        for (band, octave) in octaves.iter().enumerate() {
            let view = octave.level_view(level)?;
            match self.bands.get_mut(band) {
                Some(maps) => maps.recompute_from(view)?,
                None => self.bands.push(GradientMaps::compute(view)?),
            }
        }
        self.key = Some(key);
        self.recomputations += 1;
        Ok(&self.bands)
    }

    /// Number of times the cached maps were (re)computed.
    pub fn recomputations(&self) -> usize {
        self.recomputations
    }

    /// Drops the cached key so the next request recomputes.
    pub fn invalidate(&mut self) {
        self.key = None;
    }
}
