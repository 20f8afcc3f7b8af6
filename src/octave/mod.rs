//! Scale-space octaves.
//!
//! An octave is an ordered stack of equally sized single-band levels at
//! increasing blur. The same container holds both Gaussian octaves (used for
//! gradients) and difference-of-Gaussian octaves (scanned for extrema).
//! Octaves are validated once on construction and are immutable afterwards,
//! so the scan loops can index the interior without bounds failures.

use crate::image::{ImageView, OwnedImage};
use crate::util::{DogSiftError, DogSiftResult};
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimum number of levels needed for the 3x3x3 neighbourhood test.
pub const MIN_LEVELS: usize = 3;

static NEXT_OCTAVE_ID: AtomicU64 = AtomicU64::new(1);

/// Metadata describing where an octave sits in the scale space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OctaveParams {
    /// Blur of level 0 in octave pixel units.
    pub initial_sigma: f32,
    /// Number of scale intervals per doubling of sigma.
    pub scales_per_octave: usize,
    /// Margin (in pixels) that the extrema scan never enters.
    pub border_pixels: usize,
    /// Size of one octave pixel in level-0 pyramid pixels.
    pub octave_size_factor: f32,
}

impl Default for OctaveParams {
    fn default() -> Self {
        Self {
            initial_sigma: 1.6,
            scales_per_octave: 3,
            border_pixels: 5,
            octave_size_factor: 1.0,
        }
    }
}

impl OctaveParams {
    fn validate(&self) -> DogSiftResult<()> {
        if !self.initial_sigma.is_finite() || self.initial_sigma <= 0.0 {
            return Err(DogSiftError::InvalidOctaveParams {
                reason: "initial_sigma must be finite and > 0",
            });
        }
        if self.scales_per_octave == 0 {
            return Err(DogSiftError::InvalidOctaveParams {
                reason: "scales_per_octave must be >= 1",
            });
        }
        if self.border_pixels == 0 {
            return Err(DogSiftError::InvalidOctaveParams {
                reason: "border_pixels must be >= 1",
            });
        }
        if !self.octave_size_factor.is_finite() || self.octave_size_factor <= 0.0 {
            return Err(DogSiftError::InvalidOctaveParams {
                reason: "octave_size_factor must be finite and > 0",
            });
        }
        Ok(())
    }
}

/// Immutable stack of scale levels with its metadata.
#[derive(Debug)]
pub struct Octave {
    id: u64,
    levels: Vec<OwnedImage>,
    params: OctaveParams,
}

impl Octave {
    /// Builds an octave from its levels, validating shape and metadata.
    ///
    /// Requires at least three levels of identical size whose interior
    /// (everything at least `border_pixels` away from an edge) is non-empty.
    pub fn new(levels: Vec<OwnedImage>, params: OctaveParams) -> DogSiftResult<Self> {
        params.validate()?;
        if levels.len() < MIN_LEVELS {
            return Err(DogSiftError::TooFewLevels {
                got: levels.len(),
                min: MIN_LEVELS,
            });
        }

        let expected = levels[0].size();
        for (level, img) in levels.iter().enumerate().skip(1) {
            if img.size() != expected {
                return Err(DogSiftError::LevelSizeMismatch {
                    level,
                    expected,
                    got: img.size(),
                });
            }
        }

        let (width, height) = expected;
        let border = params.border_pixels;
        if width <= 2 * border || height <= 2 * border {
            return Err(DogSiftError::BorderTooLarge {
                border,
                width,
                height,
            });
        }

        Ok(Self {
            id: NEXT_OCTAVE_ID.fetch_add(1, Ordering::Relaxed),
            levels,
            params,
        })
    }

    /// Builds the difference-of-Gaussian octave `dog[i] = gauss[i + 1] - gauss[i]`.
    ///
    /// The Gaussian octave needs at least four levels so that the result still
    /// has the three levels the extrema scan requires. Metadata is copied.
    pub fn difference_of_gaussians(gaussian: &Octave) -> DogSiftResult<Self> {
        if gaussian.len() < MIN_LEVELS + 1 {
            return Err(DogSiftError::TooFewLevels {
                got: gaussian.len().saturating_sub(1),
                min: MIN_LEVELS,
            });
        }

        let levels = gaussian
            .levels
            .windows(2)
            .map(|pair| {
                let data = pair[1]
                    .data()
                    .iter()
                    .zip(pair[0].data())
                    .map(|(next, prev)| next - prev)
                    .collect();
                OwnedImage::new(data, pair[0].width(), pair[0].height())
            })
            .collect::<DogSiftResult<Vec<_>>>()?;

        Self::new(levels, gaussian.params)
    }

    /// Process-unique identity of this octave.
    ///
    /// Gradient caches key on identity rather than content.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false for a constructed octave; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Width of every level in pixels.
    pub fn width(&self) -> usize {
        self.levels[0].width()
    }

    /// Height of every level in pixels.
    pub fn height(&self) -> usize {
        self.levels[0].height()
    }

    /// Returns the octave metadata.
    pub fn params(&self) -> &OctaveParams {
        &self.params
    }

    /// Returns all levels, finest blur first.
    pub fn levels(&self) -> &[OwnedImage] {
        &self.levels
    }

    /// Returns a level by index.
    pub fn level(&self, index: usize) -> DogSiftResult<&OwnedImage> {
        self.levels.get(index).ok_or(DogSiftError::IndexOutOfBounds {
            index,
            len: self.levels.len(),
            context: "level",
        })
    }

    /// Returns a borrowed view of a level.
    pub fn level_view(&self, index: usize) -> DogSiftResult<ImageView<'_, f32>> {
        self.level(index).map(OwnedImage::view)
    }

    /// Blur at a (possibly fractional) scale index, in octave pixels.
    pub fn sigma_at(&self, scale: f32) -> f32 {
        self.params.initial_sigma * 2.0f32.powf(scale / self.params.scales_per_octave as f32)
    }

    /// Threshold on absolute DoG values, normalised by the scale count.
    pub(crate) fn normalised_threshold(&self, magnitude_threshold: f32) -> f32 {
        magnitude_threshold / self.params.scales_per_octave as f32
    }

    /// Whether `(x, y)` lies inside the scannable interior.
    pub(crate) fn in_interior(&self, x: isize, y: isize) -> bool {
        let border = self.params.border_pixels as isize;
        x >= border
            && y >= border
            && x < self.width() as isize - border
            && y < self.height() as isize - border
    }
}

#[cfg(test)]
mod tests {
    use super::{Octave, OctaveParams};
    use crate::image::OwnedImage;

    fn flat(value: f32) -> OwnedImage {
        OwnedImage::filled(16, 12, value).unwrap()
    }

    #[test]
    fn sigma_doubles_per_octave() {
        let params = OctaveParams {
            initial_sigma: 2.0,
            scales_per_octave: 4,
            border_pixels: 2,
            octave_size_factor: 1.0,
        };
        let octave = Octave::new(vec![flat(0.0), flat(0.0), flat(0.0)], params).unwrap();
        assert!((octave.sigma_at(0.0) - 2.0).abs() < 1e-6);
        assert!((octave.sigma_at(4.0) - 4.0).abs() < 1e-5);
        assert!((octave.sigma_at(2.0) - 2.0 * 2.0f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn dog_subtracts_consecutive_levels() {
        let params = OctaveParams {
            border_pixels: 2,
            ..OctaveParams::default()
        };
        let gaussian =
            Octave::new(vec![flat(0.0), flat(1.0), flat(3.0), flat(6.0)], params).unwrap();
        let dog = Octave::difference_of_gaussians(&gaussian).unwrap();
        assert_eq!(dog.len(), 3);
        assert_eq!(dog.level(0).unwrap().at(3, 3), 1.0);
        assert_eq!(dog.level(1).unwrap().at(3, 3), 2.0);
        assert_eq!(dog.level(2).unwrap().at(3, 3), 3.0);
        assert_ne!(dog.id(), gaussian.id());
    }

    #[test]
    fn interior_excludes_border() {
        let params = OctaveParams {
            border_pixels: 2,
            ..OctaveParams::default()
        };
        let octave = Octave::new(vec![flat(0.0), flat(0.0), flat(0.0)], params).unwrap();
        assert!(octave.in_interior(2, 2));
        assert!(octave.in_interior(13, 9));
        assert!(!octave.in_interior(14, 9));
        assert!(!octave.in_interior(1, 5));
    }
}
