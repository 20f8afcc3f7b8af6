//! High-level detection API.
//!
//! A [`Detector`] holds an immutable [`DetectorConfig`] and ties the stages
//! together: extrema scanning over a DoG octave, orientation assignment and
//! patch sampling over the matching Gaussian octave. Gradient maps live in a
//! caller-owned [`GradientCache`]; give each thread its own cache.

#[cfg(feature = "rayon")]
mod parallel;

#[cfg(feature = "rayon")]
pub use parallel::OctavePair;

use crate::extrema::{ExtremaScan, InterestPoint, InterestPointSink};
use crate::gradient::GradientCache;
use crate::octave::Octave;
use crate::orientation::{self, HistogramParams, OrientationMode};
use crate::sampling::{sample_patch, AccumulatorFactory, OrientedFeature};
use crate::trace::{trace_event, trace_span};
use crate::util::{DogSiftError, DogSiftResult};
use std::sync::atomic::AtomicBool;

/// Extrema localisation strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExtremaMode {
    /// Integer pixel and scale positions, no refinement.
    Basic,
    /// Sub-pixel and sub-scale refinement with a 3D quadratic fit.
    #[default]
    Interpolated,
}

/// Detector configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Minimum DoG magnitude, divided by the scales per octave before use.
    pub magnitude_threshold: f32,
    /// Maximum ratio of principal curvatures.
    pub eigenvalue_ratio: f32,
    /// Fraction of the histogram maximum a peak must reach.
    pub peak_threshold: f32,
    /// Orientation histogram bins.
    pub num_bins: usize,
    /// Orientation window sigma relative to the point scale.
    pub hist_scaling: f32,
    /// Passes of the circular histogram smoothing filter.
    pub smoothing_iterations: usize,
    /// Orientation window radius relative to its sigma.
    pub sampling_radius_factor: f32,
    /// Descriptor patch side relative to the point scale.
    pub magnification: f32,
    /// Maximum re-fits at neighbouring pixels during refinement.
    pub num_interpolation_iterations: usize,
    /// Extrema localisation strategy.
    pub extrema: ExtremaMode,
    /// Orientation assignment strategy.
    pub orientation: OrientationMode,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            magnitude_threshold: 0.04,
            eigenvalue_ratio: 10.0,
            peak_threshold: 0.8,
            num_bins: 36,
            hist_scaling: 1.5,
            smoothing_iterations: 6,
            sampling_radius_factor: 3.0,
            magnification: 12.0,
            num_interpolation_iterations: 5,
            extrema: ExtremaMode::default(),
            orientation: OrientationMode::default(),
        }
    }
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

impl DetectorConfig {
    /// Checks every option range.
    pub fn validate(&self) -> DogSiftResult<()> {
        let reason = if !self.magnitude_threshold.is_finite() || self.magnitude_threshold < 0.0 {
            Some("magnitude_threshold must be finite and non-negative")
        } else if !positive(self.eigenvalue_ratio) {
            Some("eigenvalue_ratio must be positive")
        } else if !(0.0..=1.0).contains(&self.peak_threshold) {
            Some("peak_threshold must be within [0, 1]")
        } else if self.num_bins < 3 {
            Some("num_bins must be at least 3")
        } else if !positive(self.hist_scaling) {
            Some("hist_scaling must be positive")
        } else if !positive(self.sampling_radius_factor) {
            Some("sampling_radius_factor must be positive")
        } else if !positive(self.magnification) {
            Some("magnification must be positive")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(DogSiftError::InvalidConfig { reason }),
            None => Ok(()),
        }
    }

    pub(crate) fn histogram_params(&self) -> HistogramParams {
        HistogramParams {
            num_bins: self.num_bins,
            hist_scaling: self.hist_scaling,
            sampling_radius_factor: self.sampling_radius_factor,
            smoothing_iterations: self.smoothing_iterations,
        }
    }
}

/// A described, oriented keypoint in level-0 image coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Blur at the keypoint in level-0 pixels.
    pub scale: f32,
    /// Dominant orientation in radians, `[-π, π)`.
    pub orientation: f32,
    pub descriptor: Vec<f32>,
}

impl Keypoint {
    fn from_feature(point: &InterestPoint, feature: OrientedFeature) -> Self {
        let (x, y, scale) = point.to_image_space();
        Self {
            x,
            y,
            scale,
            orientation: feature.orientation,
            descriptor: feature.vector,
        }
    }
}

/// Scale-space keypoint detector.
#[derive(Clone, Debug)]
pub struct Detector {
    config: DetectorConfig,
}

impl Detector {
    /// Creates a detector after validating `config`.
    pub fn new(config: DetectorConfig) -> DogSiftResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Lazily scans a DoG octave in scale, row, column order.
    pub fn scan<'a>(&self, dog: &'a Octave) -> ExtremaScan<'a> {
        ExtremaScan::new(dog, &self.config, None)
    }

    /// Like [`Detector::scan`], stopping at the next row once `cancel` is set.
    pub fn scan_cancellable<'a>(&self, dog: &'a Octave, cancel: &'a AtomicBool) -> ExtremaScan<'a> {
        ExtremaScan::new(dog, &self.config, Some(cancel))
    }

    /// Feeds every interest point of `dog` to `sink` in scan order.
    ///
    /// Returns the number of points delivered.
    pub fn drain_into<S: InterestPointSink + ?Sized>(&self, dog: &Octave, sink: &mut S) -> usize {
        let _span = trace_span!(
            "extrema_scan",
            levels = dog.len(),
            width = dog.width(),
            height = dog.height()
        )
        .entered();
        let mut count = 0;
        for point in self.scan(dog) {
            sink.on_interest_point(point);
            count += 1;
        }
        count
    }

    /// Orientations of `point`, computed on the Gaussian level it was found at.
    pub fn dominant_orientations(
        &self,
        cache: &mut GradientCache,
        gaussian: &Octave,
        point: &InterestPoint,
    ) -> DogSiftResult<Vec<f32>> {
        if self.config.orientation == OrientationMode::Fixed {
            return Ok(vec![0.0]);
        }
        check_level(gaussian, point)?;
        let maps = cache.maps_for(gaussian, point.scale_index)?;
        Ok(orientation::dominant_orientations(
            maps,
            point.x,
            point.y,
            point.sigma,
            self.config.orientation,
            &self.config.histogram_params(),
            self.config.peak_threshold,
        ))
    }

    /// One feature per dominant orientation of `point`.
    pub fn describe<F: AccumulatorFactory>(
        &self,
        cache: &mut GradientCache,
        gaussian: &Octave,
        point: &InterestPoint,
        factory: &F,
    ) -> DogSiftResult<Vec<OrientedFeature>> {
        self.describe_bands(cache, &[gaussian], false, point, factory)
    }

    /// Colour variant: orientations come from `luminance`, samples from each
    /// of `bands`, with per-band vectors concatenated in band order.
    pub fn describe_colour<F: AccumulatorFactory>(
        &self,
        cache: &mut GradientCache,
        luminance: &Octave,
        bands: &[&Octave],
        point: &InterestPoint,
        factory: &F,
    ) -> DogSiftResult<Vec<OrientedFeature>> {
        if bands.is_empty() {
            return Err(DogSiftError::InvalidConfig {
                reason: "at least one colour band is required",
            });
        }
        let mut octaves = Vec::with_capacity(bands.len() + 1);
        octaves.push(luminance);
        octaves.extend_from_slice(bands);
        self.describe_bands(cache, &octaves, true, point, factory)
    }

    /// `octaves[0]` drives orientation; it is also sampled unless
    /// `skip_first` is set.
    fn describe_bands<F: AccumulatorFactory>(
        &self,
        cache: &mut GradientCache,
        octaves: &[&Octave],
        skip_first: bool,
        point: &InterestPoint,
        factory: &F,
    ) -> DogSiftResult<Vec<OrientedFeature>> {
        let _span =
            trace_span!("describe", x = point.x, y = point.y, sigma = point.sigma).entered();
        for octave in octaves {
            check_level(octave, point)?;
        }
        let maps = cache.bands_for(octaves, point.scale_index)?;
        let orientations = orientation::dominant_orientations(
            &maps[0],
            point.x,
            point.y,
            point.sigma,
            self.config.orientation,
            &self.config.histogram_params(),
            self.config.peak_threshold,
        );
        let sampled = if skip_first { &maps[1..] } else { maps };
        Ok(orientations
            .into_iter()
            .map(|theta| {
                sample_patch(
                    theta,
                    (point.x, point.y),
                    point.sigma,
                    sampled,
                    self.config.magnification,
                    factory,
                )
            })
            .collect())
    }

    /// Scans `dog` and describes every point on `gaussian`.
    ///
    /// Keypoints come out in scan order, one per point and orientation.
    pub fn detect_keypoints<F: AccumulatorFactory>(
        &self,
        dog: &Octave,
        gaussian: &Octave,
        factory: &F,
    ) -> DogSiftResult<Vec<Keypoint>> {
        let _span = trace_span!(
            "detect_keypoints",
            width = dog.width(),
            height = dog.height()
        )
        .entered();
        if (dog.width(), dog.height()) != (gaussian.width(), gaussian.height()) {
            return Err(DogSiftError::OctaveMismatch {
                reason: "gaussian and DoG octaves differ in level size",
            });
        }

        let mut cache = GradientCache::new();
        let mut keypoints = Vec::new();
        let mut points = 0usize;
        for point in self.scan(dog) {
            points += 1;
            for feature in self.describe(&mut cache, gaussian, &point, factory)? {
                keypoints.push(Keypoint::from_feature(&point, feature));
            }
        }
        trace_event!(
            "keypoints",
            interest_points = points,
            keypoints = keypoints.len(),
            gradient_recomputations = cache.recomputations(),
        );
        Ok(keypoints)
    }
}

/// The Gaussian level for a point must exist and match the scan size.
fn check_level(octave: &Octave, point: &InterestPoint) -> DogSiftResult<()> {
    if point.scale_index >= octave.len() {
        return Err(DogSiftError::OctaveMismatch {
            reason: "gaussian octave has no level for the interest point scale",
        });
    }
    let inside = point.x >= 0.0
        && point.y >= 0.0
        && point.x < octave.width() as f32
        && point.y < octave.height() as f32;
    if !inside {
        return Err(DogSiftError::OctaveMismatch {
            reason: "interest point lies outside the gaussian octave",
        });
    }
    Ok(())
}
