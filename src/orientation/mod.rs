//! Dominant gradient orientations around an interest point.
//!
//! A Gaussian-weighted histogram of gradient angles is built over a disc
//! around the point, smoothed with a circular box filter and searched for
//! peaks. Each peak close enough to the global maximum yields one
//! orientation, so a point may have several or none (a flat patch has an
//! all-zero histogram and no peaks; such points are dropped).

use crate::gradient::GradientMaps;
use crate::refine::quad1d::parabolic_peak_offset;
use crate::util::math::wrap_angle;
use std::f32::consts::{PI, TAU};

/// Keeps `angle = π` inside the last bin.
const BIN_EPSILON: f32 = 1e-5;

/// How interest points are assigned orientations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrientationMode {
    /// Peaks of the local gradient histogram (rotation invariant).
    #[default]
    Dominant,
    /// Always a single orientation of 0 (upright descriptors).
    Fixed,
}

/// Parameters of the orientation histogram.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistogramParams {
    /// Number of bins covering `[-π, π)`.
    pub num_bins: usize,
    /// Weighting Gaussian sigma relative to the point scale.
    pub hist_scaling: f32,
    /// Window radius relative to the weighting sigma.
    pub sampling_radius_factor: f32,
    /// Passes of the circular `[1/3, 1/3, 1/3]` filter.
    pub smoothing_iterations: usize,
}

impl Default for HistogramParams {
    fn default() -> Self {
        Self {
            num_bins: 36,
            hist_scaling: 1.5,
            sampling_radius_factor: 3.0,
            smoothing_iterations: 6,
        }
    }
}

/// Circular histogram of gradient angles.
#[derive(Clone, Debug, PartialEq)]
pub struct OrientationHistogram {
    bins: Vec<f32>,
}

impl OrientationHistogram {
    /// Creates an all-zero histogram.
    pub fn new(num_bins: usize) -> Self {
        Self {
            bins: vec![0.0; num_bins],
        }
    }

    /// Wraps existing bin values.
    pub fn from_bins(bins: Vec<f32>) -> Self {
        Self { bins }
    }

    /// Bin values; bin 0 starts at `-π`.
    pub fn bins(&self) -> &[f32] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Bin receiving `angle` (radians in `[-π, π]`).
    pub fn bin_index(&self, angle: f32) -> usize {
        let n = self.bins.len();
        let pos = n as f32 * (angle + PI) / (TAU + BIN_EPSILON);
        (pos.max(0.0) as usize).min(n.saturating_sub(1))
    }

    /// Adds `weight` to the bin of `angle`.
    pub fn add(&mut self, angle: f32, weight: f32) {
        if self.bins.is_empty() {
            return;
        }
        let idx = self.bin_index(angle);
        self.bins[idx] += weight;
    }

    /// Applies the circular 3-tap box filter `iterations` times.
    pub fn smooth(&mut self, iterations: usize) {
        let n = self.bins.len();
        if n == 0 {
            return;
        }
        let mut scratch = vec![0.0f32; n];
        for _ in 0..iterations {
            for (i, out) in scratch.iter_mut().enumerate() {
                let prev = self.bins[(i + n - 1) % n];
                let next = self.bins[(i + 1) % n];
                *out = (prev + self.bins[i] + next) / 3.0;
            }
            std::mem::swap(&mut self.bins, &mut scratch);
        }
    }

    /// Largest bin value, or 0 for an empty histogram.
    pub fn max(&self) -> f32 {
        self.bins.iter().copied().fold(0.0f32, f32::max)
    }

    /// Angle at fractional bin position `pos` (bin centres at `i + 0.5`).
    pub fn angle_at(&self, pos: f32) -> f32 {
        wrap_angle(TAU * (pos + 0.5) / self.bins.len() as f32 - PI)
    }
}

/// Builds the smoothed orientation histogram around `(x, y)` at `scale`.
///
/// The window has radius `round(hist_scaling * scale * sampling_radius_factor)`
/// and is clipped to the image minus its outermost pixel. Samples are weighted
/// by `exp(-d² / 2σ²)` with `σ = hist_scaling * scale`, times the gradient
/// magnitude.
pub fn orientation_histogram(
    maps: &GradientMaps,
    x: f32,
    y: f32,
    scale: f32,
    params: &HistogramParams,
) -> OrientationHistogram {
    let mut hist = OrientationHistogram::new(params.num_bins);
    let (width, height) = maps.size();

    let sigma = params.hist_scaling * scale;
    let radius = (sigma * params.sampling_radius_factor).round() as isize;
    let radius_sq = (radius * radius) as f32;
    let inv_two_sigma_sq = 1.0 / (2.0 * sigma * sigma);

    let ix = x.round() as isize;
    let iy = y.round() as isize;
    let x0 = (ix - radius).max(1);
    let y0 = (iy - radius).max(1);
    let x1 = (ix + radius).min(width as isize - 2);
    let y1 = (iy + radius).min(height as isize - 2);

    let magnitude = maps.magnitude();
    let orientation = maps.orientation();
    for py in y0..=y1 {
        let dy = py as f32 - y;
        let mag_row = magnitude.row(py as usize);
        let ori_row = orientation.row(py as usize);
        for px in x0..=x1 {
            let dx = px as f32 - x;
            let dist_sq = dx * dx + dy * dy;
            if dist_sq > radius_sq {
                continue;
            }
            let weight = (-dist_sq * inv_two_sigma_sq).exp();
            hist.add(ori_row[px as usize], weight * mag_row[px as usize]);
        }
    }

    hist.smooth(params.smoothing_iterations);
    hist
}

/// Returns the interpolated angles of all histogram peaks.
///
/// A bin is a peak when it is at least `peak_threshold` times the maximum
/// and strictly larger than both circular neighbours. The sub-bin position
/// comes from a parabola through the peak and its neighbours. An empty or
/// all-zero histogram has no peaks.
pub fn find_peaks(hist: &OrientationHistogram, peak_threshold: f32) -> Vec<f32> {
    let bins = hist.bins();
    let n = bins.len();
    if n == 0 {
        return Vec::new();
    }
    let threshold = peak_threshold * hist.max();

    let mut angles = Vec::new();
    for (i, &value) in bins.iter().enumerate() {
        let prev = bins[(i + n - 1) % n];
        let next = bins[(i + 1) % n];
        if value >= threshold && value > prev && value > next {
            let delta = parabolic_peak_offset(prev, value, next).unwrap_or(0.0);
            angles.push(hist.angle_at(i as f32 + delta));
        }
    }
    angles
}

/// Orientations for a point according to `mode`.
pub fn dominant_orientations(
    maps: &GradientMaps,
    x: f32,
    y: f32,
    scale: f32,
    mode: OrientationMode,
    params: &HistogramParams,
    peak_threshold: f32,
) -> Vec<f32> {
    match mode {
        OrientationMode::Fixed => vec![0.0],
        OrientationMode::Dominant => {
            let hist = orientation_histogram(maps, x, y, scale, params);
            find_peaks(&hist, peak_threshold)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{find_peaks, OrientationHistogram};
    use std::f32::consts::PI;

    #[test]
    fn extreme_angles_map_to_end_bins() {
        let hist = OrientationHistogram::new(36);
        assert_eq!(hist.bin_index(-PI), 0);
        assert_eq!(hist.bin_index(PI), 35);
        assert_eq!(hist.bin_index(0.0), 17);
    }

    #[test]
    fn smoothing_wraps_and_preserves_mass() {
        let mut bins = vec![0.0f32; 8];
        bins[0] = 3.0;
        let mut hist = OrientationHistogram::from_bins(bins);
        hist.smooth(1);
        assert!((hist.bins()[7] - 1.0).abs() < 1e-6);
        assert!((hist.bins()[0] - 1.0).abs() < 1e-6);
        assert!((hist.bins()[1] - 1.0).abs() < 1e-6);
        hist.smooth(5);
        let total: f32 = hist.bins().iter().sum();
        assert!((total - 3.0).abs() < 1e-5);
    }

    #[test]
    fn zero_histogram_has_no_peaks() {
        assert!(find_peaks(&OrientationHistogram::new(36), 0.8).is_empty());
        assert!(find_peaks(&OrientationHistogram::new(0), 0.8).is_empty());
    }

    #[test]
    fn two_equal_peaks_are_both_reported() {
        let mut bins = vec![0.1f32; 36];
        for (centre, spread) in [(8usize, [0.5f32, 1.0, 0.5]), (26, [0.5, 1.0, 0.5])] {
            bins[centre - 1] = spread[0];
            bins[centre] = spread[1];
            bins[centre + 1] = spread[2];
        }
        let angles = find_peaks(&OrientationHistogram::from_bins(bins), 0.8);
        assert_eq!(angles.len(), 2);
        let bin_width = 2.0 * PI / 36.0;
        assert!((angles[0] - (-PI + 8.5 * bin_width)).abs() < 1e-5);
        assert!((angles[1] - (-PI + 26.5 * bin_width)).abs() < 1e-5);
    }

    #[test]
    fn weaker_peak_below_threshold_is_dropped() {
        let mut bins = vec![0.0f32; 12];
        bins[2] = 1.0;
        bins[8] = 0.5;
        let angles = find_peaks(&OrientationHistogram::from_bins(bins), 0.8);
        assert_eq!(angles.len(), 1);
    }

    #[test]
    fn peak_in_last_bin_wraps() {
        let mut bins = vec![0.0f32; 10];
        bins[9] = 1.0;
        bins[0] = 0.8;
        bins[8] = 0.2;
        let angles = find_peaks(&OrientationHistogram::from_bins(bins), 0.8);
        assert_eq!(angles.len(), 1);
        assert!(angles[0] < -PI + 0.2 || angles[0] > PI - 0.2);
    }
}
