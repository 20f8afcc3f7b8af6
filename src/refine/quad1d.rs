//! Parabolic interpolation of a sampled 1D peak.

/// Estimates the sub-sample offset of a peak from three samples.
///
/// Given samples at `x = -1, 0, +1` (`fm`, `f0`, `fp`), this returns
/// `δ = 0.5 (fm - fp) / (fm - 2 f0 + fp)`, the vertex of the parabola through
/// them. `None` is returned when the parabola is not concave, the curvature is
/// too small to trust, or the vertex falls outside `[-1, 1]`.
pub fn parabolic_peak_offset(fm: f32, f0: f32, fp: f32) -> Option<f32> {
    if !fm.is_finite() || !f0.is_finite() || !fp.is_finite() {
        return None;
    }

    let denom = fm - 2.0 * f0 + fp;
    if denom >= -1e-12 {
        return None;
    }

    let delta = 0.5 * (fm - fp) / denom;
    if delta.is_finite() && delta.abs() <= 1.0 {
        Some(delta)
    } else {
        None
    }
}
