//! Iterative sub-pixel / sub-scale localisation of scale-space extrema.

use crate::extrema::checks::passes_edge_test;
use crate::octave::Octave;
use crate::refine::quad3d::{fit_quadratic_3d, QuadraticFit3};

/// Offsets above this magnitude mean the fit did not settle near the sample.
const MAX_OFFSET: f32 = 1.5;

/// Offsets above this magnitude move the sample to the neighbouring pixel.
const SHIFT_OFFSET: f32 = 0.5;

/// Sub-sample offset of a refined extremum in `(scale, y, x)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScaleSpaceOffset {
    pub ds: f32,
    pub dy: f32,
    pub dx: f32,
}

/// Why a candidate was dropped during refinement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// The 3D Hessian could not be inverted.
    SingularHessian,
    /// A shift moved the sample into the border margin.
    OutOfBounds,
    /// An offset component exceeded 1.5 after the last fit.
    OffsetTooLarge,
    /// The interpolated peak is below the normalised magnitude threshold.
    LowContrast,
    /// Another candidate already settled on this pixel.
    Duplicate,
    /// The shifted location failed the curvature ratio test.
    EdgeResponse,
}

/// A candidate that survived refinement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RefinedPoint {
    /// Integer column after any shifts.
    pub x: usize,
    /// Integer row after any shifts.
    pub y: usize,
    /// Integer scale index of the fit.
    pub scale_index: usize,
    /// Offset of the fitted extremum from `(scale_index, y, x)`.
    pub offset: ScaleSpaceOffset,
    /// Interpolated DoG value at the extremum.
    pub value: f32,
    /// Number of re-fits after the first one.
    pub shifts: usize,
}

/// Outcome of refining one candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Refinement {
    Converged(RefinedPoint),
    Rejected(RejectReason),
}

/// Parameters for [`refine_extremum`].
#[derive(Clone, Copy, Debug)]
pub struct RefineParams {
    /// Maximum number of re-fits after shifting to a neighbouring pixel.
    pub max_iterations: usize,
    /// Normalised threshold on the interpolated peak magnitude.
    pub contrast_threshold: f32,
    /// Eigenvalue ratio for re-testing shifted locations.
    pub eigenvalue_ratio: f32,
}

/// One flag per pixel recording where refined extrema have settled.
///
/// Scoped to a single octave scan.
#[derive(Clone, Debug)]
pub struct VisitedMap {
    width: usize,
    flags: Vec<bool>,
}

impl VisitedMap {
    /// Creates an all-clear map.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            flags: vec![false; width * height],
        }
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.width {
            return None;
        }
        let idx = y.checked_mul(self.width)?.checked_add(x)?;
        (idx < self.flags.len()).then_some(idx)
    }

    /// Marks `(x, y)`; returns false if it was already marked or lies
    /// outside the map.
    pub fn mark(&mut self, x: usize, y: usize) -> bool {
        match self.index(x, y) {
            Some(idx) => !std::mem::replace(&mut self.flags[idx], true),
            None => false,
        }
    }

    /// Whether `(x, y)` has been marked; false outside the map.
    pub fn is_marked(&self, x: usize, y: usize) -> bool {
        self.index(x, y).is_some_and(|idx| self.flags[idx])
    }
}

/// Refines the extremum found at `(x, y)` of level `scale_index`.
///
/// The quadratic is re-fitted at a neighbouring pixel whenever the x or y
/// offset exceeds 0.5, at most `max_iterations` times. The last fit is then
/// accepted only if every offset component is within 1.5, the interpolated
/// value clears the contrast threshold, a shifted location still passes the
/// edge test, and no earlier candidate settled on the same pixel.
///
/// A `scale_index` outside `1..octave.len() - 1` or a start pixel outside the
/// octave interior is rejected as [`RejectReason::OutOfBounds`].
pub fn refine_extremum(
    octave: &Octave,
    scale_index: usize,
    x: usize,
    y: usize,
    params: RefineParams,
    visited: &mut VisitedMap,
) -> Refinement {
    let has_neighbours = scale_index >= 1 && scale_index + 1 < octave.len();
    if !has_neighbours || !octave.in_interior(x as isize, y as isize) {
        return Refinement::Rejected(RejectReason::OutOfBounds);
    }

    let levels = octave.levels();
    let prev = &levels[scale_index - 1];
    let cur = &levels[scale_index];
    let next = &levels[scale_index + 1];

    let mut x = x as isize;
    let mut y = y as isize;
    let mut shifts = 0usize;

    let fit: QuadraticFit3 = loop {
        let fit = match fit_quadratic_3d(prev, cur, next, x as usize, y as usize) {
            Some(fit) => fit,
            None => return Refinement::Rejected(RejectReason::SingularHessian),
        };

        let step_y = shift_step(fit.offset[1]);
        let step_x = shift_step(fit.offset[2]);
        if (step_x == 0 && step_y == 0) || shifts >= params.max_iterations {
            break fit;
        }

        x += step_x;
        y += step_y;
        shifts += 1;
        if !octave.in_interior(x, y) {
            return Refinement::Rejected(RejectReason::OutOfBounds);
        }
    };

    if fit.offset.iter().any(|o| o.abs() > MAX_OFFSET) {
        return Refinement::Rejected(RejectReason::OffsetTooLarge);
    }

    let value = fit.interpolated_value();
    if value.abs() < params.contrast_threshold {
        return Refinement::Rejected(RejectReason::LowContrast);
    }

    let (x, y) = (x as usize, y as usize);
    if shifts > 0 && !passes_edge_test(cur, x, y, params.eigenvalue_ratio) {
        return Refinement::Rejected(RejectReason::EdgeResponse);
    }

    if !visited.mark(x, y) {
        return Refinement::Rejected(RejectReason::Duplicate);
    }

    Refinement::Converged(RefinedPoint {
        x,
        y,
        scale_index,
        offset: ScaleSpaceOffset {
            ds: fit.offset[0],
            dy: fit.offset[1],
            dx: fit.offset[2],
        },
        value,
        shifts,
    })
}

#[inline]
fn shift_step(offset: f32) -> isize {
    if offset > SHIFT_OFFSET {
        1
    } else if offset < -SHIFT_OFFSET {
        -1
    } else {
        0
    }
}
