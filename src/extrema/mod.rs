//! Scale-space extrema detection.
//!
//! [`ExtremaScan`] walks a DoG octave in a fixed order (scale index, then
//! row, then column) and yields every accepted [`InterestPoint`] lazily. The
//! order is deterministic, so two scans of the same octave produce the same
//! sequence. Each scan owns its visited map; dropping the iterator releases
//! it, and calling [`Detector::scan`](crate::Detector::scan) again restarts
//! from the first pixel.

pub mod checks;

use crate::detector::{DetectorConfig, ExtremaMode};
use crate::octave::Octave;
use crate::refine::{
    refine_extremum, RefineParams, Refinement, RejectReason, ScaleSpaceOffset, VisitedMap,
};
use crate::trace::trace_event;
use checks::{first_check, is_local_extremum, passes_edge_test};
use std::sync::atomic::{AtomicBool, Ordering};

/// An accepted scale-space extremum in octave coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterestPoint {
    /// Column, including any sub-pixel offset.
    pub x: f32,
    /// Row, including any sub-pixel offset.
    pub y: f32,
    /// Integer scale index of the DoG level the point was found on.
    pub scale_index: usize,
    /// Sub-sample offset when the point was refined.
    pub offset: Option<ScaleSpaceOffset>,
    /// Blur at the point, in octave pixels.
    pub sigma: f32,
    /// Size of one octave pixel in level-0 pixels.
    pub octave_size_factor: f32,
    /// DoG response (interpolated when refined).
    pub value: f32,
}

impl InterestPoint {
    /// Returns `(x, y, sigma)` in level-0 image coordinates.
    pub fn to_image_space(&self) -> (f32, f32, f32) {
        let f = self.octave_size_factor;
        (self.x * f, self.y * f, self.sigma * f)
    }
}

/// Consumer of interest points, invoked once per point in scan order.
pub trait InterestPointSink {
    fn on_interest_point(&mut self, point: InterestPoint);
}

impl<F> InterestPointSink for F
where
    F: FnMut(InterestPoint),
{
    fn on_interest_point(&mut self, point: InterestPoint) {
        self(point)
    }
}

/// Counters collected during one scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Pixels that passed the magnitude pre-filter.
    pub above_threshold: usize,
    /// Pixels that were 3D local extrema.
    pub extrema: usize,
    /// Extrema rejected by the curvature ratio test.
    pub edge_rejected: usize,
    /// Extrema rejected during refinement, by reason.
    pub singular: usize,
    pub out_of_bounds: usize,
    pub offset_too_large: usize,
    pub low_contrast: usize,
    pub duplicate: usize,
    pub shifted_edge: usize,
    /// Points yielded.
    pub accepted: usize,
}

impl ScanStats {
    fn record_rejection(&mut self, reason: RejectReason) {
        match reason {
            RejectReason::SingularHessian => self.singular += 1,
            RejectReason::OutOfBounds => self.out_of_bounds += 1,
            RejectReason::OffsetTooLarge => self.offset_too_large += 1,
            RejectReason::LowContrast => self.low_contrast += 1,
            RejectReason::Duplicate => self.duplicate += 1,
            RejectReason::EdgeResponse => self.shifted_edge += 1,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Cursor {
    s: usize,
    y: usize,
    x: usize,
    s_end: usize,
    y_begin: usize,
    y_end: usize,
    x_begin: usize,
    x_end: usize,
}

impl Cursor {
    fn new(octave: &Octave) -> Self {
        let border = octave.params().border_pixels;
        Self {
            s: 1,
            y: border,
            x: border,
            s_end: octave.len() - 1,
            y_begin: border,
            y_end: octave.height() - border,
            x_begin: border,
            x_end: octave.width() - border,
        }
    }

    fn is_row_start(&self) -> bool {
        self.x == self.x_begin
    }

    fn current(&self) -> Option<(usize, usize, usize)> {
        (self.s < self.s_end).then_some((self.s, self.y, self.x))
    }

    fn advance(&mut self) {
        self.x += 1;
        if self.x < self.x_end {
            return;
        }
        self.x = self.x_begin;
        self.y += 1;
        if self.y < self.y_end {
            return;
        }
        self.y = self.y_begin;
        self.s += 1;
    }
}

/// Lazy, in-order iterator over the interest points of one DoG octave.
pub struct ExtremaScan<'a> {
    octave: &'a Octave,
    mode: ExtremaMode,
    threshold: f32,
    eigenvalue_ratio: f32,
    refine: RefineParams,
    cursor: Cursor,
    visited: Option<VisitedMap>,
    cancel: Option<&'a AtomicBool>,
    stats: ScanStats,
    finished: bool,
}

impl<'a> ExtremaScan<'a> {
    pub(crate) fn new(
        octave: &'a Octave,
        cfg: &DetectorConfig,
        cancel: Option<&'a AtomicBool>,
    ) -> Self {
        let threshold = octave.normalised_threshold(cfg.magnitude_threshold);
        let visited = match cfg.extrema {
            ExtremaMode::Interpolated => Some(VisitedMap::new(octave.width(), octave.height())),
            ExtremaMode::Basic => None,
        };
        Self {
            octave,
            mode: cfg.extrema,
            threshold,
            eigenvalue_ratio: cfg.eigenvalue_ratio,
            refine: RefineParams {
                max_iterations: cfg.num_interpolation_iterations,
                contrast_threshold: threshold,
                eigenvalue_ratio: cfg.eigenvalue_ratio,
            },
            cursor: Cursor::new(octave),
            visited,
            cancel,
            stats: ScanStats::default(),
            finished: false,
        }
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let stats = self.stats;
        trace_event!(
            "extrema_scan_done",
            above_threshold = stats.above_threshold,
            extrema = stats.extrema,
            edge_rejected = stats.edge_rejected,
            refine_rejected = stats.singular
                + stats.out_of_bounds
                + stats.offset_too_large
                + stats.low_contrast
                + stats.duplicate
                + stats.shifted_edge,
            accepted = stats.accepted,
        );
    }

    fn evaluate(&mut self, s: usize, y: usize, x: usize) -> Option<InterestPoint> {
        let levels = self.octave.levels();
        let cur = &levels[s];
        let value = cur.at(x, y);
        if !first_check(value, self.threshold) {
            return None;
        }
        self.stats.above_threshold += 1;

        if !is_local_extremum([&levels[s - 1], cur, &levels[s + 1]], x, y, value) {
            return None;
        }
        self.stats.extrema += 1;

        if !passes_edge_test(cur, x, y, self.eigenvalue_ratio) {
            self.stats.edge_rejected += 1;
            return None;
        }

        let params = self.octave.params();
        let point = match (self.mode, self.visited.as_mut()) {
            (ExtremaMode::Interpolated, Some(visited)) => {
                match refine_extremum(self.octave, s, x, y, self.refine, visited) {
                    Refinement::Converged(refined) => InterestPoint {
                        x: refined.x as f32 + refined.offset.dx,
                        y: refined.y as f32 + refined.offset.dy,
                        scale_index: s,
                        offset: Some(refined.offset),
                        sigma: self.octave.sigma_at(s as f32 + refined.offset.ds),
                        octave_size_factor: params.octave_size_factor,
                        value: refined.value,
                    },
                    Refinement::Rejected(reason) => {
                        self.stats.record_rejection(reason);
                        return None;
                    }
                }
            }
            _ => InterestPoint {
                x: x as f32,
                y: y as f32,
                scale_index: s,
                offset: None,
                sigma: self.octave.sigma_at(s as f32),
                octave_size_factor: params.octave_size_factor,
                value,
            },
        };

        self.stats.accepted += 1;
        Some(point)
    }
}

impl Iterator for ExtremaScan<'_> {
    type Item = InterestPoint;

    fn next(&mut self) -> Option<InterestPoint> {
        if self.finished {
            return None;
        }
        while let Some((s, y, x)) = self.cursor.current() {
            if self.cursor.is_row_start() && self.cancelled() {
                break;
            }
            self.cursor.advance();
            if let Some(point) = self.evaluate(s, y, x) {
                return Some(point);
            }
        }

        self.finish();
        None
    }
}
