//! Sub-sample refinement of detected peaks.
//!
//! `quad1d` interpolates orientation-histogram peaks; `quad3d` and
//! `subpixel` localise DoG extrema in `(scale, y, x)`.

pub(crate) mod quad1d;
pub(crate) mod quad3d;
pub(crate) mod subpixel;

pub use subpixel::{
    refine_extremum, RefineParams, RefinedPoint, Refinement, RejectReason, ScaleSpaceOffset,
    VisitedMap,
};
