//! Individual pipeline stages for custom detectors.
//!
//! Most users should go through [`Detector`](crate::Detector); these
//! functions expose the extremum tests, the quadratic fits, histogram
//! construction and patch sampling on their own.

pub use crate::extrema::checks::{first_check, hessian_2d, is_local_extremum, passes_edge_test};
pub use crate::orientation::{
    dominant_orientations, find_peaks, orientation_histogram, HistogramParams,
};
pub use crate::refine::quad1d::parabolic_peak_offset;
pub use crate::refine::quad3d::{fit_quadratic_3d, QuadraticFit3};
pub use crate::refine::{refine_extremum, RefineParams, RefinedPoint, VisitedMap};
pub use crate::sampling::sample_patch;
pub use crate::util::math::{angle_distance, wrap_angle};
