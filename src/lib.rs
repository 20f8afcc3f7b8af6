//! DogSift detects scale-space interest points in difference-of-Gaussian
//! octaves and samples oriented gradient patches around them.
//!
//! The pipeline is: scan a DoG [`Octave`] for 3D extrema ([`Detector::scan`]),
//! optionally refine them to sub-pixel precision, assign dominant gradient
//! orientations on the matching Gaussian octave, and feed the rotated patch
//! to a user-supplied [`FeatureAccumulator`]. Pyramid construction and
//! descriptor encoding are left to the caller.
//!
//! Optional features: `rayon` (octave-parallel detection), `tracing`
//! (spans and events), `image-io` (loading images from disk).

pub mod detector;
pub mod extrema;
pub mod gradient;
pub mod image;
pub mod lowlevel;
pub mod octave;
pub mod orientation;
mod refine;
pub mod sampling;
mod trace;
pub mod util;

pub use detector::{Detector, DetectorConfig, ExtremaMode, Keypoint};
pub use extrema::{ExtremaScan, InterestPoint, InterestPointSink, ScanStats};
pub use gradient::{GradientCache, GradientMaps};
pub use image::{ImageView, OwnedImage};
pub use octave::{Octave, OctaveParams};
pub use orientation::{OrientationHistogram, OrientationMode};
pub use refine::{Refinement, RejectReason, ScaleSpaceOffset};
pub use sampling::{AccumulatorFactory, FeatureAccumulator, OrientedFeature};
pub use util::{DogSiftError, DogSiftResult};

#[cfg(feature = "rayon")]
pub use detector::OctavePair;
