//! Error types for dogsift.

use thiserror::Error;

/// Result alias for dogsift operations.
pub type DogSiftResult<T> = std::result::Result<T, DogSiftError>;

/// Errors that can occur when constructing inputs or running the detector.
///
/// Scan loops never produce errors: every structural precondition is checked
/// once when an [`Octave`](crate::Octave) or [`Detector`](crate::Detector) is
/// built, and numeric degeneracies are reported as soft rejections instead.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum DogSiftError {
    /// Width or height is zero or overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the requested view.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// An index into a level, band or histogram is out of range.
    #[error("{context} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
    /// The octave has fewer levels than the 3D neighbourhood test needs.
    #[error("octave needs at least {min} levels, got {got}")]
    TooFewLevels { got: usize, min: usize },
    /// A level does not match the size of level 0.
    #[error("level {level} is {got:?}, expected {expected:?}")]
    LevelSizeMismatch {
        level: usize,
        expected: (usize, usize),
        got: (usize, usize),
    },
    /// The border margin leaves no scannable interior.
    #[error("border of {border} pixels leaves no interior in a {width}x{height} level")]
    BorderTooLarge {
        border: usize,
        width: usize,
        height: usize,
    },
    /// Octave metadata is out of range.
    #[error("invalid octave parameters: {reason}")]
    InvalidOctaveParams { reason: &'static str },
    /// Detector configuration is out of range.
    #[error("invalid detector configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Two octaves that must describe the same scale levels disagree.
    #[error("octave mismatch: {reason}")]
    OctaveMismatch { reason: &'static str },
    /// Failure while loading an image from disk.
    #[error("image io: {reason}")]
    ImageIo { reason: String },
}
