//! Octave-parallel detection (feature-gated).

use super::{Detector, Keypoint};
use crate::octave::Octave;
use crate::sampling::AccumulatorFactory;
use crate::util::DogSiftResult;
use rayon::prelude::*;

/// A DoG octave with the Gaussian octave it was built from.
#[derive(Clone, Copy, Debug)]
pub struct OctavePair<'a> {
    pub dog: &'a Octave,
    pub gaussian: &'a Octave,
}

impl Detector {
    /// Runs [`Detector::detect_keypoints`] on every octave in parallel.
    ///
    /// Each worker owns its gradient cache. Results are concatenated in the
    /// order of `octaves`, so the output equals the sequential run.
    pub fn detect_octaves_par<F>(
        &self,
        octaves: &[OctavePair<'_>],
        factory: &F,
    ) -> DogSiftResult<Vec<Keypoint>>
    where
        F: AccumulatorFactory + Sync,
    {
        let per_octave: Vec<Vec<Keypoint>> = octaves
            .par_iter()
            .map(|pair| self.detect_keypoints(pair.dog, pair.gaussian, factory))
            .collect::<DogSiftResult<_>>()?;
        Ok(per_octave.into_iter().flatten().collect())
    }
}
