#![cfg(feature = "rayon")]

use dogsift::{
    Detector, DetectorConfig, FeatureAccumulator, Octave, OctavePair, OctaveParams, OwnedImage,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Magnitude-weighted orientation histogram over the whole patch.
struct OrientationSum {
    bins: [f32; 8],
}

impl FeatureAccumulator for OrientationSum {
    fn oversampling_amount(&self) -> f32 {
        0.05
    }

    fn add_sample(&mut self, _sx: f32, _sy: f32, magnitude: f32, orientation: f32) {
        let idx = ((orientation + std::f32::consts::PI) / std::f32::consts::TAU * 8.0) as usize;
        self.bins[idx.min(7)] += magnitude;
    }

    fn feature_vector(&self) -> Vec<f32> {
        self.bins.to_vec()
    }
}

fn smooth_noise_octave(seed: u64, size: usize, factor: f32) -> Octave {
    let mut rng = StdRng::seed_from_u64(seed);
    let blobs: Vec<(f32, f32, f32)> = (0..12)
        .map(|_| {
            (
                rng.random_range(8.0..size as f32 - 8.0),
                rng.random_range(8.0..size as f32 - 8.0),
                rng.random_range(-1.0f32..1.0),
            )
        })
        .collect();
    let params = OctaveParams {
        octave_size_factor: factor,
        ..OctaveParams::default()
    };
    let levels = (0..6)
        .map(|k| {
            let t = params.initial_sigma * 2f32.powf(k as f32 / 3.0);
            let var = 4.0 + t * t;
            OwnedImage::from_fn(size, size, |x, y| {
                blobs
                    .iter()
                    .map(|&(bx, by, a)| {
                        let d2 = (x as f32 - bx).powi(2) + (y as f32 - by).powi(2);
                        a * 4.0 / var * (-d2 / (2.0 * var)).exp()
                    })
                    .sum()
            })
            .unwrap()
        })
        .collect();
    Octave::new(levels, params).unwrap()
}

#[test]
fn parallel_octaves_match_sequential() {
    let gaussians = [
        smooth_noise_octave(1, 96, 1.0),
        smooth_noise_octave(2, 48, 2.0),
        smooth_noise_octave(3, 24, 4.0),
    ];
    let dogs: Vec<Octave> = gaussians
        .iter()
        .map(|g| Octave::difference_of_gaussians(g).unwrap())
        .collect();
    let pairs: Vec<OctavePair<'_>> = dogs
        .iter()
        .zip(&gaussians)
        .map(|(dog, gaussian)| OctavePair { dog, gaussian })
        .collect();

    let detector = Detector::new(DetectorConfig {
        magnitude_threshold: 0.01,
        ..DetectorConfig::default()
    })
    .unwrap();
    let factory = || OrientationSum { bins: [0.0; 8] };

    let mut sequential = Vec::new();
    for pair in &pairs {
        sequential.extend(
            detector
                .detect_keypoints(pair.dog, pair.gaussian, &factory)
                .unwrap(),
        );
    }
    let parallel = detector.detect_octaves_par(&pairs, &factory).unwrap();

    assert!(!sequential.is_empty());
    assert_eq!(sequential, parallel);
}
