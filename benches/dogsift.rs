use criterion::{criterion_group, criterion_main, Criterion};
use dogsift::{
    Detector, DetectorConfig, ExtremaMode, GradientCache, Octave, OctaveParams, OwnedImage,
};
use std::hint::black_box;

/// Gaussian octave of scattered blobs, blurred analytically per level.
fn make_gaussian_octave(width: usize, height: usize, levels: usize) -> Octave {
    let params = OctaveParams::default();
    let blobs: Vec<(f32, f32, f32, f32)> = (0..48)
        .map(|i| {
            let x = ((i * 37) % width) as f32;
            let y = ((i * 61 + 17) % height) as f32;
            let sigma = 1.5 + (i % 5) as f32;
            let amp = if i % 3 == 0 { -0.8 } else { 1.0 };
            (x, y, sigma, amp)
        })
        .collect();

    let images = (0..levels)
        .map(|k| {
            let t = params.initial_sigma * 2f32.powf(k as f32 / params.scales_per_octave as f32);
            OwnedImage::from_fn(width, height, |x, y| {
                blobs
                    .iter()
                    .map(|&(bx, by, s, a)| {
                        let var = s * s + t * t;
                        let d2 = (x as f32 - bx).powi(2) + (y as f32 - by).powi(2);
                        a * (s * s / var) * (-d2 / (2.0 * var)).exp()
                    })
                    .sum()
            })
            .unwrap()
        })
        .collect();
    Octave::new(images, params).unwrap()
}

fn bench_scan(c: &mut Criterion) {
    let gaussian = make_gaussian_octave(256, 256, 6);
    let dog = Octave::difference_of_gaussians(&gaussian).unwrap();

    for (name, mode) in [
        ("scan_basic_256", ExtremaMode::Basic),
        ("scan_interpolated_256", ExtremaMode::Interpolated),
    ] {
        let detector = Detector::new(DetectorConfig {
            magnitude_threshold: 0.01,
            extrema: mode,
            ..DetectorConfig::default()
        })
        .unwrap();
        c.bench_function(name, |b| {
            b.iter(|| black_box(detector.scan(&dog).count()));
        });
    }
}

fn bench_orientations(c: &mut Criterion) {
    let gaussian = make_gaussian_octave(256, 256, 6);
    let dog = Octave::difference_of_gaussians(&gaussian).unwrap();
    let detector = Detector::new(DetectorConfig {
        magnitude_threshold: 0.01,
        ..DetectorConfig::default()
    })
    .unwrap();
    let points: Vec<_> = detector.scan(&dog).collect();

    c.bench_function("dominant_orientations_256", |b| {
        let mut cache = GradientCache::new();
        b.iter(|| {
            let mut total = 0usize;
            for point in &points {
                total += detector
                    .dominant_orientations(&mut cache, &gaussian, point)
                    .unwrap()
                    .len();
            }
            black_box(total)
        });
    });
}

criterion_group!(benches, bench_scan, bench_orientations);
criterion_main!(benches);
