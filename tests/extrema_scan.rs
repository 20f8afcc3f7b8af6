use dogsift::{
    Detector, DetectorConfig, ExtremaMode, InterestPoint, Octave, OctaveParams, OwnedImage,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};

const SIZE: usize = 21;

fn params() -> OctaveParams {
    OctaveParams {
        border_pixels: 2,
        ..OctaveParams::default()
    }
}

fn detector(mode: ExtremaMode) -> Detector {
    Detector::new(DetectorConfig {
        extrema: mode,
        ..DetectorConfig::default()
    })
    .unwrap()
}

/// Three DoG levels of `f(x, y)` scaled by `weights`.
fn stack<F>(weights: [f32; 3], f: F) -> Octave
where
    F: Fn(usize, usize) -> f32,
{
    let levels = weights
        .iter()
        .map(|&w| OwnedImage::from_fn(SIZE, SIZE, |x, y| w * f(x, y)).unwrap())
        .collect();
    Octave::new(levels, params()).unwrap()
}

fn noise_octave(seed: u64, size: usize, levels: usize) -> Octave {
    let mut rng = StdRng::seed_from_u64(seed);
    let levels = (0..levels)
        .map(|_| {
            let data = (0..size * size)
                .map(|_| rng.random_range(-1.0f32..1.0))
                .collect();
            OwnedImage::new(data, size, size).unwrap()
        })
        .collect();
    Octave::new(levels, params()).unwrap()
}

#[test]
fn constant_octaves_yield_nothing() {
    let gaussian = Octave::new(
        (0..4)
            .map(|_| OwnedImage::filled(SIZE, SIZE, 0.7).unwrap())
            .collect(),
        params(),
    )
    .unwrap();
    let dog = Octave::difference_of_gaussians(&gaussian).unwrap();
    let plateau = stack([1.0, 1.0, 1.0], |_, _| 0.5);
    for mode in [ExtremaMode::Basic, ExtremaMode::Interpolated] {
        assert_eq!(detector(mode).scan(&dog).count(), 0);
        assert_eq!(detector(mode).scan(&plateau).count(), 0);
    }
}

#[test]
fn replicated_delta_gives_one_point() {
    let dog = stack([1.0, 1.0, 1.0], |x, y| if (x, y) == (7, 12) { 1.0 } else { 0.0 });
    let points: Vec<InterestPoint> = detector(ExtremaMode::Basic).scan(&dog).collect();
    assert_eq!(points.len(), 1);
    let p = points[0];
    assert_eq!((p.x, p.y, p.scale_index), (7.0, 12.0, 1));
    assert!(p.offset.is_none());
    assert!((p.sigma - dog.sigma_at(1.0)).abs() < 1e-6);
}

#[test]
fn negative_delta_is_a_minimum() {
    let dog = stack([0.5, 1.0, 0.5], |x, y| if (x, y) == (9, 4) { -1.0 } else { 0.0 });
    let points: Vec<InterestPoint> = detector(ExtremaMode::Basic).scan(&dog).collect();
    assert_eq!(points.len(), 1);
    assert_eq!((points[0].x, points[0].y), (9.0, 4.0));
    assert!(points[0].value < 0.0);
}

#[test]
fn scale_peaked_delta_refines_in_place() {
    let dog = stack([0.5, 1.0, 0.5], |x, y| if (x, y) == (10, 8) { 1.0 } else { 0.0 });
    let points: Vec<InterestPoint> = detector(ExtremaMode::Interpolated).scan(&dog).collect();
    assert_eq!(points.len(), 1);
    let p = points[0];
    let offset = p.offset.expect("refined point carries an offset");
    assert!(offset.ds.abs() < 1e-6 && offset.dx.abs() < 1e-6 && offset.dy.abs() < 1e-6);
    assert_eq!((p.x, p.y), (10.0, 8.0));
    assert!((p.value - 1.0).abs() < 1e-6);
}

#[test]
fn ridge_is_rejected_but_blob_passes() {
    let ridge = stack([0.5, 1.0, 0.5], |x, _| {
        let dx = x as f32 - 10.0;
        (-dx * dx / 8.0).exp()
    });
    let mut scan = detector(ExtremaMode::Basic).scan(&ridge);
    assert_eq!(scan.by_ref().count(), 0);
    let stats = *scan.stats();
    assert!(stats.extrema > 0);
    assert_eq!(stats.edge_rejected, stats.extrema);

    let blob = stack([0.5, 1.0, 0.5], |x, y| {
        let dx = x as f32 - 10.0;
        let dy = y as f32 - 10.0;
        (-(dx * dx + dy * dy) / 8.0).exp()
    });
    let points: Vec<InterestPoint> = detector(ExtremaMode::Basic).scan(&blob).collect();
    assert_eq!(points.len(), 1);
    assert_eq!((points[0].x, points[0].y), (10.0, 10.0));
}

#[test]
fn below_threshold_is_ignored() {
    // 0.04 / 3 scales is the effective threshold.
    let dog = stack([0.5, 1.0, 0.5], |x, y| if (x, y) == (10, 10) { 0.012 } else { 0.0 });
    assert_eq!(detector(ExtremaMode::Basic).scan(&dog).count(), 0);
    let dog = stack([0.5, 1.0, 0.5], |x, y| if (x, y) == (10, 10) { 0.014 } else { 0.0 });
    assert_eq!(detector(ExtremaMode::Basic).scan(&dog).count(), 1);
}

#[test]
fn scans_are_deterministic_and_ordered() {
    let dog = noise_octave(42, 40, 5);
    for mode in [ExtremaMode::Basic, ExtremaMode::Interpolated] {
        let det = detector(mode);
        let first: Vec<InterestPoint> = det.scan(&dog).collect();
        let second: Vec<InterestPoint> = det.scan(&dog).collect();
        assert!(!first.is_empty());
        assert_eq!(first, second);

        let keys: Vec<(usize, usize, usize)> = first
            .iter()
            .map(|p| match p.offset {
                Some(o) => (
                    p.scale_index,
                    (p.y - o.dy).round() as usize,
                    (p.x - o.dx).round() as usize,
                ),
                None => (p.scale_index, p.y as usize, p.x as usize),
            })
            .collect();
        if mode == ExtremaMode::Basic {
            assert!(keys.windows(2).all(|w| w[0] < w[1]));
        } else {
            assert!(keys.windows(2).all(|w| w[0].0 <= w[1].0));
        }
    }
}

#[test]
fn drain_into_matches_scan() {
    let dog = noise_octave(3, 32, 4);
    let det = detector(ExtremaMode::Interpolated);
    let mut sunk = Vec::new();
    let delivered = det.drain_into(&dog, &mut |p: InterestPoint| sunk.push(p));
    let scanned: Vec<InterestPoint> = det.scan(&dog).collect();
    assert_eq!(delivered, scanned.len());
    assert_eq!(sunk, scanned);
}

#[test]
fn cancellation_stops_at_the_next_row() {
    let dog = noise_octave(11, 40, 5);
    let det = detector(ExtremaMode::Basic);
    let full = det.scan(&dog).count();

    let cancel = AtomicBool::new(true);
    assert_eq!(det.scan_cancellable(&dog, &cancel).count(), 0);

    let cancel = AtomicBool::new(false);
    let mut seen = Vec::new();
    for point in det.scan_cancellable(&dog, &cancel) {
        cancel.store(true, Ordering::Relaxed);
        seen.push(point);
    }
    assert!(!seen.is_empty());
    assert!(seen.len() < full);
    let row = (seen[0].scale_index, seen[0].y);
    assert!(seen.iter().all(|p| (p.scale_index, p.y) == row));
}

#[test]
fn image_space_mapping_uses_octave_size_factor() {
    let levels = (0..3)
        .map(|w| {
            OwnedImage::from_fn(SIZE, SIZE, |x, y| {
                let peak = if w == 1 { 1.0 } else { 0.5 };
                if (x, y) == (6, 5) {
                    peak
                } else {
                    0.0
                }
            })
            .unwrap()
        })
        .collect();
    let dog = Octave::new(
        levels,
        OctaveParams {
            octave_size_factor: 2.0,
            ..params()
        },
    )
    .unwrap();
    let point = detector(ExtremaMode::Basic).scan(&dog).next().unwrap();
    let (x, y, sigma) = point.to_image_space();
    assert_eq!((x, y), (12.0, 10.0));
    assert!((sigma - 2.0 * dog.sigma_at(1.0)).abs() < 1e-5);
}
