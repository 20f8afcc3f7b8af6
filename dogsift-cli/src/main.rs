use clap::Parser;
use dogsift::image::io::load_gray_image;
use dogsift::{
    Detector, DetectorConfig, ExtremaMode, GradientCache, Octave, OctaveParams, OrientationMode,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "DogSift CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ExtremaModeConfig {
    Basic,
    Interpolated,
}

impl From<ExtremaModeConfig> for ExtremaMode {
    fn from(value: ExtremaModeConfig) -> Self {
        match value {
            ExtremaModeConfig::Basic => ExtremaMode::Basic,
            ExtremaModeConfig::Interpolated => ExtremaMode::Interpolated,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum OrientationModeConfig {
    Dominant,
    Fixed,
}

impl From<OrientationModeConfig> for OrientationMode {
    fn from(value: OrientationModeConfig) -> Self {
        match value {
            OrientationModeConfig::Dominant => OrientationMode::Dominant,
            OrientationModeConfig::Fixed => OrientationMode::Fixed,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OctaveConfigJson {
    initial_sigma: f32,
    scales_per_octave: usize,
    border_pixels: usize,
    octave_size_factor: f32,
}

impl Default for OctaveConfigJson {
    fn default() -> Self {
        let params = OctaveParams::default();
        Self {
            initial_sigma: params.initial_sigma,
            scales_per_octave: params.scales_per_octave,
            border_pixels: params.border_pixels,
            octave_size_factor: params.octave_size_factor,
        }
    }
}

impl From<&OctaveConfigJson> for OctaveParams {
    fn from(value: &OctaveConfigJson) -> Self {
        Self {
            initial_sigma: value.initial_sigma,
            scales_per_octave: value.scales_per_octave,
            border_pixels: value.border_pixels,
            octave_size_factor: value.octave_size_factor,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DetectorConfigJson {
    magnitude_threshold: f32,
    eigenvalue_ratio: f32,
    peak_threshold: f32,
    num_bins: usize,
    hist_scaling: f32,
    smoothing_iterations: usize,
    sampling_radius_factor: f32,
    magnification: f32,
    num_interpolation_iterations: usize,
    extrema: ExtremaModeConfig,
    orientation: OrientationModeConfig,
}

impl Default for DetectorConfigJson {
    fn default() -> Self {
        let cfg = DetectorConfig::default();
        Self {
            magnitude_threshold: cfg.magnitude_threshold,
            eigenvalue_ratio: cfg.eigenvalue_ratio,
            peak_threshold: cfg.peak_threshold,
            num_bins: cfg.num_bins,
            hist_scaling: cfg.hist_scaling,
            smoothing_iterations: cfg.smoothing_iterations,
            sampling_radius_factor: cfg.sampling_radius_factor,
            magnification: cfg.magnification,
            num_interpolation_iterations: cfg.num_interpolation_iterations,
            extrema: ExtremaModeConfig::Interpolated,
            orientation: OrientationModeConfig::Dominant,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Config {
    /// Gaussian levels of one octave, least blurred first.
    gaussian_paths: Vec<String>,
    output_path: Option<String>,
    octave: OctaveConfigJson,
    detector: DetectorConfigJson,
}

#[derive(Debug, Serialize)]
struct KeypointRecord {
    x: f32,
    y: f32,
    scale: f32,
    orientation: f32,
}

#[derive(Debug, Serialize)]
struct Output {
    interest_points: usize,
    keypoints: Vec<KeypointRecord>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("dogsift=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.gaussian_paths.len() < 4 {
        return Err("gaussian_paths must list at least 4 levels of one octave".into());
    }

    let levels = config
        .gaussian_paths
        .iter()
        .map(load_gray_image)
        .collect::<Result<Vec<_>, _>>()?;
    let gaussian = Octave::new(levels, OctaveParams::from(&config.octave))?;
    let dog = Octave::difference_of_gaussians(&gaussian)?;

    let det = &config.detector;
    let detector = Detector::new(DetectorConfig {
        magnitude_threshold: det.magnitude_threshold,
        eigenvalue_ratio: det.eigenvalue_ratio,
        peak_threshold: det.peak_threshold,
        num_bins: det.num_bins,
        hist_scaling: det.hist_scaling,
        smoothing_iterations: det.smoothing_iterations,
        sampling_radius_factor: det.sampling_radius_factor,
        magnification: det.magnification,
        num_interpolation_iterations: det.num_interpolation_iterations,
        extrema: det.extrema.into(),
        orientation: det.orientation.into(),
    })?;

    let mut cache = GradientCache::new();
    let mut interest_points = 0usize;
    let mut keypoints = Vec::new();
    for point in detector.scan(&dog) {
        interest_points += 1;
        let (x, y, scale) = point.to_image_space();
        for orientation in detector.dominant_orientations(&mut cache, &gaussian, &point)? {
            keypoints.push(KeypointRecord {
                x,
                y,
                scale,
                orientation,
            });
        }
    }

    let output = Output {
        interest_points,
        keypoints,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
