//! Convenience helpers for loading images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Intensities are mapped
//! from `0..=255` to `[0, 1]`.

use crate::image::OwnedImage;
use crate::util::{DogSiftError, DogSiftResult};
use std::path::Path;

/// Creates an owned float image from a grayscale image buffer.
pub fn owned_from_gray_image(img: &image::GrayImage) -> DogSiftResult<OwnedImage> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let data = img.as_raw().iter().map(|&v| f32::from(v) / 255.0).collect();
    OwnedImage::new(data, width, height)
}

/// Splits a colour image into one float image per RGB band.
pub fn bands_from_rgb_image(img: &image::RgbImage) -> DogSiftResult<[OwnedImage; 3]> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let mut bands = [
        Vec::with_capacity(width * height),
        Vec::with_capacity(width * height),
        Vec::with_capacity(width * height),
    ];
    for pixel in img.pixels() {
        for (band, &value) in bands.iter_mut().zip(pixel.0.iter()) {
            band.push(f32::from(value) / 255.0);
        }
    }
    let [r, g, b] = bands;
    Ok([
        OwnedImage::new(r, width, height)?,
        OwnedImage::new(g, width, height)?,
        OwnedImage::new(b, width, height)?,
    ])
}

/// Loads an image from disk and converts it to a grayscale float image.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> DogSiftResult<OwnedImage> {
    let img = image::open(path).map_err(|err| DogSiftError::ImageIo {
        reason: err.to_string(),
    })?;
    owned_from_gray_image(&img.to_luma8())
}

/// Loads an image from disk and splits it into RGB float bands.
pub fn load_rgb_bands<P: AsRef<Path>>(path: P) -> DogSiftResult<[OwnedImage; 3]> {
    let img = image::open(path).map_err(|err| DogSiftError::ImageIo {
        reason: err.to_string(),
    })?;
    bands_from_rgb_image(&img.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::{bands_from_rgb_image, owned_from_gray_image};

    #[test]
    fn gray_values_are_normalised() {
        let img = image::GrayImage::from_raw(2, 1, vec![0, 255]).unwrap();
        let owned = owned_from_gray_image(&img).unwrap();
        assert_eq!(owned.data(), &[0.0, 1.0]);
    }

    #[test]
    fn rgb_is_split_per_band() {
        let img = image::RgbImage::from_raw(1, 2, vec![255, 0, 51, 0, 255, 0]).unwrap();
        let [r, g, b] = bands_from_rgb_image(&img).unwrap();
        assert_eq!(r.data(), &[1.0, 0.0]);
        assert_eq!(g.data(), &[0.0, 1.0]);
        assert!((b.at(0, 0) - 0.2).abs() < 1e-6);
        assert_eq!(b.at(0, 1), 0.0);
    }
}
