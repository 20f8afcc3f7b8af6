//! Image views and owned single-band float images.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride.
//! The stride counts elements between the starts of consecutive rows, so a
//! stride larger than the width represents padded rows.
//! Gradient maps read levels through views, so padded buffers work directly.
//!
//! `OwnedImage` is the contiguous `f32` buffer every scale level, DoG level
//! and gradient map is stored in.

use crate::util::{DogSiftError, DogSiftResult};

#[cfg(feature = "image-io")]
pub mod io;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> DogSiftResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> DogSiftResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(DogSiftError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> DogSiftResult<usize> {
    if width == 0 || height == 0 {
        return Err(DogSiftError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(DogSiftError::InvalidStride { width, stride });
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(DogSiftError::InvalidDimensions { width, height })?;
    Ok(needed)
}

/// Owned contiguous single-band `f32` image.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Wraps a row-major buffer of exactly `width * height` samples.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> DogSiftResult<Self> {
        let needed = checked_area(width, height)?;
        if data.len() < needed {
            return Err(DogSiftError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(DogSiftError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Creates an image with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> DogSiftResult<Self> {
        let needed = checked_area(width, height)?;
        Ok(Self {
            data: vec![value; needed],
            width,
            height,
        })
    }

    /// Creates an image by evaluating `f(x, y)` at every pixel.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> DogSiftResult<Self>
    where
        F: FnMut(usize, usize) -> f32,
    {
        let needed = checked_area(width, height)?;
        let mut data = Vec::with_capacity(needed);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, f32> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Returns the row-major sample buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Returns the sample at `(x, y)`.
    ///
    /// Panics when the coordinates are outside the image; callers index only
    /// inside the validated interior of an octave.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x]
    }

    /// Returns row `y` as a slice.
    #[inline]
    pub fn row(&self, y: usize) -> &[f32] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }
}

fn checked_area(width: usize, height: usize) -> DogSiftResult<usize> {
    if width == 0 || height == 0 {
        return Err(DogSiftError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .ok_or(DogSiftError::InvalidDimensions { width, height })
}
