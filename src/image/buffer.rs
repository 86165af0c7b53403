// src/image/buffer.rs

//! Float RGB image with OpenEXR-style data and display windows.

use crate::errors::{RawToAcesError, Result};
use crate::types::{Matrix3, PixelBox};

/// Interleaved RGB pixels covering `data_window`.
///
/// `display_window` is the region meant to be shown; it may be smaller than
/// the data window (a soft crop) or equal to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuf {
    pixels: Vec<[f32; 3]>,
    pub data_window: PixelBox,
    pub display_window: PixelBox,
}

impl ImageBuf {
    /// Black image of the given size with both windows at the origin.
    pub fn new(width: usize, height: usize) -> Self {
        let window = PixelBox::new(0, 0, width as i32, height as i32);
        Self {
            pixels: vec![[0.0; 3]; width * height],
            data_window: window,
            display_window: window,
        }
    }

    pub fn from_pixels(width: usize, height: usize, pixels: Vec<[f32; 3]>) -> Result<Self> {
        if pixels.len() != width * height {
            return Err(RawToAcesError::Image(format!(
                "expected {} pixels for a {width}x{height} image, got {}",
                width * height,
                pixels.len()
            )));
        }
        let window = PixelBox::new(0, 0, width as i32, height as i32);
        Ok(Self {
            pixels,
            data_window: window,
            display_window: window,
        })
    }

    pub fn width(&self) -> usize {
        self.data_window.width.max(0) as usize
    }

    pub fn height(&self) -> usize {
        self.data_window.height.max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Pixel at `(x, y)` relative to the data window origin.
    pub fn pixel(&self, x: usize, y: usize) -> [f32; 3] {
        self.pixels[y * self.width() + x]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, value: [f32; 3]) {
        let width = self.width();
        self.pixels[y * width + x] = value;
    }

    pub fn pixels(&self) -> &[[f32; 3]] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [[f32; 3]] {
        &mut self.pixels
    }

    /// Multiply every pixel by `matrix`.
    pub fn apply_matrix(&mut self, matrix: &Matrix3) {
        let m = matrix.map(|row| row.map(|v| v as f32));
        for p in self.pixels.iter_mut() {
            let [r, g, b] = *p;
            *p = [
                m[0][0] * r + m[0][1] * g + m[0][2] * b,
                m[1][0] * r + m[1][1] * g + m[1][2] * b,
                m[2][0] * r + m[2][1] * g + m[2][2] * b,
            ];
        }
    }

    pub fn scale(&mut self, factor: f32) {
        for p in self.pixels.iter_mut() {
            for v in p.iter_mut() {
                *v *= factor;
            }
        }
    }

    /// Copy of the part of the image inside `region`, given in the same
    /// coordinates as the data window. The result starts at the origin.
    pub fn crop(&self, region: &PixelBox) -> Result<Self> {
        let x0 = region.x.max(self.data_window.x);
        let y0 = region.y.max(self.data_window.y);
        let x1 = (region.x + region.width).min(self.data_window.x + self.data_window.width);
        let y1 = (region.y + region.height).min(self.data_window.y + self.data_window.height);
        if x1 <= x0 || y1 <= y0 {
            return Err(RawToAcesError::Image(format!(
                "the crop region {region} does not overlap the image {}",
                self.data_window
            )));
        }

        let width = (x1 - x0) as usize;
        let height = (y1 - y0) as usize;
        let mut pixels = Vec::with_capacity(width * height);
        for y in y0..y1 {
            let row = (y - self.data_window.y) as usize;
            let start = row * self.width() + (x0 - self.data_window.x) as usize;
            pixels.extend_from_slice(&self.pixels[start..start + width]);
        }
        Self::from_pixels(width, height, pixels)
    }
}
