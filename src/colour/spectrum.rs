// src/colour/spectrum.rs

//! Sampled spectral curves.
//!
//! A [`Spectrum`] is a run of equally spaced samples described by a
//! [`Shape`]. Arithmetic between two spectra is element-wise and only
//! meaningful when both share a shape; everything loaded for solving is
//! resampled to [`REFERENCE_SHAPE`] first.

use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

/// Wavelength range and sampling step, in nanometres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Shape {
    pub first: f32,
    pub last: f32,
    pub step: f32,
}

impl Shape {
    pub const fn new(first: f32, last: f32, step: f32) -> Self {
        Self { first, last, step }
    }

    /// Number of samples the shape describes; zero when `step` is zero.
    pub fn sample_count(&self) -> usize {
        if self.step > 0.0 {
            ((self.last - self.first + self.step) / self.step) as usize
        } else {
            0
        }
    }
}

/// 380–780 nm at 5 nm, 81 samples.
pub const REFERENCE_SHAPE: Shape = Shape::new(380.0, 780.0, 5.0);

/// Shape of a spectrum that has not been populated yet.
pub const EMPTY_SHAPE: Shape = Shape::new(0.0, 0.0, 0.0);

#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub shape: Shape,
    pub values: Vec<f64>,
}

impl Default for Spectrum {
    fn default() -> Self {
        Self::new(0.0, REFERENCE_SHAPE)
    }
}

impl Spectrum {
    /// A spectrum of `shape` with every sample set to `value`.
    pub fn new(value: f64, shape: Shape) -> Self {
        Self {
            shape,
            values: vec![value; shape.sample_count()],
        }
    }

    pub fn from_values(shape: Shape, values: Vec<f64>) -> Self {
        Self { shape, values }
    }

    /// Resample to [`REFERENCE_SHAPE`] by linear interpolation.
    ///
    /// Reference samples outside the source range take the nearest source
    /// sample.
    pub fn reshape(&mut self) {
        if self.shape == REFERENCE_SHAPE {
            return;
        }
        if self.values.is_empty() {
            *self = Self::new(0.0, REFERENCE_SHAPE);
            return;
        }

        let src_first = f64::from(self.shape.first);
        let src_step = f64::from(self.shape.step);
        let dst_first = f64::from(REFERENCE_SHAPE.first);
        let dst_last = f64::from(REFERENCE_SHAPE.last);
        let dst_step = f64::from(REFERENCE_SHAPE.step);

        let mut out = Vec::with_capacity(REFERENCE_SHAPE.sample_count());
        let mut src = 0usize;
        let mut wl_src = src_first;
        let mut wl_dst = dst_first;

        while wl_dst <= dst_last {
            if wl_src < wl_dst && src + 1 < self.values.len() {
                let next_wl_src = src_first + src_step * (src + 1) as f64;
                if next_wl_src <= wl_dst {
                    src += 1;
                    wl_src = next_wl_src;
                    continue;
                }
                let ratio = (wl_dst - wl_src) / (next_wl_src - wl_src);
                out.push(self.values[src] * (1.0 - ratio) + self.values[src + 1] * ratio);
            } else {
                out.push(self.values[src]);
            }
            wl_dst = dst_first + dst_step * out.len() as f64;
        }

        self.values = out;
        self.shape = REFERENCE_SHAPE;
    }

    /// Sum of all samples.
    pub fn integrate(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Largest sample, or zero for an empty spectrum.
    pub fn max(&self) -> f64 {
        self.values.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }

    fn zip_with(&mut self, rhs: &Spectrum, f: impl Fn(f64, f64) -> f64) {
        debug_assert_eq!(self.shape, rhs.shape, "spectrum shapes differ");
        debug_assert_eq!(self.values.len(), rhs.values.len());
        for (l, r) in self.values.iter_mut().zip(&rhs.values) {
            *l = f(*l, *r);
        }
    }
}

macro_rules! spectrum_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:tt) => {
        impl $assign_trait<&Spectrum> for Spectrum {
            fn $assign_method(&mut self, rhs: &Spectrum) {
                self.zip_with(rhs, |l, r| l $op r);
            }
        }

        impl $trait<&Spectrum> for Spectrum {
            type Output = Spectrum;

            fn $method(mut self, rhs: &Spectrum) -> Spectrum {
                self.$assign_method(rhs);
                self
            }
        }

        impl $trait<&Spectrum> for &Spectrum {
            type Output = Spectrum;

            fn $method(self, rhs: &Spectrum) -> Spectrum {
                self.clone().$method(rhs)
            }
        }
    };
}

spectrum_op!(Add, add, AddAssign, add_assign, +);
spectrum_op!(Sub, sub, SubAssign, sub_assign, -);
spectrum_op!(Mul, mul, MulAssign, mul_assign, *);
spectrum_op!(Div, div, DivAssign, div_assign, /);

impl MulAssign<f64> for Spectrum {
    fn mul_assign(&mut self, factor: f64) {
        for v in self.values.iter_mut() {
            *v *= factor;
        }
    }
}
