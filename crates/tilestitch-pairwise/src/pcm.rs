//! Phase correlation matrix (PCM) between two images.
//!
//! 1. Both images are extended to a common fast FFT size with a mirrored,
//!    cosine-tapered border so they fade to zero instead of wrapping hard.
//! 2. Both are transformed, normalized to unit magnitude, the second is
//!    conjugated and the product is transformed back.
//! 3. The real part is the correlation surface. Its peaks are relative shifts
//!    modulo the extended size (see [`crate::expand_to_shifts`]).

use crate::fft::{fft_nd, next_fast_size};
use crate::primitives::{ComplexGrid, NORMALIZE_THRESHOLD};
use crate::PairwiseError;
use rustfft::num_complex::Complex;
use rustfft::FftDirection;
use std::f64::consts::PI;
use tilestitch_core::PixelRegion;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Default fraction of the image size added as tapered border.
pub const DEFAULT_EXTENSION_FACTOR: f64 = 0.1;

/// Real-valued correlation surface.
#[derive(Clone, Debug)]
pub struct CorrelationSurface {
    dims: Vec<usize>,
    values: Vec<f32>,
}

impl CorrelationSurface {
    pub fn new(dims: Vec<usize>, values: Vec<f32>) -> Result<Self, PairwiseError> {
        if dims.iter().product::<usize>() != values.len() {
            return Err(PairwiseError::DimensionMismatch {
                a: dims,
                b: vec![values.len()],
            });
        }
        Ok(Self { dims, values })
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn index(&self, pos: &[usize]) -> usize {
        let mut idx = 0;
        let mut stride = 1;
        for (p, n) in pos.iter().zip(&self.dims) {
            idx += p * stride;
            stride *= n;
        }
        idx
    }

    #[inline]
    pub fn get(&self, pos: &[usize]) -> f32 {
        self.values[self.index(pos)]
    }

    /// Value at `pos + delta` along `axis`, wrapping around the border.
    #[inline]
    pub fn get_wrapped(&self, pos: &[usize], axis: usize, delta: isize) -> f32 {
        let n = self.dims[axis] as isize;
        let mut p = pos.to_vec();
        p[axis] = (pos[axis] as isize + delta).rem_euclid(n) as usize;
        self.get(&p)
    }
}

/// Extended size along one axis for inputs of sizes `n1` and `n2`.
pub fn extended_size(n1: usize, n2: usize, extension_factor: f64) -> usize {
    let m = n1.max(n2);
    let border = (extension_factor.max(0.0) / 2.0 * m as f64).ceil() as usize;
    next_fast_size(m + 2 * border)
}

/// Offset at which an image of size `n` is centred in an extended axis of size `big`.
#[inline]
pub fn centre_offset(big: usize, n: usize) -> usize {
    (big - n) / 2
}

/// Mirror `x` into `[0, n)` without repeating the edge sample.
#[inline]
fn mirror(x: i64, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as i64 - 1);
    let r = x.rem_euclid(period);
    if r < n as i64 {
        r as usize
    } else {
        (period - r) as usize
    }
}

/// Raised-cosine weight of extended coordinate `x` for an image occupying
/// `[pad, pad + n)` in an axis of size `big`.
#[inline]
fn border_weight(x: i64, pad: usize, n: usize, big: usize) -> f64 {
    let lo = pad as i64;
    let hi = (pad + n) as i64 - 1;
    let (dist, width) = if x < lo {
        (lo - x, pad)
    } else if x > hi {
        (x - hi, big - pad - n)
    } else {
        return 1.0;
    };
    0.5 * (1.0 + (PI * dist as f64 / (width as f64 + 1.0)).cos())
}

/// Centre `img` (mean removed) in a grid of `ext_dims`, filling the border by
/// mirroring and fading it out with a cosine window.
pub fn extend_mirrored(img: &PixelRegion, ext_dims: &[usize]) -> Result<ComplexGrid, PairwiseError> {
    let dims = img.dims();
    if dims.len() != ext_dims.len() || dims.iter().zip(ext_dims).any(|(n, big)| n > big) {
        return Err(PairwiseError::DimensionMismatch {
            a: dims.to_vec(),
            b: ext_dims.to_vec(),
        });
    }
    let mean = img.mean();
    let pads: Vec<usize> = ext_dims
        .iter()
        .zip(dims)
        .map(|(&big, &n)| centre_offset(big, n))
        .collect();

    // Separable per-axis source index and weight tables.
    let tables: Vec<Vec<(usize, f64)>> = (0..dims.len())
        .map(|k| {
            (0..ext_dims[k])
                .map(|x| {
                    let rel = x as i64 - pads[k] as i64;
                    (
                        mirror(rel, dims[k]),
                        border_weight(x as i64, pads[k], dims[k], ext_dims[k]),
                    )
                })
                .collect()
        })
        .collect();

    let len: usize = ext_dims.iter().product();
    let mut data = Vec::with_capacity(len);
    let mut pos = vec![0usize; ext_dims.len()];
    let mut src = vec![0usize; ext_dims.len()];
    for _ in 0..len {
        let mut w = 1.0;
        for k in 0..pos.len() {
            let (s, wk) = tables[k][pos[k]];
            src[k] = s;
            w *= wk;
        }
        let v = if w > 0.0 {
            ((img.get(&src) as f64 - mean) * w) as f32
        } else {
            0.0
        };
        data.push(Complex::new(v, 0.0));
        for (k, p) in pos.iter_mut().enumerate() {
            *p += 1;
            if *p < ext_dims[k] {
                break;
            }
            *p = 0;
        }
    }
    ComplexGrid::from_data(ext_dims.to_vec(), data)
}

/// Compute the phase correlation surface of two images of equal dimensionality.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img1, img2), fields(dims1 = ?img1.dims(), dims2 = ?img2.dims()))
)]
pub fn calculate_pcm(
    img1: &PixelRegion,
    img2: &PixelRegion,
    extension_factor: f64,
) -> Result<CorrelationSurface, PairwiseError> {
    if img1.ndim() != img2.ndim() {
        return Err(PairwiseError::DimensionalityMismatch {
            a: img1.ndim(),
            b: img2.ndim(),
        });
    }
    let ext_dims: Vec<usize> = img1
        .dims()
        .iter()
        .zip(img2.dims())
        .map(|(&a, &b)| extended_size(a, b, extension_factor))
        .collect();

    let mut f1 = extend_mirrored(img1, &ext_dims)?;
    let mut f2 = extend_mirrored(img2, &ext_dims)?;
    fft_nd(&mut f1, FftDirection::Forward);
    fft_nd(&mut f2, FftDirection::Forward);

    f1.normalize_in_place(NORMALIZE_THRESHOLD);
    f2.normalize_in_place(NORMALIZE_THRESHOLD);
    f2.conjugate_in_place();
    f1.multiply_in_place(&f2)?;
    drop(f2);

    fft_nd(&mut f1, FftDirection::Inverse);
    let values = f1.into_data().into_iter().map(|c| c.re).collect();
    CorrelationSurface::new(ext_dims, values)
}
