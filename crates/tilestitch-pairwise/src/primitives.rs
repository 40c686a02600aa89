//! Element-wise complex arithmetic over multi-dimensional grids.

use crate::PairwiseError;
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

/// Magnitudes at or below this are treated as zero by [`ComplexGrid::normalize`].
pub const NORMALIZE_THRESHOLD: f32 = 1e-5;

/// Dense complex grid, x fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct ComplexGrid {
    dims: Vec<usize>,
    data: Vec<Complex<f32>>,
}

impl ComplexGrid {
    pub fn zeros(dims: Vec<usize>) -> Self {
        let len = dims.iter().product();
        Self {
            dims,
            data: vec![Complex::zero(); len],
        }
    }

    pub fn from_data(dims: Vec<usize>, data: Vec<Complex<f32>>) -> Result<Self, PairwiseError> {
        let len: usize = dims.iter().product();
        if len != data.len() {
            return Err(PairwiseError::DimensionMismatch {
                a: dims,
                b: vec![data.len()],
            });
        }
        Ok(Self { dims, data })
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn data(&self) -> &[Complex<f32>] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [Complex<f32>] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<Complex<f32>> {
        self.data
    }

    fn check_shape(&self, other: &ComplexGrid) -> Result<(), PairwiseError> {
        if self.dims != other.dims {
            return Err(PairwiseError::DimensionMismatch {
                a: self.dims.clone(),
                b: other.dims.clone(),
            });
        }
        Ok(())
    }

    /// Scale every sample to unit magnitude; samples with magnitude at or
    /// below `threshold` become zero.
    pub fn normalize_in_place(&mut self, threshold: f32) {
        self.data.par_iter_mut().for_each(|c| {
            let norm = c.norm();
            *c = if norm > threshold {
                *c / norm
            } else {
                Complex::zero()
            };
        });
    }

    pub fn normalize(&self, threshold: f32) -> ComplexGrid {
        let mut out = self.clone();
        out.normalize_in_place(threshold);
        out
    }

    pub fn conjugate_in_place(&mut self) {
        self.data.par_iter_mut().for_each(|c| *c = c.conj());
    }

    pub fn conjugate(&self) -> ComplexGrid {
        let mut out = self.clone();
        out.conjugate_in_place();
        out
    }

    /// `self[i] *= other[i]`.
    pub fn multiply_in_place(&mut self, other: &ComplexGrid) -> Result<(), PairwiseError> {
        self.check_shape(other)?;
        self.data
            .par_iter_mut()
            .zip(other.data.par_iter())
            .for_each(|(a, b)| *a *= *b);
        Ok(())
    }

    pub fn multiply(&self, other: &ComplexGrid) -> Result<ComplexGrid, PairwiseError> {
        let mut out = self.clone();
        out.multiply_in_place(other)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(values: &[(f32, f32)]) -> ComplexGrid {
        ComplexGrid::from_data(
            vec![values.len(), 1],
            values.iter().map(|&(re, im)| Complex::new(re, im)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn normalize_yields_unit_magnitude_or_zero() {
        let g = grid(&[(3.0, 4.0), (0.0, -2.0), (1e-7, 1e-7)]).normalize(NORMALIZE_THRESHOLD);
        assert_relative_eq!(g.data()[0].re, 0.6, epsilon = 1e-6);
        assert_relative_eq!(g.data()[0].im, 0.8, epsilon = 1e-6);
        assert_relative_eq!(g.data()[1].im, -1.0, epsilon = 1e-6);
        assert_eq!(g.data()[2], Complex::zero());
    }

    #[test]
    fn conjugate_flips_imaginary_part() {
        let g = grid(&[(1.0, 2.0), (-3.0, -4.0)]).conjugate();
        assert_eq!(g.data(), &[Complex::new(1.0, -2.0), Complex::new(-3.0, 4.0)]);
    }

    #[test]
    fn multiply_is_complex_product() {
        let a = grid(&[(1.0, 2.0), (0.0, 1.0)]);
        let b = grid(&[(3.0, -1.0), (0.0, 1.0)]);
        let p = a.multiply(&b).unwrap();
        assert_eq!(p.data(), &[Complex::new(5.0, 5.0), Complex::new(-1.0, 0.0)]);
    }

    #[test]
    fn multiply_rejects_shape_mismatch() {
        let a = grid(&[(1.0, 0.0), (1.0, 0.0)]);
        let b = grid(&[(1.0, 0.0)]);
        assert!(matches!(
            a.multiply(&b),
            Err(PairwiseError::DimensionMismatch { .. })
        ));
    }
}
