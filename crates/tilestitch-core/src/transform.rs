//! Homogeneous affine transforms in 2D or 3D.

use crate::CoreError;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Affine map `x -> A x + t` stored as a `(d+1) x (d+1)` homogeneous matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AffineRows", into = "AffineRows")]
pub struct AffineTransform {
    m: DMatrix<f64>,
}

/// Row-major `d x (d+1)` serialized form (the constant last row is implied).
#[derive(Clone, Debug, Serialize, Deserialize)]
struct AffineRows {
    rows: Vec<Vec<f64>>,
}

impl TryFrom<AffineRows> for AffineTransform {
    type Error = CoreError;

    fn try_from(value: AffineRows) -> Result<Self, Self::Error> {
        Self::from_rows(&value.rows)
    }
}

impl From<AffineTransform> for AffineRows {
    fn from(t: AffineTransform) -> Self {
        Self { rows: t.to_rows() }
    }
}

fn check_dim(dim: usize) -> Result<(), CoreError> {
    if dim == 2 || dim == 3 {
        Ok(())
    } else {
        Err(CoreError::UnsupportedDimensionality(dim))
    }
}

impl AffineTransform {
    pub fn identity(dim: usize) -> Self {
        Self {
            m: DMatrix::identity(dim + 1, dim + 1),
        }
    }

    pub fn translation(t: &[f64]) -> Self {
        let mut out = Self::identity(t.len());
        out.set_translation(t);
        out
    }

    pub fn scaling(s: &[f64]) -> Self {
        let mut out = Self::identity(s.len());
        for (i, &v) in s.iter().enumerate() {
            out.m[(i, i)] = v;
        }
        out
    }

    /// Build from `d` rows of `d + 1` entries (linear part plus translation column).
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, CoreError> {
        let dim = rows.len();
        check_dim(dim)?;
        let mut m = DMatrix::identity(dim + 1, dim + 1);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != dim + 1 {
                return Err(CoreError::InvalidTransform(format!(
                    "row {r} has {} entries, expected {}",
                    row.len(),
                    dim + 1
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(CoreError::InvalidTransform(format!(
                    "row {r} has non-finite entries"
                )));
            }
            for (c, &v) in row.iter().enumerate() {
                m[(r, c)] = v;
            }
        }
        Ok(Self { m })
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        let d = self.dim();
        (0..d)
            .map(|r| (0..=d).map(|c| self.m[(r, c)]).collect())
            .collect()
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.m.nrows() - 1
    }

    #[inline]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.m
    }

    pub fn translation_part(&self) -> Vec<f64> {
        let d = self.dim();
        (0..d).map(|r| self.m[(r, d)]).collect()
    }

    pub fn set_translation(&mut self, t: &[f64]) {
        let d = self.dim();
        for (r, &v) in t.iter().take(d).enumerate() {
            self.m[(r, d)] = v;
        }
    }

    pub fn linear_part(&self) -> DMatrix<f64> {
        let d = self.dim();
        self.m.view((0, 0), (d, d)).into_owned()
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &AffineTransform) -> AffineTransform {
        debug_assert_eq!(self.dim(), other.dim());
        Self {
            m: &self.m * &other.m,
        }
    }

    pub fn inverse(&self) -> Option<Self> {
        self.m.clone().try_inverse().map(|m| Self { m })
    }

    #[inline]
    pub fn apply(&self, p: &[f64]) -> Vec<f64> {
        let d = self.dim();
        debug_assert_eq!(p.len(), d);
        (0..d)
            .map(|r| {
                let mut acc = self.m[(r, d)];
                for (c, &v) in p.iter().enumerate() {
                    acc += self.m[(r, c)] * v;
                }
                acc
            })
            .collect()
    }

    /// Largest absolute entry-wise difference to `other`.
    pub fn max_abs_diff(&self, other: &AffineTransform) -> f64 {
        if self.dim() != other.dim() {
            return f64::INFINITY;
        }
        self.m
            .iter()
            .zip(other.m.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_affine() -> AffineTransform {
        AffineTransform::from_rows(&[
            vec![1.1, 0.05, -0.02, 12.0],
            vec![-0.03, 0.95, 0.01, -4.0],
            vec![0.0, 0.02, 1.2, 3.5],
        ])
        .expect("valid")
    }

    #[test]
    fn inverse_round_trips_points() {
        let t = sample_affine();
        let inv = t.inverse().expect("invertible");
        for p in [[0.0, 0.0, 0.0], [10.0, -3.0, 7.5], [512.0, 256.0, 40.0]] {
            let back = inv.apply(&t.apply(&p));
            for (a, b) in back.iter().zip(p.iter()) {
                assert_relative_eq!(a, b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn compose_applies_right_operand_first() {
        let shift = AffineTransform::translation(&[5.0, -2.0]);
        let scale = AffineTransform::scaling(&[2.0, 3.0]);
        let p = [1.0, 1.0];
        assert_eq!(scale.compose(&shift).apply(&p), vec![12.0, -3.0]);
        assert_eq!(shift.compose(&scale).apply(&p), vec![7.0, 1.0]);
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(AffineTransform::from_rows(&[vec![1.0, 0.0, 0.0]]).is_err());
        assert!(AffineTransform::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0, 0.0]]).is_err());
    }

    #[test]
    fn serde_uses_row_form() {
        let t = AffineTransform::translation(&[1.5, -2.0]);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"rows":[[1.0,0.0,1.5],[0.0,1.0,-2.0]]}"#);
        let back: AffineTransform = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
