//! Linear least-squares fit of per-group transforms to point matches.
//!
//! Every group `g` gets a transform `M_g`. A match `(q_a, q_b)` between
//! groups `a` and `b` asks for `M_a(q_a) = M_b(q_b)`. Fixed groups keep the
//! identity. The normal equations are assembled densely and solved with a
//! Cholesky factorization, falling back to LU.

use crate::GlobalOptError;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tilestitch_core::AffineTransform;

/// Family of per-group transforms being fitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformModel {
    #[default]
    Translation,
    /// Full affine; `regularization` pulls the linear part towards identity.
    Affine { regularization: f64 },
}

impl TransformModel {
    /// Unknowns per free group.
    pub fn params_per_group(&self, dim: usize) -> usize {
        match self {
            TransformModel::Translation => dim,
            TransformModel::Affine { .. } => dim * (dim + 1),
        }
    }
}

/// One point correspondence between two groups.
#[derive(Clone, Debug, PartialEq)]
pub struct PointMatch {
    pub point_a: Vec<f64>,
    pub point_b: Vec<f64>,
}

/// All matches contributed by one pairwise result.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub a: usize,
    pub b: usize,
    pub weight: f64,
    pub matches: Vec<PointMatch>,
}

impl Link {
    /// Mean distance between the mapped match points.
    pub fn error(&self, transforms: &[AffineTransform]) -> f64 {
        if self.matches.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .matches
            .iter()
            .map(|m| {
                let pa = transforms[self.a].apply(&m.point_a);
                let pb = transforms[self.b].apply(&m.point_b);
                pa.iter()
                    .zip(&pb)
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f64>()
                    .sqrt()
            })
            .sum();
        sum / self.matches.len() as f64
    }
}

/// Column offset of each free group's parameters, `None` for fixed groups.
fn layout(fixed: &[bool], per_group: usize) -> (Vec<Option<usize>>, usize) {
    let mut next = 0;
    let cols = fixed
        .iter()
        .map(|&f| {
            if f {
                None
            } else {
                let c = next;
                next += per_group;
                Some(c)
            }
        })
        .collect();
    (cols, next)
}

/// Coefficients of coordinate `row` of `M_g(p)`: `(column, value)` pairs for a
/// free group, or the constant `p[row]` for a fixed one.
fn coordinate_terms(
    model: TransformModel,
    dim: usize,
    col: Option<usize>,
    p: &[f64],
    row: usize,
    sign: f64,
    terms: &mut Vec<(usize, f64)>,
) -> f64 {
    let Some(c) = col else {
        return sign * p[row];
    };
    match model {
        TransformModel::Translation => {
            terms.push((c + row, sign));
            sign * p[row]
        }
        TransformModel::Affine { .. } => {
            let base = c + row * (dim + 1);
            for (k, &v) in p.iter().enumerate() {
                terms.push((base + k, sign * v));
            }
            terms.push((base + dim, sign));
            0.0
        }
    }
}

fn unpack(model: TransformModel, dim: usize, x: &DVector<f64>, col: Option<usize>) -> Result<AffineTransform, GlobalOptError> {
    let Some(c) = col else {
        return Ok(AffineTransform::identity(dim));
    };
    match model {
        TransformModel::Translation => {
            let t: Vec<f64> = (0..dim).map(|i| x[c + i]).collect();
            Ok(AffineTransform::translation(&t))
        }
        TransformModel::Affine { .. } => {
            let rows: Vec<Vec<f64>> = (0..dim)
                .map(|r| (0..=dim).map(|k| x[c + r * (dim + 1) + k]).collect())
                .collect();
            Ok(AffineTransform::from_rows(&rows)?)
        }
    }
}

/// Fit one transform per group; `fixed[g]` groups stay the identity.
pub fn solve(
    model: TransformModel,
    dim: usize,
    fixed: &[bool],
    links: &[Link],
) -> Result<Vec<AffineTransform>, GlobalOptError> {
    let per_group = model.params_per_group(dim);
    let (cols, unknowns) = layout(fixed, per_group);
    if unknowns == 0 {
        return Ok(vec![AffineTransform::identity(dim); fixed.len()]);
    }

    let mut ata = DMatrix::<f64>::zeros(unknowns, unknowns);
    let mut atb = DVector::<f64>::zeros(unknowns);
    let mut terms = Vec::with_capacity(2 * (dim + 1));

    for link in links {
        for m in &link.matches {
            for row in 0..dim {
                terms.clear();
                // residual = M_a(q_a) - M_b(q_b) = sum(coef * x) + constant
                let mut constant = coordinate_terms(model, dim, cols[link.a], &m.point_a, row, 1.0, &mut terms);
                constant += coordinate_terms(model, dim, cols[link.b], &m.point_b, row, -1.0, &mut terms);
                for &(i, ci) in &terms {
                    atb[i] -= link.weight * ci * constant;
                    for &(j, cj) in &terms {
                        ata[(i, j)] += link.weight * ci * cj;
                    }
                }
            }
        }
    }

    if let TransformModel::Affine { regularization } = model {
        if regularization > 0.0 {
            for c in cols.iter().flatten() {
                for r in 0..dim {
                    for k in 0..dim {
                        let i = c + r * (dim + 1) + k;
                        ata[(i, i)] += regularization;
                        if r == k {
                            atb[i] += regularization;
                        }
                    }
                }
            }
        }
    }

    let x = match ata.clone().cholesky() {
        Some(chol) => chol.solve(&atb),
        None => ata
            .lu()
            .solve(&atb)
            .ok_or(GlobalOptError::Singular { unknowns })?,
    };
    if x.iter().any(|v| !v.is_finite()) {
        return Err(GlobalOptError::Singular { unknowns });
    }

    cols.iter().map(|&c| unpack(model, dim, &x, c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn corner_link(a: usize, b: usize, shift: [f64; 2]) -> Link {
        // q_b is a point of b; a sees it at q_b + shift.
        let corners = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0]];
        Link {
            a,
            b,
            weight: 1.0,
            matches: corners
                .iter()
                .map(|q| PointMatch {
                    point_a: vec![q[0] + shift[0], q[1] + shift[1]],
                    point_b: q.to_vec(),
                })
                .collect(),
        }
    }

    #[test]
    fn chain_of_translations_is_exact() {
        let links = vec![corner_link(0, 1, [2.0, -1.0]), corner_link(1, 2, [0.5, 3.0])];
        let t = solve(TransformModel::Translation, 2, &[true, false, false], &links).unwrap();
        assert_eq!(t[0], AffineTransform::identity(2));
        let t1 = t[1].translation_part();
        let t2 = t[2].translation_part();
        assert_relative_eq!(t1[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(t1[1], -1.0, epsilon = 1e-9);
        assert_relative_eq!(t2[0], 2.5, epsilon = 1e-9);
        assert_relative_eq!(t2[1], 2.0, epsilon = 1e-9);
        assert!(links.iter().all(|l| l.error(&t) < 1e-9));
    }

    #[test]
    fn affine_with_regularization_matches_translation_data() {
        let links = vec![corner_link(0, 1, [4.0, 1.0])];
        let t = solve(
            TransformModel::Affine { regularization: 0.1 },
            2,
            &[true, false],
            &links,
        )
        .unwrap();
        assert!(t[1].max_abs_diff(&AffineTransform::translation(&[4.0, 1.0])) < 1e-9);
    }

    #[test]
    fn inconsistent_cycle_spreads_the_error() {
        let links = vec![
            corner_link(0, 1, [10.0, 0.0]),
            corner_link(1, 2, [10.0, 0.0]),
            corner_link(0, 2, [23.0, 0.0]),
        ];
        let t = solve(TransformModel::Translation, 2, &[true, false, false], &links).unwrap();
        let errors: Vec<f64> = links.iter().map(|l| l.error(&t)).collect();
        for e in errors {
            assert_relative_eq!(e, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn unanchored_group_is_singular() {
        let links = vec![corner_link(0, 1, [1.0, 0.0])];
        let r = solve(TransformModel::Translation, 2, &[true, false, false], &links);
        assert_eq!(r, Err(GlobalOptError::Singular { unknowns: 4 }));
    }
}
