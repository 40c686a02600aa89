//! Axis-aligned boxes in continuous coordinates.
//!
//! Pixel centres sit at integer coordinates and bounds are inclusive, so an
//! axis of `n` pixels spans `[0, n - 1]`.

use crate::AffineTransform;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

/// Integer box produced by [`BoundingBox::rasterize`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterBox {
    pub min: Vec<i64>,
    pub size: Vec<usize>,
}

impl BoundingBox {
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Self {
        debug_assert_eq!(min.len(), max.len());
        Self { min, max }
    }

    /// Box covering all pixel centres of a grid with the given dimensions.
    pub fn of_dims(dims: &[usize]) -> Self {
        Self {
            min: vec![0.0; dims.len()],
            max: dims.iter().map(|&n| n as f64 - 1.0).collect(),
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.min.len()
    }

    pub fn is_empty(&self) -> bool {
        self.min.iter().zip(&self.max).any(|(lo, hi)| hi < lo)
    }

    pub fn center(&self) -> Vec<f64> {
        self.min
            .iter()
            .zip(&self.max)
            .map(|(lo, hi)| 0.5 * (lo + hi))
            .collect()
    }

    /// Intersection, or `None` when the boxes are disjoint along any axis.
    pub fn intersect(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if self.dim() != other.dim() {
            return None;
        }
        let min: Vec<f64> = self
            .min
            .iter()
            .zip(&other.min)
            .map(|(a, b)| a.max(*b))
            .collect();
        let max: Vec<f64> = self
            .max
            .iter()
            .zip(&other.max)
            .map(|(a, b)| a.min(*b))
            .collect();
        let out = BoundingBox { min, max };
        (!out.is_empty()).then_some(out)
    }

    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.intersect(other).is_some()
    }

    /// All `2^d` corners; bit `k` of the index selects `max` along axis `k`.
    pub fn corners(&self) -> Vec<Vec<f64>> {
        let d = self.dim();
        (0..1usize << d)
            .map(|mask| {
                (0..d)
                    .map(|k| {
                        if mask & (1 << k) != 0 {
                            self.max[k]
                        } else {
                            self.min[k]
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Bounding box of the transformed corners.
    pub fn transformed(&self, t: &AffineTransform) -> BoundingBox {
        let d = self.dim();
        let mut min = vec![f64::INFINITY; d];
        let mut max = vec![f64::NEG_INFINITY; d];
        for c in self.corners() {
            let p = t.apply(&c);
            for k in 0..d {
                min[k] = min[k].min(p[k]);
                max[k] = max[k].max(p[k]);
            }
        }
        BoundingBox { min, max }
    }

    /// Conservative integer rasterization: `ceil` on min, `floor` on max, inclusive.
    ///
    /// Returns `None` when any axis ends up with no pixel.
    pub fn rasterize(&self) -> Option<RasterBox> {
        let mut min = Vec::with_capacity(self.dim());
        let mut size = Vec::with_capacity(self.dim());
        for (lo, hi) in self.min.iter().zip(&self.max) {
            let a = (lo - 1e-9).ceil() as i64;
            let b = (hi + 1e-9).floor() as i64;
            if b < a {
                return None;
            }
            min.push(a);
            size.push((b - a + 1) as usize);
        }
        Some(RasterBox { min, size })
    }
}
