//! Deterministic synthetic tiles: a field of Gaussian blobs sampled at
//! arbitrary (also fractional) offsets, plus uniform noise.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tilestitch_core::PixelRegion;

struct Blob {
    centre: Vec<f64>,
    amplitude: f64,
    inv_two_sigma2: f64,
}

pub struct Texture {
    blobs: Vec<Blob>,
}

impl Texture {
    /// `count` blobs scattered over `[0, extent)` per axis.
    pub fn random(seed: u64, extent: &[f64], count: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let blobs = (0..count)
            .map(|_| {
                let centre = extent.iter().map(|&e| rng.random_range(0.0..e)).collect();
                let sigma = rng.random_range(2.0..4.0);
                Blob {
                    centre,
                    amplitude: rng.random_range(0.5..1.5),
                    inv_two_sigma2: 1.0 / (2.0 * sigma * sigma),
                }
            })
            .collect();
        Self { blobs }
    }

    pub fn eval(&self, p: &[f64]) -> f64 {
        self.blobs
            .iter()
            .map(|b| {
                let d2: f64 = b.centre.iter().zip(p).map(|(c, x)| (c - x) * (c - x)).sum();
                let e = d2 * b.inv_two_sigma2;
                if e > 30.0 {
                    0.0
                } else {
                    b.amplitude * (-e).exp()
                }
            })
            .sum()
    }

    /// Sample `dims` pixels whose pixel `[0, ..]` sits at `offset` in texture space.
    pub fn render(&self, dims: &[usize], offset: &[f64], noise: f64, seed: u64) -> PixelRegion {
        let mut rng = StdRng::seed_from_u64(seed);
        PixelRegion::from_fn(dims.to_vec(), |pos| {
            let p: Vec<f64> = pos.iter().zip(offset).map(|(&x, o)| x as f64 + o).collect();
            (self.eval(&p) + noise * (rng.random::<f64>() - 0.5)) as f32
        })
        .expect("valid dims")
    }
}
