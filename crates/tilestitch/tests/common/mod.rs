//! Synthetic 2 x 2 tile scan over a field of Gaussian blobs.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tilestitch::core::{AffineTransform, Group, InMemoryImages, InMemoryMetadata, PixelRegion, ViewId};

pub const TILE: [usize; 2] = [100, 100];
pub const NOMINAL: [[f64; 2]; 4] = [[0.0, 0.0], [70.0, 0.0], [0.0, 70.0], [70.0, 70.0]];
pub const TRUTH: [[f64; 2]; 4] = [[0.0, 0.0], [72.0, 1.0], [-1.0, 73.0], [73.0, 72.0]];

pub struct Scan {
    pub images: InMemoryImages,
    pub metadata: InMemoryMetadata,
}

pub fn g(i: u32) -> Group {
    Group::single(ViewId::new(0, i))
}

/// Side neighbours of the grid.
pub fn pairs() -> Vec<(Group, Group)> {
    vec![(g(0), g(1)), (g(0), g(2)), (g(1), g(3)), (g(2), g(3))]
}

pub fn scan() -> Scan {
    let mut rng = StdRng::seed_from_u64(17);
    let blobs: Vec<([f64; 2], f64, f64)> = (0..700)
        .map(|_| {
            let c = [rng.random_range(0.0..240.0), rng.random_range(0.0..240.0)];
            let sigma = rng.random_range(2.0..4.0);
            (c, rng.random_range(0.5..1.5), 1.0 / (2.0 * sigma * sigma))
        })
        .collect();

    let mut images = InMemoryImages::new();
    let mut metadata = InMemoryMetadata::new();
    for (i, (truth, nominal)) in TRUTH.iter().zip(NOMINAL).enumerate() {
        let view = ViewId::new(0, i as u32);
        let mut noise = StdRng::seed_from_u64(100 + i as u64);
        let region = PixelRegion::from_fn(TILE.to_vec(), |pos| {
            let p = [pos[0] as f64 + truth[0] + 30.0, pos[1] as f64 + truth[1] + 30.0];
            let v: f64 = blobs
                .iter()
                .map(|(c, amp, k)| {
                    let d2 = (c[0] - p[0]).powi(2) + (c[1] - p[1]).powi(2);
                    amp * (-d2 * k).exp()
                })
                .sum();
            (v + 0.05 * (noise.random::<f64>() - 0.5)) as f32
        })
        .expect("valid dims");
        images.insert(view, region);
        metadata.insert(view, TILE.to_vec(), AffineTransform::translation(&nominal));
    }
    Scan { images, metadata }
}
