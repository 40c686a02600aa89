#![allow(dead_code)]

use tilestitch_core::{AffineTransform, Group, InMemoryMetadata, TileMetadata, ViewId};
use tilestitch_pairwise::{pair_hash, PairwiseResult};

pub const TILE: [usize; 2] = [100, 100];

/// A 2 x 2 grid of tiles, 90 px apart, whose true positions deviate from
/// the nominal grid by `DEVIATION`.
pub const NOMINAL: [[f64; 2]; 4] = [[0.0, 0.0], [90.0, 0.0], [0.0, 90.0], [90.0, 90.0]];
pub const DEVIATION: [[f64; 2]; 4] = [[0.0, 0.0], [1.5, -0.5], [-1.0, 2.0], [2.5, 1.0]];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn g(i: u32) -> Group {
    Group::single(ViewId::new(0, i))
}

pub fn square_metadata() -> InMemoryMetadata {
    let mut meta = InMemoryMetadata::new();
    for (i, n) in NOMINAL.iter().enumerate() {
        meta.insert(ViewId::new(0, i as u32), TILE.to_vec(), AffineTransform::translation(n));
    }
    meta
}

/// Result between tiles `a` and `b` as a perfect measurement would report it,
/// plus `error` added to the shift.
pub fn measured(meta: &InMemoryMetadata, a: usize, b: usize, error: [f64; 2]) -> PairwiseResult {
    let (ga, gb) = (g(a as u32), g(b as u32));
    let overlap = meta
        .bounding_box(&ga)
        .and_then(|ba| meta.bounding_box(&gb).and_then(|bb| ba.intersect(&bb)))
        .expect("tiles overlap");
    let shift: Vec<f64> = (0..2)
        .map(|k| DEVIATION[b][k] - DEVIATION[a][k] + error[k])
        .collect();
    PairwiseResult {
        hash: pair_hash(&ga, &gb, meta).expect("metadata"),
        pair: (ga, gb),
        shift: AffineTransform::translation(&shift),
        cross_corr: 0.95,
        peak_value: 0.4,
        overlap,
    }
}

/// Four sides and both diagonals of the square.
pub fn square_links(meta: &InMemoryMetadata, corrupt: Option<(usize, usize, [f64; 2])>) -> Vec<PairwiseResult> {
    [(0, 1), (0, 2), (1, 3), (2, 3), (0, 3), (1, 2)]
        .into_iter()
        .map(|(a, b)| {
            let error = match corrupt {
                Some((ca, cb, e)) if (ca, cb) == (a, b) => e,
                _ => [0.0, 0.0],
            };
            measured(meta, a, b, error)
        })
        .collect()
}

pub fn max_placement_error(transforms: &std::collections::BTreeMap<Group, AffineTransform>, groups: &[usize]) -> f64 {
    groups
        .iter()
        .map(|&i| {
            let t = transforms[&g(i as u32)].translation_part();
            (0..2)
                .map(|k| (t[k] - DEVIATION[i][k]).abs())
                .fold(0.0, f64::max)
        })
        .fold(0.0, f64::max)
}
