//! Real-space validation of shift candidates.

use crate::ShiftCandidate;
use tilestitch_core::PixelRegion;

/// Minimum overlap in pixels for a fraction of the smaller image.
pub fn min_overlap_pixels(fraction: f64, img1: &PixelRegion, img2: &PixelRegion) -> u64 {
    let smaller = img1.num_pixels().min(img2.num_pixels()) as f64;
    ((fraction.clamp(0.0, 1.0) * smaller).ceil() as u64).max(1)
}

/// Per-axis overlap `(start in img1, start in img2, length)` for a shift.
///
/// Bounds are truncated to integers independently in both frames; a length
/// mismatch between the frames or an empty axis yields `None`.
pub fn overlap_extent(shift: &[f64], dims1: &[usize], dims2: &[usize]) -> Option<Vec<(usize, usize, usize)>> {
    shift
        .iter()
        .zip(dims1.iter().zip(dims2))
        .map(|(&t, (&n1, &n2))| {
            let lo1 = t.max(0.0);
            let hi1 = (t + n2 as f64).min(n1 as f64);
            let (s1, e1) = (lo1 as i64, hi1 as i64);
            let (s2, e2) = ((lo1 - t) as i64, (hi1 - t) as i64);
            let len = e1 - s1;
            if len <= 0 || e2 - s2 != len || s2 < 0 || e2 > n2 as i64 {
                return None;
            }
            Some((s1 as usize, s2 as usize, len as usize))
        })
        .collect()
}

/// Pearson correlation of two equally long sample sequences.
///
/// When both are constant the result is `1` for equal values and `0`
/// otherwise; when only one is constant it is `0`.
pub fn pearson(a: &[f32], b: &[f32]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let inv = 1.0 / n as f64;
    let mean_a = a[..n].iter().map(|&v| v as f64).sum::<f64>() * inv;
    let mean_b = b[..n].iter().map(|&v| v as f64).sum::<f64>() * inv;
    let (mut sab, mut saa, mut sbb) = (0.0, 0.0, 0.0);
    for (&x, &y) in a[..n].iter().zip(&b[..n]) {
        let da = x as f64 - mean_a;
        let db = y as f64 - mean_b;
        sab += da * db;
        saa += da * da;
        sbb += db * db;
    }
    match (saa == 0.0, sbb == 0.0) {
        (true, true) => {
            if mean_a == mean_b {
                1.0
            } else {
                0.0
            }
        }
        (true, false) | (false, true) => 0.0,
        (false, false) => sab / (saa * sbb).sqrt(),
    }
}

/// Fill in `cross_corr` and `n_pixels` of `candidate` from the pixels that
/// overlap under its shift. Candidates without enough overlap get zeros.
pub fn calculate_cross_correlation(
    mut candidate: ShiftCandidate,
    img1: &PixelRegion,
    img2: &PixelRegion,
    min_overlap: u64,
) -> ShiftCandidate {
    candidate.cross_corr = 0.0;
    candidate.n_pixels = 0;

    let Some(extent) = overlap_extent(&candidate.shift, img1.dims(), img2.dims()) else {
        return candidate;
    };
    let n: u64 = extent.iter().map(|&(_, _, len)| len as u64).product();
    if n < min_overlap {
        return candidate;
    }

    let start1: Vec<i64> = extent.iter().map(|&(s, _, _)| s as i64).collect();
    let start2: Vec<i64> = extent.iter().map(|&(_, s, _)| s as i64).collect();
    let size: Vec<usize> = extent.iter().map(|&(_, _, len)| len).collect();
    let (Ok(a), Ok(b)) = (img1.crop(&start1, &size), img2.crop(&start2, &size)) else {
        return candidate;
    };

    candidate.cross_corr = pearson(a.data(), b.data());
    candidate.n_pixels = n;
    candidate
}
