//! Local maxima of the correlation surface and their expansion into shifts.

use crate::pcm::{centre_offset, CorrelationSurface};
use crate::ShiftCandidate;
use rayon::prelude::*;

/// A local maximum of the correlation surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Peak {
    pub position: Vec<usize>,
    pub value: f32,
}

fn unravel(mut idx: usize, dims: &[usize]) -> Vec<usize> {
    dims.iter()
        .map(|&n| {
            let p = idx % n;
            idx /= n;
            p
        })
        .collect()
}

/// All samples strictly greater than each of their `2d` axis neighbours,
/// with wrap-around at the borders. Axes of length one are ignored.
///
/// Peaks are returned in scan order.
pub fn find_local_maxima(surface: &CorrelationSurface) -> Vec<Peak> {
    let dims = surface.dims();
    let values = surface.values();
    let mut strides = Vec::with_capacity(dims.len());
    let mut s = 1usize;
    for &n in dims {
        strides.push(s);
        s *= n;
    }

    (0..values.len())
        .into_par_iter()
        .filter_map(|idx| {
            let v = values[idx];
            if !v.is_finite() {
                return None;
            }
            let pos = unravel(idx, dims);
            for (k, &n) in dims.iter().enumerate() {
                if n < 2 {
                    continue;
                }
                let base = idx - pos[k] * strides[k];
                let prev = base + ((pos[k] + n - 1) % n) * strides[k];
                let next = base + ((pos[k] + 1) % n) * strides[k];
                if v <= values[prev] || v <= values[next] {
                    return None;
                }
            }
            Some(Peak { position: pos, value: v })
        })
        .collect()
}

/// The `n` highest peaks. Equal values keep their scan order.
pub fn keep_highest(mut peaks: Vec<Peak>, n: usize) -> Vec<Peak> {
    peaks.sort_by(|a, b| b.value.total_cmp(&a.value));
    peaks.truncate(n);
    peaks
}

/// Every shift a periodic peak position can stand for.
///
/// Along each axis the peak at `p` may be `p` or `p - N`; both are corrected
/// for the different centring offsets of the two images. The result holds
/// `2^d` candidates in axis-bit order (bit `k` set means `p - N` on axis `k`).
pub fn expand_to_shifts(
    peak: &Peak,
    pcm_dims: &[usize],
    img1_dims: &[usize],
    img2_dims: &[usize],
) -> Vec<ShiftCandidate> {
    let d = pcm_dims.len();
    let options: Vec<[f64; 2]> = (0..d)
        .map(|k| {
            let big = pcm_dims[k];
            let p = peak.position[k] as f64;
            let correction =
                centre_offset(big, img2_dims[k]) as f64 - centre_offset(big, img1_dims[k]) as f64;
            [p + correction, p - big as f64 + correction]
        })
        .collect();

    (0..1usize << d)
        .map(|mask| {
            let shift = (0..d)
                .map(|k| options[k][(mask >> k) & 1])
                .collect();
            ShiftCandidate::new(shift, peak.value as f64, peak.position.clone())
        })
        .collect()
}
