//! Best shift between two images from their correlation surface.

use crate::crosscorr::{calculate_cross_correlation, min_overlap_pixels};
use crate::pcm::CorrelationSurface;
use crate::peaks::{expand_to_shifts, find_local_maxima, keep_highest};
use crate::{PairSkip, ShiftCandidate};
use log::debug;
use rayon::prelude::*;
use tilestitch_core::PixelRegion;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Knobs of the peak search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShiftSearch {
    pub peaks_to_check: usize,
    pub min_overlap_fraction: f64,
    pub subpixel: bool,
}

impl Default for ShiftSearch {
    fn default() -> Self {
        Self {
            peaks_to_check: 5,
            min_overlap_fraction: 0.05,
            subpixel: true,
        }
    }
}

/// Per-axis parabolic vertex offset around `pos`, each clamped to `[-0.5, 0.5]`.
///
/// Axes where the three samples do not form a maximum contribute zero.
pub fn subpixel_offset(surface: &CorrelationSurface, pos: &[usize]) -> Vec<f64> {
    let centre = surface.get(pos) as f64;
    (0..pos.len())
        .map(|k| {
            if surface.dims()[k] < 3 {
                return 0.0;
            }
            let prev = surface.get_wrapped(pos, k, -1) as f64;
            let next = surface.get_wrapped(pos, k, 1) as f64;
            let denom = prev - 2.0 * centre + next;
            if denom >= 0.0 || !denom.is_finite() {
                return 0.0;
            }
            (0.5 * (prev - next) / denom).clamp(-0.5, 0.5)
        })
        .collect()
}

/// Search the correlation surface for the shift of `img2` relative to `img1`.
///
/// Candidate validation runs on the current rayon pool; call it inside
/// [`rayon::ThreadPool::install`] to bound it.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(peaks = search.peaks_to_check))
)]
pub fn find_shift(
    surface: &CorrelationSurface,
    img1: &PixelRegion,
    img2: &PixelRegion,
    search: &ShiftSearch,
) -> Result<ShiftCandidate, PairSkip> {
    let peaks = keep_highest(find_local_maxima(surface), search.peaks_to_check.max(1));
    if peaks.is_empty() {
        return Err(PairSkip::NoPeakFound);
    }

    let candidates: Vec<ShiftCandidate> = peaks
        .iter()
        .flat_map(|p| expand_to_shifts(p, surface.dims(), img1.dims(), img2.dims()))
        .collect();
    let min_overlap = min_overlap_pixels(search.min_overlap_fraction, img1, img2);
    let mut validated: Vec<ShiftCandidate> = candidates
        .into_par_iter()
        .map(|c| calculate_cross_correlation(c, img1, img2, min_overlap))
        .filter(ShiftCandidate::is_valid)
        .collect();
    debug!(
        "{} peaks, {} valid candidates (min overlap {} px)",
        peaks.len(),
        validated.len(),
        min_overlap
    );

    validated.sort_by(ShiftCandidate::rank_cmp);
    let mut best = validated
        .into_iter()
        .next()
        .ok_or(PairSkip::NoValidCandidate)?;

    if search.subpixel {
        let offset = subpixel_offset(surface, &best.raw_peak);
        for (s, o) in best.shift.iter_mut().zip(offset) {
            *s += o;
        }
    }
    Ok(best)
}

/// Like [`find_shift`], with "no result" as `None`.
pub fn get_shift(
    surface: &CorrelationSurface,
    img1: &PixelRegion,
    img2: &PixelRegion,
    search: &ShiftSearch,
) -> Option<ShiftCandidate> {
    find_shift(surface, img1, img2, search).ok()
}
