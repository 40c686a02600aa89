use std::cmp::Ordering;

/// One physically possible relative shift between two images.
///
/// `shift` is the position of the second image's origin in the pixel frame of
/// the first image. `cross_corr` and `n_pixels` stay zero until the candidate
/// has been validated against the overlapping pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct ShiftCandidate {
    pub shift: Vec<f64>,
    pub peak_value: f64,
    pub cross_corr: f64,
    pub n_pixels: u64,
    /// Peak position on the correlation surface this candidate was expanded from.
    pub raw_peak: Vec<usize>,
}

impl ShiftCandidate {
    pub fn new(shift: Vec<f64>, peak_value: f64, raw_peak: Vec<usize>) -> Self {
        Self {
            shift,
            peak_value,
            cross_corr: 0.0,
            n_pixels: 0,
            raw_peak,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.n_pixels > 0
    }

    /// Ranking order: better candidates compare as `Less`.
    ///
    /// Higher cross correlation first, ties broken by the larger overlap.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .cross_corr
            .total_cmp(&self.cross_corr)
            .then_with(|| other.n_pixels.cmp(&self.n_pixels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(cc: f64, n: u64) -> ShiftCandidate {
        ShiftCandidate {
            cross_corr: cc,
            n_pixels: n,
            ..ShiftCandidate::new(vec![0.0, 0.0], 1.0, vec![0, 0])
        }
    }

    #[test]
    fn ranks_by_correlation_then_overlap() {
        let mut v = vec![cand(0.5, 900), cand(0.9, 10), cand(0.9, 400), cand(0.1, 10_000)];
        v.sort_by(ShiftCandidate::rank_cmp);
        let got: Vec<(f64, u64)> = v.iter().map(|c| (c.cross_corr, c.n_pixels)).collect();
        assert_eq!(got, vec![(0.9, 400), (0.9, 10), (0.5, 900), (0.1, 10_000)]);
    }

    #[test]
    fn fresh_candidate_is_not_valid() {
        assert!(!ShiftCandidate::new(vec![1.0], 0.3, vec![1]).is_valid());
    }
}
