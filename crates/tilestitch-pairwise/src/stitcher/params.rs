use crate::pcm::DEFAULT_EXTENSION_FACTOR;
use crate::ShiftSearch;
use serde::{Deserialize, Serialize};
use tilestitch_core::Aggregation;

/// Configuration of the pairwise stitcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairwiseParams {
    /// Number of highest correlation peaks that are expanded and validated.
    pub peaks_to_check: usize,
    /// Minimum overlap of a candidate, as a fraction of the smaller image.
    pub min_overlap_fraction: f64,
    /// Refine the winning shift with a parabolic fit around its peak.
    pub subpixel: bool,
    /// Tapered border added around both images, as a fraction of their size.
    pub extension_factor: f64,
    /// Downsampling per axis applied before correlating (x, y, z).
    ///
    /// Truncated to the dimensionality of the images.
    pub downsampling: Vec<usize>,
    /// How multi-view groups are reduced to one image.
    pub aggregation: Aggregation,
    /// Results with a cross correlation at or below this value are dropped.
    pub min_cross_correlation: f64,
    /// Worker threads for pairs. `None` uses half of the available cores.
    pub pair_threads: Option<usize>,
    /// Worker threads for candidate validation inside one pair.
    pub candidate_threads: Option<usize>,
}

impl Default for PairwiseParams {
    fn default() -> Self {
        Self {
            peaks_to_check: 5,
            min_overlap_fraction: 0.05,
            subpixel: true,
            extension_factor: DEFAULT_EXTENSION_FACTOR,
            downsampling: vec![1, 1, 1],
            aggregation: Aggregation::Average,
            min_cross_correlation: 0.0,
            pair_threads: None,
            candidate_threads: None,
        }
    }
}

impl PairwiseParams {
    pub fn search(&self) -> ShiftSearch {
        ShiftSearch {
            peaks_to_check: self.peaks_to_check,
            min_overlap_fraction: self.min_overlap_fraction,
            subpixel: self.subpixel,
        }
    }

    /// Downsampling factors for `dim` axes; missing entries are 1.
    pub fn downsampling_for(&self, dim: usize) -> Vec<usize> {
        (0..dim)
            .map(|k| self.downsampling.get(k).copied().unwrap_or(1).max(1))
            .collect()
    }

    pub(crate) fn resolved_pair_threads(&self) -> usize {
        self.pair_threads.unwrap_or_else(|| {
            let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
            cores / 2
        })
        .max(1)
    }

    pub(crate) fn resolved_candidate_threads(&self) -> usize {
        self.candidate_threads.unwrap_or(2).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downsampling_is_truncated_and_padded() {
        let p = PairwiseParams {
            downsampling: vec![2, 4, 8],
            ..PairwiseParams::default()
        };
        assert_eq!(p.downsampling_for(2), vec![2, 4]);
        let p = PairwiseParams {
            downsampling: vec![2, 0],
            ..PairwiseParams::default()
        };
        assert_eq!(p.downsampling_for(3), vec![2, 1, 1]);
    }

    #[test]
    fn thread_counts_are_at_least_one() {
        let p = PairwiseParams {
            pair_threads: Some(0),
            candidate_threads: Some(0),
            ..PairwiseParams::default()
        };
        assert_eq!(p.resolved_pair_threads(), 1);
        assert_eq!(p.resolved_candidate_threads(), 1);
        assert!(PairwiseParams::default().resolved_pair_threads() >= 1);
    }
}
