use tilestitch_core::CoreError;

/// Hard failures of a pairwise computation.
///
/// These abort the task they occur in; the batch keeps going.
#[derive(thiserror::Error, Debug)]
pub enum PairwiseError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("grid shapes differ ({a:?} vs {b:?})")]
    DimensionMismatch { a: Vec<usize>, b: Vec<usize> },

    #[error("images have different dimensionality ({a} vs {b})")]
    DimensionalityMismatch { a: usize, b: usize },

    #[error("starting transform of group {0} is not invertible")]
    SingularTransform(String),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Recoverable reasons for a pair to produce no result.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum PairSkip {
    #[error("bounding boxes do not overlap")]
    NoOverlap,
    #[error("rasterized overlap is empty or differs between the two tiles")]
    DegenerateOverlap,
    #[error("correlation surface has no local maximum")]
    NoPeakFound,
    #[error("no shift candidate overlaps by the minimum pixel count")]
    NoValidCandidate,
    #[error("cross correlation {cross_corr:.3} is not above {threshold:.3}")]
    LowCorrelation { cross_corr: f64, threshold: f64 },
    #[error("no metadata for group {0}")]
    MissingMetadata(String),
}
