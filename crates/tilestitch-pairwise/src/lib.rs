//! Pairwise shift estimation between overlapping tiles.
//!
//! The building blocks, leaves first:
//!
//! - [`ComplexGrid`]: elementwise complex arithmetic over N-d grids.
//! - [`calculate_pcm`]: phase correlation surface of two extended images.
//! - [`find_local_maxima`], [`keep_highest`], [`expand_to_shifts`] and
//!   [`calculate_cross_correlation`]: turn surface peaks into ranked shift
//!   candidates, resolving the periodic ambiguity of the surface.
//! - [`get_shift`]: the best candidate, optionally refined to sub-pixel.
//! - [`PairwiseStitcher`]: runs all of the above over many group pairs on a
//!   bounded worker pool and emits [`PairwiseResult`]s.
//!
//! ```no_run
//! use tilestitch_core::{InMemoryImages, InMemoryMetadata, Group, ViewId};
//! use tilestitch_pairwise::{PairwiseParams, PairwiseStitcher};
//!
//! # fn main() -> Result<(), tilestitch_pairwise::PairwiseError> {
//! let images = InMemoryImages::new();
//! let metadata = InMemoryMetadata::new();
//! let a = Group::single(ViewId::new(0, 0));
//! let b = Group::single(ViewId::new(0, 1));
//!
//! let stitcher = PairwiseStitcher::new(PairwiseParams::default())?;
//! let run = stitcher.compute(&[(a, b)], &images, &metadata);
//! println!("{}", run.summary());
//! # Ok(())
//! # }
//! ```

mod candidate;
mod crosscorr;
mod error;
mod fft;
mod pcm;
mod peaks;
mod primitives;
mod shift;
mod stitcher;

pub use candidate::ShiftCandidate;
pub use crosscorr::{calculate_cross_correlation, min_overlap_pixels, overlap_extent, pearson};
pub use error::{PairSkip, PairwiseError};
pub use fft::{fft_nd, next_fast_size};
pub use pcm::{calculate_pcm, extend_mirrored, extended_size, CorrelationSurface, DEFAULT_EXTENSION_FACTOR};
pub use peaks::{expand_to_shifts, find_local_maxima, keep_highest, Peak};
pub use primitives::{ComplexGrid, NORMALIZE_THRESHOLD};
pub use rustfft::num_complex::Complex;
pub use rustfft::FftDirection;
pub use shift::{find_shift, get_shift, subpixel_offset, ShiftSearch};
pub use stitcher::{
    local_overlap, pair_hash, LocalOverlap, PairOutcome, PairwiseParams, PairwiseResult,
    PairwiseRun, PairwiseStitcher, Placement,
};
