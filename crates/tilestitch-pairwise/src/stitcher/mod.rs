//! Pairwise stitching over many tile pairs.
//!
//! For every requested pair the orchestrator checks the nominal bounding
//! boxes, loads and aggregates both groups, crops them to their overlap,
//! runs the phase correlation and peak validation and re-expresses the
//! measured shift in world coordinates.

mod geometry;
mod params;
mod pipeline;
mod result;

pub use geometry::{local_overlap, LocalOverlap, Placement};
pub use params::PairwiseParams;
pub use pipeline::{PairOutcome, PairwiseStitcher};
pub use result::{pair_hash, PairwiseResult, PairwiseRun};
