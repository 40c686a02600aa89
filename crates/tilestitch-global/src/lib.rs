//! Global optimization of pairwise tile shifts.
//!
//! Pairwise results form a graph over groups. Each connected subset of that
//! graph is fitted with one transform per group by linear least squares; the
//! iterative strategy drops the worst-fitting link until the remaining links
//! agree, and the two-round strategy additionally places disconnected
//! fragments from their nominal layout so every group gets a transform.
//!
//! The persistent [`ResultGraph`] is only read through snapshots during a
//! run; the run returns [`GraphChanges`] for the caller to commit, and the
//! [`filter`] functions prune stale and inconsistent links.

mod error;
pub mod filter;
mod graph;
mod model;
mod optimizer;
mod subsets;

pub use error::GlobalOptError;
pub use filter::{filter_stale, is_stale, is_stale_in, remove_inconsistent_links, remove_stale};
pub use graph::{CommitSummary, GraphChanges, ResultGraph};
pub use model::{solve, Link, PointMatch, TransformModel};
pub use optimizer::{
    ConvergenceThresholds, GlobalOptOutcome, GlobalOptParams, GlobalOptimizer, Strategy,
    SubsetReport, SubsetState,
};
pub use subsets::{component_labels, connected_subsets, Partition, Subset};
