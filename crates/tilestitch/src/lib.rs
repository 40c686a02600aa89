//! High-level facade crate for the `tilestitch-*` workspace.
//!
//! This crate provides:
//! - re-exports of the underlying crates under short names
//! - [`Stitcher`], which runs pairwise phase correlation and global
//!   optimization against a persistent [`ResultGraph`]
//! - JSON configuration and report helpers
//!
//! ## Quickstart
//!
//! ```no_run
//! use tilestitch::{core::InMemoryImages, core::InMemoryMetadata, ResultGraph, StitchConfig, Stitcher};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StitchConfig::load_json("stitch.json")?;
//! let images = InMemoryImages::new();
//! let mut metadata = InMemoryMetadata::new();
//! // ... fill images and metadata, list overlapping pairs ...
//! let pairs = Vec::new();
//!
//! let mut graph = ResultGraph::new();
//! let stitcher = Stitcher::new(&config)?;
//! let outcome = stitcher.run(&pairs, &[], &mut graph, &images, &metadata)?;
//! println!("{}", outcome.global.summary());
//! outcome.apply_to(&mut metadata);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `tilestitch::core`: views, groups, pixel regions, transforms, loader and
//!   metadata contracts.
//! - `tilestitch::pairwise`: phase correlation and the pairwise orchestrator.
//! - `tilestitch::global`: result graph, global optimization, link filters.

pub use tilestitch_core as core;
pub use tilestitch_global as global;
pub use tilestitch_pairwise as pairwise;

pub use tilestitch_core::{AffineTransform, Group, ViewId};
pub use tilestitch_global::{GlobalOptParams, ResultGraph, Strategy};
pub use tilestitch_pairwise::{PairwiseParams, PairwiseResult};

mod config;
mod stitch;
#[cfg(feature = "tracing")]
mod trace;

pub use config::{PlacementEntry, StitchConfig, StitchIoError, StitchReport, SubsetEntry};
pub use stitch::{StitchError, StitchOutcome, Stitcher};
#[cfg(feature = "tracing")]
pub use trace::init_tracing;
