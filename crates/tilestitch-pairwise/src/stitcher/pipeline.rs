use super::geometry::{local_overlap, Placement};
use super::{pair_hash, PairwiseParams, PairwiseResult, PairwiseRun};
use crate::pcm::calculate_pcm;
use crate::shift::find_shift;
use crate::{PairSkip, PairwiseError};
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tilestitch_core::{AffineTransform, CoreError, Group, ImageLoader, PixelRegion, TileMetadata};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// What became of one pair.
#[derive(Debug)]
pub enum PairOutcome {
    Stitched(PairwiseResult),
    Skipped(PairSkip),
    Failed(PairwiseError),
}

enum PairFailure {
    Skip(PairSkip),
    Error(PairwiseError),
}

impl From<PairSkip> for PairFailure {
    fn from(value: PairSkip) -> Self {
        Self::Skip(value)
    }
}

impl From<PairwiseError> for PairFailure {
    fn from(value: PairwiseError) -> Self {
        Self::Error(value)
    }
}

impl From<CoreError> for PairFailure {
    fn from(value: CoreError) -> Self {
        Self::Error(value.into())
    }
}

/// Phase-correlation stitcher for many tile pairs.
///
/// Owns two worker pools: one running pairs, a smaller one validating the
/// shift candidates of a single pair.
pub struct PairwiseStitcher {
    params: PairwiseParams,
    pair_pool: ThreadPool,
    candidate_pool: ThreadPool,
}

impl PairwiseStitcher {
    pub fn new(params: PairwiseParams) -> Result<Self, PairwiseError> {
        let pair_pool = ThreadPoolBuilder::new()
            .num_threads(params.resolved_pair_threads())
            .thread_name(|i| format!("tilestitch-pair-{i}"))
            .build()?;
        let candidate_pool = ThreadPoolBuilder::new()
            .num_threads(params.resolved_candidate_threads())
            .thread_name(|i| format!("tilestitch-cand-{i}"))
            .build()?;
        Ok(Self {
            params,
            pair_pool,
            candidate_pool,
        })
    }

    #[inline]
    pub fn params(&self) -> &PairwiseParams {
        &self.params
    }

    /// Stitch every pair whose nominal bounding boxes overlap.
    ///
    /// Pairs without overlap or metadata are reported as skipped before any
    /// pixels are loaded. A failing pair never aborts the batch.
    pub fn compute(
        &self,
        pairs: &[(Group, Group)],
        loader: &dyn ImageLoader,
        metadata: &dyn TileMetadata,
    ) -> PairwiseRun {
        let mut run = PairwiseRun::default();
        let mut todo = Vec::with_capacity(pairs.len());
        for (a, b) in pairs {
            let pair = (a.clone(), b.clone());
            match prefilter(a, b, metadata) {
                Ok(()) => todo.push(pair),
                Err(skip) => {
                    info!("skipping {a} <> {b}: {skip}");
                    run.skipped.push((pair, skip));
                }
            }
        }
        debug!(
            "{} of {} pairs overlap nominally, {} pair threads",
            todo.len(),
            pairs.len(),
            self.pair_pool.current_num_threads()
        );

        let outcomes: Vec<((Group, Group), PairOutcome)> = self.pair_pool.install(|| {
            todo.into_par_iter()
                .map(|pair| {
                    let outcome = self.compute_pair(&pair.0, &pair.1, loader, metadata);
                    (pair, outcome)
                })
                .collect()
        });

        for (pair, outcome) in outcomes {
            match outcome {
                PairOutcome::Stitched(r) => run.results.push(r),
                PairOutcome::Skipped(skip) => {
                    info!("no result for {} <> {}: {skip}", pair.0, pair.1);
                    run.skipped.push((pair, skip));
                }
                PairOutcome::Failed(err) => {
                    warn!("pair {} <> {} failed: {err}", pair.0, pair.1);
                    run.failed.push((pair, err.to_string()));
                }
            }
        }
        info!("pairwise stitching: {}", run.summary());
        run
    }

    /// Stitch a single pair on the calling thread.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, loader, metadata), fields(a = %a, b = %b))
    )]
    pub fn compute_pair(
        &self,
        a: &Group,
        b: &Group,
        loader: &dyn ImageLoader,
        metadata: &dyn TileMetadata,
    ) -> PairOutcome {
        match self.try_pair(a, b, loader, metadata) {
            Ok(r) => PairOutcome::Stitched(r),
            Err(PairFailure::Skip(s)) => PairOutcome::Skipped(s),
            Err(PairFailure::Error(e)) => PairOutcome::Failed(e),
        }
    }

    fn try_pair(
        &self,
        a: &Group,
        b: &Group,
        loader: &dyn ImageLoader,
        metadata: &dyn TileMetadata,
    ) -> Result<PairwiseResult, PairFailure> {
        let start_a = starting_transform(a, metadata)?;
        let start_b = starting_transform(b, metadata)?;
        let dim = start_a.dim();
        if start_b.dim() != dim {
            return Err(PairwiseError::DimensionalityMismatch {
                a: dim,
                b: start_b.dim(),
            }
            .into());
        }
        let hash = pair_hash(a, b, metadata).ok_or_else(|| PairSkip::MissingMetadata(a.to_string()))?;

        let ds = self.params.downsampling_for(dim);
        let scale = AffineTransform::scaling(&ds.iter().map(|&f| f as f64).collect::<Vec<_>>());
        let img_a = self.params.aggregation.aggregate(a, loader, &ds)?;
        let img_b = self.params.aggregation.aggregate(b, loader, &ds)?;

        let place_a = Placement::of_region(start_a.compose(&scale), &img_a)
            .ok_or_else(|| PairwiseError::SingularTransform(a.to_string()))?;
        let place_b = Placement::of_region(start_b.compose(&scale), &img_b)
            .ok_or_else(|| PairwiseError::SingularTransform(b.to_string()))?;
        let overlap = local_overlap(&place_a, &place_b)?;

        let crop_a = crop_local(&img_a, &overlap.a.min, &overlap.a.size)?;
        let crop_b = crop_local(&img_b, &overlap.b.min, &overlap.b.size)?;
        debug!(
            "{a} <> {b}: overlap {:?} px at downsampling {:?}",
            overlap.a.size, ds
        );

        let pcm = calculate_pcm(&crop_a, &crop_b, self.params.extension_factor)?;
        let search = self.params.search();
        let best = self
            .candidate_pool
            .install(|| find_shift(&pcm, &crop_a, &crop_b, &search))?;

        if best.cross_corr <= self.params.min_cross_correlation {
            return Err(PairSkip::LowCorrelation {
                cross_corr: best.cross_corr,
                threshold: self.params.min_cross_correlation,
            }
            .into());
        }

        // B's crop origin lands on A's crop origin plus the measured shift.
        let origin_a: Vec<f64> = crop_a.origin().iter().map(|&o| o as f64).collect();
        let origin_b: Vec<f64> = crop_b.origin().iter().map(|&o| o as f64).collect();
        let target: Vec<f64> = origin_a.iter().zip(&best.shift).map(|(o, t)| o + t).collect();
        let world_a = place_a.to_world().apply(&target);
        let world_b = place_b.to_world().apply(&origin_b);
        let shift: Vec<f64> = world_a.iter().zip(&world_b).map(|(p, q)| p - q).collect();
        debug!(
            "{a} <> {b}: shift {:?} (cc {:.4}, peak {:.4}, {} px)",
            shift, best.cross_corr, best.peak_value, best.n_pixels
        );

        Ok(PairwiseResult {
            pair: (a.clone(), b.clone()),
            shift: AffineTransform::translation(&shift),
            cross_corr: best.cross_corr,
            peak_value: best.peak_value,
            overlap: overlap.world,
            hash,
        })
    }
}

fn starting_transform(group: &Group, metadata: &dyn TileMetadata) -> Result<AffineTransform, PairSkip> {
    metadata
        .starting_transform(group)
        .ok_or_else(|| PairSkip::MissingMetadata(group.to_string()))
}

fn prefilter(a: &Group, b: &Group, metadata: &dyn TileMetadata) -> Result<(), PairSkip> {
    let box_a = metadata
        .bounding_box(a)
        .ok_or_else(|| PairSkip::MissingMetadata(a.to_string()))?;
    let box_b = metadata
        .bounding_box(b)
        .ok_or_else(|| PairSkip::MissingMetadata(b.to_string()))?;
    if box_a.overlaps(&box_b) {
        Ok(())
    } else {
        Err(PairSkip::NoOverlap)
    }
}

/// Crop with a box given in the region's pixel frame (origin included).
fn crop_local(region: &PixelRegion, min: &[i64], size: &[usize]) -> Result<PixelRegion, PairwiseError> {
    let rel: Vec<i64> = min.iter().zip(region.origin()).map(|(m, o)| m - o).collect();
    Ok(region.crop(&rel, size)?)
}
