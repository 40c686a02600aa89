//! Pairwise estimation followed by global optimization, against a persistent
//! result graph.

use crate::StitchConfig;
use log::info;
use tilestitch_core::{Group, ImageLoader, InMemoryMetadata, TileMetadata};
use tilestitch_global::{
    remove_stale, CommitSummary, GlobalOptError, GlobalOptOutcome, GlobalOptimizer, GraphChanges,
    ResultGraph,
};
use tilestitch_pairwise::{PairwiseError, PairwiseRun, PairwiseStitcher};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum StitchError {
    #[error(transparent)]
    Pairwise(#[from] PairwiseError),
    #[error(transparent)]
    Global(#[from] GlobalOptError),
}

/// Everything one [`Stitcher::run`] did.
#[derive(Clone, Debug, Default)]
pub struct StitchOutcome {
    /// Pairs computed in this run; pairs already in the graph are not repeated.
    pub pairwise: PairwiseRun,
    pub stale_removed: usize,
    pub inserted: CommitSummary,
    pub global: GlobalOptOutcome,
    pub removed: CommitSummary,
}

impl StitchOutcome {
    /// Compose every group's update onto its starting transform.
    ///
    /// Results in the graph become stale for every moved group.
    pub fn apply_to(&self, metadata: &mut InMemoryMetadata) {
        for (group, update) in &self.global.transforms {
            metadata.apply_update(group, update);
        }
    }
}

/// End-to-end stitching of a set of groups.
pub struct Stitcher {
    pairwise: PairwiseStitcher,
    global: GlobalOptimizer,
}

impl Stitcher {
    pub fn new(config: &StitchConfig) -> Result<Self, StitchError> {
        Ok(Self {
            pairwise: PairwiseStitcher::new(config.pairwise.clone())?,
            global: GlobalOptimizer::new(config.global.clone()),
        })
    }

    pub fn pairwise(&self) -> &PairwiseStitcher {
        &self.pairwise
    }

    pub fn global(&self) -> &GlobalOptimizer {
        &self.global
    }

    /// Run both stages.
    ///
    /// Stale results are dropped from `graph` first; pairs still holding a
    /// fresh result are not recomputed. New results are committed, the
    /// optimizer runs on a snapshot, and links it rejects are removed.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all, fields(pairs = pairs.len())))]
    pub fn run(
        &self,
        pairs: &[(Group, Group)],
        groups: &[Group],
        graph: &mut ResultGraph,
        loader: &dyn ImageLoader,
        metadata: &dyn TileMetadata,
    ) -> Result<StitchOutcome, StitchError> {
        let stale_removed = remove_stale(graph, metadata);

        let pending: Vec<(Group, Group)> = pairs
            .iter()
            .filter(|(a, b)| !graph.contains(a, b))
            .cloned()
            .collect();
        if pending.len() < pairs.len() {
            info!("{} of {} pairs reuse an existing result", pairs.len() - pending.len(), pairs.len());
        }
        let pairwise = self.pairwise.compute(&pending, loader, metadata);
        info!("pairwise: {}", pairwise.summary());

        let inserted = graph.commit(GraphChanges {
            insertions: pairwise.results.clone(),
            removals: Vec::new(),
        });

        let global = self.global.optimize(&graph.snapshot(), groups, metadata)?;
        let removed = graph.commit(global.changes());

        Ok(StitchOutcome {
            pairwise,
            stale_removed,
            inserted,
            global,
            removed,
        })
    }
}
