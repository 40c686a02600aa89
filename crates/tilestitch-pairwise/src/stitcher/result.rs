use crate::PairSkip;
use serde::{Deserialize, Serialize};
use tilestitch_core::{canonical_pair, AffineTransform, BoundingBox, ContentHash, Group, TileMetadata};

/// Measured relative placement of two groups.
///
/// `shift` is a world-space translation: applied after the second group's
/// starting transform it places that group consistently with the first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairwiseResult {
    pub pair: (Group, Group),
    pub shift: AffineTransform,
    pub cross_corr: f64,
    pub peak_value: f64,
    /// World-space overlap of the nominal placements the shift was measured in.
    pub overlap: BoundingBox,
    /// Fingerprint of both starting transforms, in key order.
    pub hash: ContentHash,
}

impl PairwiseResult {
    /// Canonical (order-independent) key of the pair.
    pub fn key(&self) -> (Group, Group) {
        canonical_pair(&self.pair.0, &self.pair.1)
    }

    /// The same measurement seen from the other group.
    pub fn reversed(&self) -> PairwiseResult {
        let t: Vec<f64> = self.shift.translation_part().iter().map(|v| -v).collect();
        PairwiseResult {
            pair: (self.pair.1.clone(), self.pair.0.clone()),
            shift: AffineTransform::translation(&t),
            cross_corr: self.cross_corr,
            peak_value: self.peak_value,
            overlap: self.overlap.clone(),
            hash: self.hash,
        }
    }

    pub fn involves(&self, group: &Group) -> bool {
        &self.pair.0 == group || &self.pair.1 == group
    }
}

/// Hash of the current starting transforms of a pair, in canonical key order.
///
/// `None` when either group has no starting transform.
pub fn pair_hash(a: &Group, b: &Group, metadata: &dyn TileMetadata) -> Option<ContentHash> {
    let (first, second) = canonical_pair(a, b);
    let ta = metadata.starting_transform(&first)?;
    let tb = metadata.starting_transform(&second)?;
    Some(ContentHash::of_pair(&ta, &tb))
}

/// Outcome of one batch of pairs.
#[derive(Clone, Debug, Default)]
pub struct PairwiseRun {
    pub results: Vec<PairwiseResult>,
    pub skipped: Vec<((Group, Group), PairSkip)>,
    pub failed: Vec<((Group, Group), String)>,
}

impl PairwiseRun {
    pub fn summary(&self) -> String {
        format!(
            "{} stitched, {} skipped, {} failed",
            self.results.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}
