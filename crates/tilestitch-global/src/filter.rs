//! Removal of stale and inconsistent links from the result graph.

use crate::ResultGraph;
use log::{info, warn};
use tilestitch_core::{canonical_pair, AffineTransform, ContentHash, Group, TileMetadata};
use tilestitch_pairwise::{pair_hash, PairwiseResult};

/// `true` when `result` was computed under different starting transforms.
///
/// `start_a` and `start_b` are the current starting transforms of
/// `result.pair.0` and `result.pair.1`.
pub fn is_stale(result: &PairwiseResult, start_a: &AffineTransform, start_b: &AffineTransform) -> bool {
    let (a, _) = &result.pair;
    let (first, _) = canonical_pair(&result.pair.0, &result.pair.1);
    let current = if &first == a {
        ContentHash::of_pair(start_a, start_b)
    } else {
        ContentHash::of_pair(start_b, start_a)
    };
    current != result.hash
}

/// `true` when `result` is stale under `metadata`, or a group lost its metadata.
pub fn is_stale_in(result: &PairwiseResult, metadata: &dyn TileMetadata) -> bool {
    pair_hash(&result.pair.0, &result.pair.1, metadata) != Some(result.hash)
}

/// Split results into fresh ones and the keys of stale ones.
pub fn filter_stale(
    results: &[PairwiseResult],
    metadata: &dyn TileMetadata,
) -> (Vec<PairwiseResult>, Vec<(Group, Group)>) {
    let mut fresh = Vec::with_capacity(results.len());
    let mut stale = Vec::new();
    for r in results {
        if is_stale_in(r, metadata) {
            stale.push(r.key());
        } else {
            fresh.push(r.clone());
        }
    }
    if !stale.is_empty() {
        warn!(
            "{} of {} pairwise results are stale (starting transforms changed) and were dropped",
            stale.len(),
            results.len()
        );
    }
    (fresh, stale)
}

/// Drop every stale result from `graph`; returns how many were dropped.
pub fn remove_stale(graph: &mut ResultGraph, metadata: &dyn TileMetadata) -> usize {
    let before = graph.len();
    graph.retain(|r| !is_stale_in(r, metadata));
    let dropped = before - graph.len();
    if dropped > 0 {
        warn!("removed {dropped} stale pairwise results from the graph");
    }
    dropped
}

/// Remove links flagged inconsistent by the optimizer.
///
/// Pairs are matched in either orientation. Returns the number of pairs that
/// were not in the graph.
pub fn remove_inconsistent_links(removed: &[(Group, Group)], graph: &mut ResultGraph) -> usize {
    let mut missing = 0;
    for (a, b) in removed {
        if graph.remove(a, b).is_none() {
            warn!("inconsistent link {a} <> {b} is not in the result graph");
            missing += 1;
        }
    }
    if removed.len() > missing {
        info!("removed {} inconsistent links", removed.len() - missing);
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilestitch_core::{BoundingBox, InMemoryMetadata, ViewId};

    fn setup() -> (InMemoryMetadata, PairwiseResult) {
        let mut meta = InMemoryMetadata::new();
        meta.insert(ViewId::new(0, 0), vec![10, 10], AffineTransform::translation(&[0.0, 0.0]));
        meta.insert(ViewId::new(0, 1), vec![10, 10], AffineTransform::translation(&[8.0, 0.0]));
        let (a, b) = (Group::single(ViewId::new(0, 1)), Group::single(ViewId::new(0, 0)));
        let hash = pair_hash(&a, &b, &meta).unwrap();
        let r = PairwiseResult {
            pair: (a, b),
            shift: AffineTransform::translation(&[-0.5, 0.0]),
            cross_corr: 0.9,
            peak_value: 0.3,
            overlap: BoundingBox::new(vec![8.0, 0.0], vec![9.0, 9.0]),
            hash,
        };
        (meta, r)
    }

    #[test]
    fn explicit_transforms_follow_pair_orientation() {
        let (_, r) = setup();
        let t0 = AffineTransform::translation(&[0.0, 0.0]);
        let t1 = AffineTransform::translation(&[8.0, 0.0]);
        // pair.0 is view 1
        assert!(!is_stale(&r, &t1, &t0));
        assert!(is_stale(&r, &t0, &t1));
    }

    #[test]
    fn changed_transform_makes_result_stale() {
        let (mut meta, r) = setup();
        assert!(!is_stale_in(&r, &meta));
        meta.set_transform(&ViewId::new(0, 0), AffineTransform::translation(&[0.0, 1.0]));
        assert!(is_stale_in(&r, &meta));
        let (fresh, stale) = filter_stale(std::slice::from_ref(&r), &meta);
        assert!(fresh.is_empty());
        assert_eq!(stale, vec![r.key()]);
    }

    #[test]
    fn removing_links_twice_changes_nothing_the_second_time() {
        let (_, r) = setup();
        let key = r.key();
        let mut graph: ResultGraph = [r].into_iter().collect();
        assert_eq!(remove_inconsistent_links(&[key.clone()], &mut graph), 0);
        assert!(graph.is_empty());
        assert_eq!(remove_inconsistent_links(&[key], &mut graph), 1);
        assert!(graph.is_empty());
    }
}
