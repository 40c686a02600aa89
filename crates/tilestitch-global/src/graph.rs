//! Persistent store of pairwise results.
//!
//! Optimization runs read an owned [`ResultGraph::snapshot`] and hand back a
//! [`GraphChanges`] that the caller commits once the run is over, so the
//! graph is never edited while a run is in flight.

use std::collections::BTreeMap;
use tilestitch_core::{canonical_pair, Group};
use tilestitch_pairwise::PairwiseResult;

/// Pairwise results keyed by canonical pair.
///
/// Each stored result keeps the orientation it was computed in.
#[derive(Clone, Debug, Default)]
pub struct ResultGraph {
    results: BTreeMap<(Group, Group), PairwiseResult>,
}

/// Edits produced by a run, applied with [`ResultGraph::commit`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphChanges {
    pub insertions: Vec<PairwiseResult>,
    pub removals: Vec<(Group, Group)>,
}

impl GraphChanges {
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty() && self.removals.is_empty()
    }
}

/// Counts reported by [`ResultGraph::commit`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub inserted: usize,
    pub superseded: usize,
    pub removed: usize,
    pub missing: usize,
}

impl ResultGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Insert a result, returning the one it supersedes (in either orientation).
    pub fn insert(&mut self, result: PairwiseResult) -> Option<PairwiseResult> {
        self.results.insert(result.key(), result)
    }

    pub fn get(&self, a: &Group, b: &Group) -> Option<&PairwiseResult> {
        self.results.get(&canonical_pair(a, b))
    }

    pub fn contains(&self, a: &Group, b: &Group) -> bool {
        self.get(a, b).is_some()
    }

    pub fn remove(&mut self, a: &Group, b: &Group) -> Option<PairwiseResult> {
        self.results.remove(&canonical_pair(a, b))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PairwiseResult> {
        self.results.values()
    }

    /// Retain the results for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&PairwiseResult) -> bool) {
        self.results.retain(|_, r| keep(r));
    }

    /// Owned copy of all results, in key order.
    pub fn snapshot(&self) -> Vec<PairwiseResult> {
        self.results.values().cloned().collect()
    }

    /// Apply removals first, then insertions.
    pub fn commit(&mut self, changes: GraphChanges) -> CommitSummary {
        let mut summary = CommitSummary::default();
        for (a, b) in &changes.removals {
            if self.remove(a, b).is_some() {
                summary.removed += 1;
            } else {
                summary.missing += 1;
            }
        }
        for r in changes.insertions {
            summary.inserted += 1;
            if self.insert(r).is_some() {
                summary.superseded += 1;
            }
        }
        summary
    }
}

impl FromIterator<PairwiseResult> for ResultGraph {
    fn from_iter<I: IntoIterator<Item = PairwiseResult>>(iter: I) -> Self {
        let mut graph = ResultGraph::new();
        for r in iter {
            graph.insert(r);
        }
        graph
    }
}

impl Extend<PairwiseResult> for ResultGraph {
    fn extend<I: IntoIterator<Item = PairwiseResult>>(&mut self, iter: I) {
        for r in iter {
            self.insert(r);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilestitch_core::{AffineTransform, BoundingBox, ContentHash, ViewId};

    fn g(s: u32) -> Group {
        Group::single(ViewId::new(0, s))
    }

    fn result(a: u32, b: u32, x: f64) -> PairwiseResult {
        PairwiseResult {
            pair: (g(a), g(b)),
            shift: AffineTransform::translation(&[x, 0.0]),
            cross_corr: 0.9,
            peak_value: 0.2,
            overlap: BoundingBox::of_dims(&[4, 4]),
            hash: ContentHash(0),
        }
    }

    #[test]
    fn lookups_ignore_orientation() {
        let mut graph = ResultGraph::new();
        graph.insert(result(2, 1, 3.0));
        assert!(graph.contains(&g(1), &g(2)));
        assert_eq!(graph.get(&g(1), &g(2)).map(|r| r.pair.0.clone()), Some(g(2)));
        assert!(graph.remove(&g(1), &g(2)).is_some());
        assert!(graph.is_empty());
    }

    #[test]
    fn insert_supersedes_reverse_orientation() {
        let mut graph = ResultGraph::new();
        graph.insert(result(1, 2, 3.0));
        let old = graph.insert(result(2, 1, -3.5));
        assert_eq!(old.map(|r| r.shift.translation_part()[0]), Some(3.0));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn commit_removes_then_inserts() {
        let mut graph: ResultGraph = [result(1, 2, 1.0), result(2, 3, 1.0)].into_iter().collect();
        let snapshot = graph.snapshot();
        let summary = graph.commit(GraphChanges {
            insertions: vec![result(1, 2, 2.0), result(3, 4, 1.0)],
            removals: vec![(g(2), g(1)), (g(5), g(6))],
        });
        assert_eq!(
            summary,
            CommitSummary {
                inserted: 2,
                superseded: 0,
                removed: 1,
                missing: 1
            }
        );
        assert_eq!(graph.len(), 3);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(graph.get(&g(1), &g(2)).map(|r| r.shift.translation_part()[0]), Some(2.0));
    }
}
