//! Connected components of the result graph.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tilestitch_core::Group;
use tilestitch_pairwise::PairwiseResult;

/// Which groups may be linked with each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// Any two groups.
    #[default]
    All,
    /// Only groups covering the same timepoints.
    SameTimepoint,
}

impl Partition {
    pub fn allows(&self, a: &Group, b: &Group) -> bool {
        match self {
            Partition::All => true,
            Partition::SameTimepoint => a.timepoints() == b.timepoints(),
        }
    }
}

/// A maximal connected set of groups and the results linking them.
#[derive(Clone, Debug, PartialEq)]
pub struct Subset {
    pub groups: Vec<Group>,
    pub results: Vec<PairwiseResult>,
}

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Label connected components of `n` nodes joined by `edges`.
///
/// Labels are dense and ordered by the smallest node of each component.
pub fn component_labels(n: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Vec<usize> {
    let mut uf = UnionFind::new(n);
    for (a, b) in edges {
        uf.union(a, b);
    }
    let mut labels = vec![usize::MAX; n];
    let mut root_label = BTreeMap::new();
    for (i, label) in labels.iter_mut().enumerate() {
        let root = uf.find(i);
        let next = root_label.len();
        *label = *root_label.entry(root).or_insert(next);
    }
    labels
}

/// Split results into connected subsets.
///
/// `extra` groups become nodes even without results (they end up as
/// singleton subsets). Results across the partition are dropped; a pair of
/// identical groups is ignored.
pub fn connected_subsets(results: &[PairwiseResult], extra: &[Group], partition: Partition) -> Vec<Subset> {
    let mut nodes: BTreeSet<Group> = extra.iter().cloned().collect();
    let mut usable = Vec::with_capacity(results.len());
    for r in results {
        let (a, b) = &r.pair;
        if a == b {
            continue;
        }
        if !partition.allows(a, b) {
            debug!("{a} <> {b} crosses the partition, ignored");
            continue;
        }
        nodes.insert(a.clone());
        nodes.insert(b.clone());
        usable.push(r);
    }

    let nodes: Vec<Group> = nodes.into_iter().collect();
    let index: BTreeMap<&Group, usize> = nodes.iter().enumerate().map(|(i, g)| (g, i)).collect();
    let edges: Vec<(usize, usize)> = usable
        .iter()
        .map(|r| (index[&r.pair.0], index[&r.pair.1]))
        .collect();
    let labels = component_labels(nodes.len(), edges.iter().copied());

    let count = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut subsets: Vec<Subset> = (0..count)
        .map(|_| Subset {
            groups: Vec::new(),
            results: Vec::new(),
        })
        .collect();
    for (g, &label) in nodes.iter().zip(&labels) {
        subsets[label].groups.push(g.clone());
    }
    for (r, &(a, _)) in usable.iter().zip(&edges) {
        subsets[labels[a]].results.push((*r).clone());
    }
    subsets
}
