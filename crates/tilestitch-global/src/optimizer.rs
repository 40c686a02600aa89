//! Global optimization of pairwise results into one transform per group.

use crate::model::{solve, Link, PointMatch, TransformModel};
use crate::subsets::{component_labels, connected_subsets, Partition, Subset};
use crate::{GlobalOptError, GraphChanges};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tilestitch_core::{AffineTransform, BoundingBox, Group, TileMetadata};
use tilestitch_pairwise::PairwiseResult;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Bounds on the worst link error of a fit.
///
/// A fit is accepted when its worst link error is within `relative` times the
/// average link error or within `absolute` (in world units).
///
/// Dense neighbourhoods dilute a single bad link: on a 2 x 2 grid with both
/// diagonals, one corrupted link carries about twice the average error, so
/// `relative` must be below 2 to reject it there. The default of 2.5 suits
/// sparser grids where each tile has few neighbours.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceThresholds {
    pub relative: f64,
    pub absolute: f64,
}

impl Default for ConvergenceThresholds {
    fn default() -> Self {
        Self {
            relative: 2.5,
            absolute: 3.5,
        }
    }
}

impl ConvergenceThresholds {
    /// `true` when `worst` exceeds both bounds.
    pub fn exceeded(&self, worst: f64, average: f64) -> bool {
        worst > self.relative * average && worst > self.absolute
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One fit, no link is ever removed.
    Simple,
    /// Refit after dropping the worst link until the thresholds hold.
    #[default]
    Iterative,
    /// Iterative per subset, then place the subsets relative to each other
    /// using the nominal (metadata) layout.
    TwoRound,
}

/// Configuration of the global optimization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalOptParams {
    pub model: TransformModel,
    pub strategy: Strategy,
    pub thresholds: ConvergenceThresholds,
    /// Groups held at the identity. Subsets without one fix their smallest group.
    pub fixed_groups: Vec<Group>,
    /// Weight each link by its (non-negative) cross correlation.
    pub weight_by_correlation: bool,
    pub partition: Partition,
}

impl Default for GlobalOptParams {
    fn default() -> Self {
        Self {
            model: TransformModel::Translation,
            strategy: Strategy::Iterative,
            thresholds: ConvergenceThresholds::default(),
            fixed_groups: Vec::new(),
            weight_by_correlation: false,
            partition: Partition::All,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubsetState {
    /// Worst link within thresholds (or strategy never removes links).
    Converged,
    /// Thresholds still exceeded with no link left to remove; last fit kept.
    Exhausted,
    /// No usable pairwise result; no transforms emitted.
    Skipped,
    /// The fit itself failed; no transforms emitted.
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubsetReport {
    pub groups: Vec<Group>,
    pub state: SubsetState,
    pub iterations: usize,
    pub removed: Vec<(Group, Group)>,
    pub average_error: f64,
    pub max_error: f64,
}

/// Result of one optimization run.
#[derive(Clone, Debug, Default)]
pub struct GlobalOptOutcome {
    /// Update per group: `update ∘ starting transform` is the final placement.
    pub transforms: BTreeMap<Group, AffineTransform>,
    /// Links found inconsistent, as canonical pairs.
    pub removed: Vec<(Group, Group)>,
    pub subsets: Vec<SubsetReport>,
}

impl GlobalOptOutcome {
    /// Removals to commit to the persistent result graph.
    pub fn changes(&self) -> GraphChanges {
        GraphChanges {
            insertions: Vec::new(),
            removals: self.removed.clone(),
        }
    }

    pub fn count(&self, state: &SubsetState) -> usize {
        self.subsets.iter().filter(|s| &s.state == state).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} subsets ({} converged, {} exhausted, {} skipped), {} groups placed, {} links removed",
            self.subsets.len(),
            self.count(&SubsetState::Converged),
            self.count(&SubsetState::Exhausted),
            self.count(&SubsetState::Skipped),
            self.transforms.len(),
            self.removed.len()
        )
    }
}

struct SubsetSolution {
    report: SubsetReport,
    transforms: Vec<AffineTransform>,
}

/// Fits per-group transforms to a snapshot of pairwise results.
#[derive(Clone, Debug, Default)]
pub struct GlobalOptimizer {
    params: GlobalOptParams,
}

impl GlobalOptimizer {
    pub fn new(params: GlobalOptParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &GlobalOptParams {
        &self.params
    }

    /// Optimize every connected subset of `results`.
    ///
    /// `groups` are added as nodes even without results; the two-round
    /// strategy places them from `metadata`. Subsets are solved in parallel.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(results = results.len(), strategy = ?self.params.strategy))
    )]
    pub fn optimize(
        &self,
        results: &[PairwiseResult],
        groups: &[Group],
        metadata: &dyn TileMetadata,
    ) -> Result<GlobalOptOutcome, GlobalOptError> {
        let Some(dim) = self.dimensionality(results, groups, metadata)? else {
            info!("global optimization: nothing to do");
            return Ok(GlobalOptOutcome::default());
        };

        let subsets = connected_subsets(results, groups, self.params.partition);
        debug!("{} results split into {} subsets", results.len(), subsets.len());

        let solutions: Vec<SubsetSolution> = subsets
            .par_iter()
            .map(|s| self.solve_subset(s, dim))
            .collect();

        let mut outcome = GlobalOptOutcome::default();
        if self.params.strategy == Strategy::TwoRound {
            let placed = self.place_blocks(&subsets, &solutions, dim, metadata)?;
            outcome.transforms = placed;
        } else {
            for (subset, sol) in subsets.iter().zip(&solutions) {
                if !matches!(sol.report.state, SubsetState::Converged | SubsetState::Exhausted) {
                    continue;
                }
                for (g, t) in subset.groups.iter().zip(&sol.transforms) {
                    outcome.transforms.insert(g.clone(), t.clone());
                }
            }
        }
        for sol in solutions {
            outcome.removed.extend(sol.report.removed.iter().cloned());
            outcome.subsets.push(sol.report);
        }
        info!("global optimization: {}", outcome.summary());
        Ok(outcome)
    }

    fn dimensionality(
        &self,
        results: &[PairwiseResult],
        groups: &[Group],
        metadata: &dyn TileMetadata,
    ) -> Result<Option<usize>, GlobalOptError> {
        let mut dim = None;
        for r in results {
            let d = r.shift.dim();
            match dim {
                None => dim = Some(d),
                Some(expected) if expected != d => {
                    return Err(GlobalOptError::DimensionMismatch { expected, got: d })
                }
                Some(_) => {}
            }
        }
        if dim.is_none() {
            dim = groups
                .iter()
                .find_map(|g| metadata.starting_transform(g))
                .map(|t| t.dim());
        }
        Ok(dim)
    }

    fn links(&self, subset: &Subset, index: &BTreeMap<&Group, usize>) -> Vec<((Group, Group), Link)> {
        subset
            .results
            .iter()
            .map(|r| {
                let matches = r
                    .overlap
                    .corners()
                    .into_iter()
                    .map(|q| PointMatch {
                        point_a: r.shift.apply(&q),
                        point_b: q,
                    })
                    .collect();
                let weight = if self.params.weight_by_correlation {
                    r.cross_corr.max(0.0)
                } else {
                    1.0
                };
                let link = Link {
                    a: index[&r.pair.0],
                    b: index[&r.pair.1],
                    weight,
                    matches,
                };
                (r.key(), link)
            })
            .collect()
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(groups = subset.groups.len(), links = subset.results.len()))
    )]
    fn solve_subset(&self, subset: &Subset, dim: usize) -> SubsetSolution {
        let identity = vec![AffineTransform::identity(dim); subset.groups.len()];
        let mut report = SubsetReport {
            groups: subset.groups.clone(),
            state: SubsetState::Skipped,
            iterations: 0,
            removed: Vec::new(),
            average_error: 0.0,
            max_error: 0.0,
        };
        if subset.results.is_empty() {
            if subset.groups.len() > 1 || self.params.strategy != Strategy::TwoRound {
                warn!(
                    "subset {} has no usable pairwise results, skipped",
                    format_groups(&subset.groups)
                );
            }
            return SubsetSolution {
                report,
                transforms: identity,
            };
        }

        let index: BTreeMap<&Group, usize> = subset.groups.iter().enumerate().map(|(i, g)| (g, i)).collect();
        let pinned: BTreeSet<&Group> = self.params.fixed_groups.iter().collect();
        let base_fixed: Vec<bool> = subset.groups.iter().map(|g| pinned.contains(g)).collect();
        let mut links = self.links(subset, &index);

        loop {
            report.iterations += 1;
            let fixed = anchor_components(&base_fixed, links.iter().map(|(_, l)| (l.a, l.b)), |c| {
                c.iter().copied().min()
            });
            let active: Vec<Link> = links.iter().map(|(_, l)| l.clone()).collect();
            let transforms = match solve(self.params.model, dim, &fixed, &active) {
                Ok(t) => t,
                Err(e) => {
                    warn!("subset {}: fit failed: {e}", format_groups(&subset.groups));
                    report.state = SubsetState::Failed(e.to_string());
                    return SubsetSolution {
                        report,
                        transforms: identity,
                    };
                }
            };

            let errors: Vec<f64> = active.iter().map(|l| l.error(&transforms)).collect();
            let average = errors.iter().sum::<f64>() / errors.len() as f64;
            let (worst_idx, worst) = errors
                .iter()
                .copied()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |acc, (i, e)| if e > acc.1 { (i, e) } else { acc });
            report.average_error = average;
            report.max_error = worst;
            debug!(
                "subset {} iteration {}: avg error {average:.3}, max error {worst:.3} over {} links",
                format_groups(&subset.groups),
                report.iterations,
                links.len()
            );

            if self.params.strategy == Strategy::Simple
                || !self.params.thresholds.exceeded(worst, average)
            {
                report.state = SubsetState::Converged;
                return SubsetSolution { report, transforms };
            }
            if links.len() <= 1 {
                warn!(
                    "subset {} did not converge: max error {worst:.3} with no link left to remove",
                    format_groups(&subset.groups)
                );
                report.state = SubsetState::Exhausted;
                return SubsetSolution { report, transforms };
            }

            let (key, _) = links.remove(worst_idx);
            info!(
                "removing inconsistent link {} <> {} (error {worst:.3}, average {average:.3})",
                key.0, key.1
            );
            report.removed.push(key);
        }
    }

    /// Second round: move every round-one subset as a rigid block so that
    /// groups whose nominal boxes overlap keep their nominal relative placement.
    fn place_blocks(
        &self,
        subsets: &[Subset],
        solutions: &[SubsetSolution],
        dim: usize,
        metadata: &dyn TileMetadata,
    ) -> Result<BTreeMap<Group, AffineTransform>, GlobalOptError> {
        struct Member<'a> {
            group: &'a Group,
            block: usize,
            update: &'a AffineTransform,
            bounds: Option<BoundingBox>,
        }
        let members: Vec<Member> = subsets
            .iter()
            .zip(solutions)
            .enumerate()
            .flat_map(|(block, (s, sol))| {
                s.groups.iter().zip(&sol.transforms).map(move |(g, t)| (block, g, t))
            })
            .map(|(block, group, update)| Member {
                group,
                block,
                update,
                bounds: metadata.bounding_box(group),
            })
            .collect();

        let bounds: Vec<Option<&BoundingBox>> = members.iter().map(|m| m.bounds.as_ref()).collect();
        let mut weak = Vec::new();
        for (i, j) in overlapping_pairs(&bounds) {
            let (x, y) = (&members[i], &members[j]);
            if x.block == y.block || !self.params.partition.allows(x.group, y.group) {
                continue;
            }
            let (Some(bx), Some(by)) = (&x.bounds, &y.bounds) else {
                continue;
            };
            if let Some(overlap) = bx.intersect(by) {
                let q = overlap.center();
                weak.push(Link {
                    a: x.block,
                    b: y.block,
                    weight: 1.0,
                    matches: vec![PointMatch {
                        point_a: x.update.apply(&q),
                        point_b: y.update.apply(&q),
                    }],
                });
            }
        }

        let pinned: BTreeSet<&Group> = self.params.fixed_groups.iter().collect();
        let block_fixed: Vec<bool> = subsets
            .iter()
            .map(|s| s.groups.iter().any(|g| pinned.contains(g)))
            .collect();
        // Anchor the largest block (ties: the first) of each unanchored component.
        let fixed = anchor_components(&block_fixed, weak.iter().map(|l| (l.a, l.b)), |c| {
            c.iter()
                .copied()
                .max_by(|&p, &q| subsets[p].groups.len().cmp(&subsets[q].groups.len()).then(q.cmp(&p)))
        });
        info!(
            "two-round placement: {} blocks, {} weak links",
            subsets.len(),
            weak.len()
        );
        let offsets = solve(TransformModel::Translation, dim, &fixed, &weak)?;

        Ok(members
            .iter()
            .map(|m| (m.group.clone(), offsets[m.block].compose(m.update)))
            .collect())
    }
}

/// Index pairs `(i, j)`, `i < j`, whose boxes intersect, in ascending order.
///
/// Sort-and-sweep along the first axis; entries without a box are ignored.
fn overlapping_pairs(boxes: &[Option<&BoundingBox>]) -> Vec<(usize, usize)> {
    let mut order: Vec<(usize, &BoundingBox)> = boxes
        .iter()
        .enumerate()
        .filter_map(|(i, b)| b.map(|b| (i, b)))
        .filter(|(_, b)| b.dim() > 0)
        .collect();
    order.sort_by(|(i, p), (j, q)| p.min[0].total_cmp(&q.min[0]).then(i.cmp(j)));

    let mut pairs = Vec::new();
    for (k, &(i, bi)) in order.iter().enumerate() {
        for &(j, bj) in &order[k + 1..] {
            if bj.min[0] > bi.max[0] {
                break;
            }
            if bi.overlaps(bj) {
                pairs.push((i.min(j), i.max(j)));
            }
        }
    }
    pairs.sort_unstable();
    pairs
}

/// Mark one node fixed in every connected component without a fixed node.
fn anchor_components(
    fixed: &[bool],
    edges: impl IntoIterator<Item = (usize, usize)>,
    pick: impl Fn(&[usize]) -> Option<usize>,
) -> Vec<bool> {
    let labels = component_labels(fixed.len(), edges);
    let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (node, &label) in labels.iter().enumerate() {
        components.entry(label).or_default().push(node);
    }
    let mut out = fixed.to_vec();
    for nodes in components.values() {
        if nodes.iter().any(|&n| fixed[n]) {
            continue;
        }
        if let Some(n) = pick(nodes) {
            out[n] = true;
        }
    }
    out
}

fn format_groups(groups: &[Group]) -> String {
    match groups {
        [] => "[]".to_string(),
        [g] => g.to_string(),
        [first, .., last] => format!("[{first} .. {last}] ({} groups)", groups.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_need_both_bounds_exceeded() {
        let t = ConvergenceThresholds::default();
        assert!(t.exceeded(10.0, 1.0));
        assert!(!t.exceeded(3.0, 0.5));
        assert!(!t.exceeded(10.0, 5.0));
    }

    #[test]
    fn anchors_one_node_per_free_component() {
        let fixed = anchor_components(&[false, false, true, false, false], [(0, 1), (2, 3)], |c| {
            c.first().copied()
        });
        assert_eq!(fixed, vec![true, false, true, false, true]);
    }

    #[test]
    fn sweep_finds_the_same_pairs_as_a_full_scan() {
        let mut boxes = Vec::new();
        for k in 0..12 {
            let (x, y) = ((k % 4) as f64 * 90.0, (k / 4) as f64 * 90.0);
            boxes.push(BoundingBox::new(vec![x, y], vec![x + 99.0, y + 99.0]));
        }
        // Inside the x range of the grid but far below it.
        boxes.push(BoundingBox::new(vec![150.0, 500.0], vec![160.0, 510.0]));
        let mut refs: Vec<Option<&BoundingBox>> = boxes.iter().map(Some).collect();
        refs[5] = None;

        let mut expected = Vec::new();
        for i in 0..refs.len() {
            for j in i + 1..refs.len() {
                if let (Some(a), Some(b)) = (refs[i], refs[j]) {
                    if a.overlaps(b) {
                        expected.push((i, j));
                    }
                }
            }
        }
        let pairs = overlapping_pairs(&refs);
        assert_eq!(pairs, expected);
        assert!(pairs.contains(&(0, 1)));
        assert!(!pairs.contains(&(0, 5)));
        assert!(pairs.iter().all(|&(i, j)| i != 12 && j != 12));
    }

    #[test]
    fn params_round_trip_through_json_with_defaults() {
        let p: GlobalOptParams =
            serde_json::from_str(r#"{"strategy":"two_round","model":{"kind":"affine","regularization":0.5}}"#)
                .unwrap();
        assert_eq!(p.strategy, Strategy::TwoRound);
        assert_eq!(p.model, TransformModel::Affine { regularization: 0.5 });
        assert_eq!(p.thresholds, ConvergenceThresholds::default());
    }
}
