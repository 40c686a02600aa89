mod common;

use common::*;
use tilestitch_core::{AffineTransform, ViewId};
use tilestitch_global::{
    filter_stale, remove_inconsistent_links, remove_stale, ConvergenceThresholds, GlobalOptParams,
    GlobalOptimizer, ResultGraph,
};

#[test]
fn moving_a_tile_invalidates_its_results() {
    let mut meta = square_metadata();
    let mut graph: ResultGraph = square_links(&meta, None).into_iter().collect();
    assert_eq!(graph.len(), 6);

    meta.set_transform(&ViewId::new(0, 2), AffineTransform::translation(&[0.0, 88.0]));
    let (fresh, stale) = filter_stale(&graph.snapshot(), &meta);
    assert_eq!(fresh.len(), 3);
    assert_eq!(stale.len(), 3);
    assert!(stale.iter().all(|(a, b)| *a == g(2) || *b == g(2)));

    assert_eq!(remove_stale(&mut graph, &meta), 3);
    assert_eq!(remove_stale(&mut graph, &meta), 0);
    assert!(graph.iter().all(|r| !r.involves(&g(2))));

    let outcome = GlobalOptimizer::new(GlobalOptParams {
        fixed_groups: vec![g(0)],
        ..GlobalOptParams::default()
    })
    .optimize(&graph.snapshot(), &[], &meta)
    .expect("optimize");
    assert!(!outcome.transforms.contains_key(&g(2)));
    assert_eq!(outcome.transforms.len(), 3);
}

#[test]
fn committing_optimizer_removals_is_idempotent() {
    let meta = square_metadata();
    let mut graph: ResultGraph = square_links(&meta, Some((1, 3, [0.0, -30.0]))).into_iter().collect();

    let outcome = GlobalOptimizer::new(GlobalOptParams {
        thresholds: ConvergenceThresholds {
            relative: 1.5,
            absolute: 3.5,
        },
        ..GlobalOptParams::default()
    })
    .optimize(&graph.snapshot(), &[], &meta)
    .expect("optimize");
    assert_eq!(outcome.removed, vec![(g(1), g(3))]);

    let summary = graph.commit(outcome.changes());
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.missing, 0);
    assert!(!graph.contains(&g(3), &g(1)));

    assert_eq!(remove_inconsistent_links(&outcome.removed, &mut graph), 1);
    assert_eq!(graph.len(), 5);
}
