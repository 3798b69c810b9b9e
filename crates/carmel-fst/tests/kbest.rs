//! End-to-end k-best enumeration over automata read from text.
//!
//! Weights are written as `e^-c` so that a path's cost is the sum of its
//! `c` values.

use carmel_fst::graph::GraphEdge;
use carmel_fst::{BestPathVisitor, BestPathsConfig, Side, Wfst, WfstError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DIAMOND: &str = r#"
    2
    (0 (1 "a" e^-1) (2 "c" e^-5))
    (1 (2 "b" e^-1) (2 "d" e^-3))
"#;

const LOOP: &str = r#"
    2
    (0 (1 "a" e^-1))
    (1 (1 "x" e^-1) (2 "b" e^-1))
"#;

#[derive(Default)]
struct Recorder {
    costs: Vec<f64>,
    ended: usize,
    arcs: usize,
}

impl BestPathVisitor for Recorder {
    fn start_path(&mut self, _rank: usize, cost: f64) {
        self.costs.push(cost);
    }

    fn end_path(&mut self) {
        self.ended += 1;
    }

    fn visit_best_arc(&mut self, _edge: &GraphEdge) {
        self.arcs += 1;
    }

    fn visit_sidetrack_arc(&mut self, _edge: &GraphEdge) {
        self.arcs += 1;
    }
}

fn load(text: &str) -> Wfst {
    text.parse().unwrap_or_else(|e| panic!("bad automaton: {e}"))
}

fn assert_costs(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
    }
}

// ---------------------------------------------------------------------------
// Ordering and exhaustion
// ---------------------------------------------------------------------------

#[test]
fn three_paths_in_cost_order() {
    let fst = load(DIAMOND);
    let mut rec = Recorder::default();
    let n = fst.best_paths(&BestPathsConfig::new(3), &mut rec).unwrap();
    assert_eq!(n, 3);
    assert_costs(&rec.costs, &[2.0, 4.0, 5.0]);
    assert_eq!(rec.ended, 3);
    assert_eq!(rec.arcs, 5);
}

#[test]
fn asking_for_more_than_exist_is_not_an_error() {
    let fst = load(DIAMOND);
    let paths = fst.best_paths_list(&BestPathsConfig::new(10)).unwrap();
    assert_eq!(paths.len(), 3);
    let yields: Vec<String> = paths.iter().map(|p| fst.yield_of(p, Side::Input)).collect();
    assert_eq!(yields, ["a b", "a d", "c"]);
    assert!(paths.windows(2).all(|w| w[0].weight >= w[1].weight));
}

#[test]
fn paths_carry_their_weights() {
    let fst = load(DIAMOND);
    let paths = fst.best_paths_list(&BestPathsConfig::new(3)).unwrap();
    for path in &paths {
        let product = path
            .arcs
            .iter()
            .fold(carmel_fst::Weight::one(), |acc, arc| acc * arc.weight);
        assert!(product.approx_eq(path.weight, 1e-12));
        assert_eq!(path.arcs.first().map(|a| a.source), Some(0));
        assert_eq!(path.arcs.last().map(|a| a.dest), fst.final_state());
    }
}

#[test]
fn equal_cost_paths_follow_arc_order() {
    let fst = load(
        r#"
        f
        (s (q "a" 0.5) (p "b" 0.25))
        (p (f "c" 0.5))
        (q (f "d" 0.25))
        "#,
    );
    let paths = fst.best_paths_list(&BestPathsConfig::new(2)).unwrap();
    assert_eq!(paths.len(), 2);
    assert!((paths[0].cost() - paths[1].cost()).abs() < 1e-12);
    assert_eq!(fst.yield_of(&paths[0], Side::Input), "a d");
    assert_eq!(fst.yield_of(&paths[1], Side::Input), "b c");
}

// ---------------------------------------------------------------------------
// Cycles
// ---------------------------------------------------------------------------

#[test]
fn cycle_is_reported_instead_of_looping() {
    let fst = load(LOOP);
    let mut rec = Recorder::default();
    let err = fst.best_paths(&BestPathsConfig::new(10), &mut rec).unwrap_err();
    assert!(matches!(err, WfstError::BestPathCycle { .. }), "{err}");
    // The first two paths take the loop at most once and finish.
    assert_eq!(rec.ended, 2);
    assert_costs(&rec.costs[..2], &[2.0, 3.0]);
}

#[test]
fn cycles_unrolled_when_allowed() {
    let fst = load(LOOP);
    let config = BestPathsConfig::new(5).allow_cycles();
    let paths = fst.best_paths_list(&config).unwrap();
    let costs: Vec<f64> = paths.iter().map(|p| p.cost()).collect();
    assert_costs(&costs, &[2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(fst.yield_of(&paths[2], Side::Input), "a x x b");
}

#[test]
fn invalid_automaton_is_rejected() {
    let mut rec = Recorder::default();
    let err = Wfst::new().best_paths(&BestPathsConfig::new(1), &mut rec).unwrap_err();
    assert!(matches!(err, WfstError::Invalid));
    assert!(rec.costs.is_empty());
}
