//! Normalization and tie management on automata read from text.

use carmel_fst::{Group, NormalizeMethod, Wfst, Weight};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn load(text: &str) -> Wfst {
    text.parse().unwrap_or_else(|e| panic!("bad automaton: {e}"))
}

fn out_sum(fst: &Wfst, state: usize) -> f64 {
    fst.arcs(state).iter().map(|a| a.weight).sum::<Weight>().to_real()
}

fn real(w: Weight) -> f64 {
    w.to_real()
}

#[test]
fn joint_groups_sum_to_one() {
    let mut fst = load(
        r#"
        f
        (s (s "a" 2) (m "b" 3) (f "c" 5))
        (m (f "a" 0.1) (f "a" 0.3))
        "#,
    );
    fst.normalize(NormalizeMethod::Joint).unwrap();
    let w: Vec<f64> = fst.arcs(0).iter().map(|a| real(a.weight)).collect();
    for (got, want) in w.iter().zip([0.2, 0.3, 0.5]) {
        assert!((got - want).abs() < 1e-12, "{w:?}");
    }
    assert!((out_sum(&fst, 1) - 1.0).abs() < 1e-12);
}

#[test]
fn conditional_groups_per_input() {
    let mut fst = load(
        r#"
        f
        (s (f "a" "x" 1) (f "a" "y" 3) (f "b" "x" 7))
        "#,
    );
    fst.normalize(NormalizeMethod::Conditional).unwrap();
    let w: Vec<f64> = fst.arcs(0).iter().map(|a| real(a.weight)).collect();
    assert!((w[0] - 0.25).abs() < 1e-12);
    assert!((w[1] - 0.75).abs() < 1e-12);
    assert!((w[2] - 1.0).abs() < 1e-12);
}

#[test]
fn locked_arcs_reserve_mass() {
    let mut fst = load(
        r#"
        f
        (s (f "a" 0.4!) (f "b" 1) (f "c" 1))
        "#,
    );
    fst.normalize(NormalizeMethod::Joint).unwrap();
    let arcs = fst.arcs(0);
    assert_eq!(arcs[0].group, Group::Locked);
    assert!((real(arcs[0].weight) - 0.4).abs() < 1e-12);
    assert!((real(arcs[1].weight) - 0.3).abs() < 1e-12);
    assert!((real(arcs[2].weight) - 0.3).abs() < 1e-12);
}

#[test]
fn tied_arcs_share_one_weight() {
    let mut fst = load(
        r#"
        f
        (0 (1 "a" 1!1) (1 "b" 1))
        (1 (f "a" 1!1) (f "c" 3))
        "#,
    );
    fst.normalize(NormalizeMethod::Joint).unwrap();
    let first = fst.arcs(0)[0].weight;
    let second = fst.arcs(1)[0].weight;
    assert!(first.approx_eq(second, 1e-12));
    // Tie total 2 over state totals 2 + 4.
    assert!((real(first) - 1.0 / 3.0).abs() < 1e-12);
    assert!((out_sum(&fst, 0) - 1.0).abs() < 1e-12);
    assert!((out_sum(&fst, 1) - 1.0).abs() < 1e-12);
}

#[test]
fn zero_tied_member_stays_zero() {
    let mut fst = load(
        r#"
        f
        (s (m "a" 0!1) (m "b" 1))
        (m (f "a" 1!1))
        "#,
    );
    fst.normalize(NormalizeMethod::Joint).unwrap();
    let s: Vec<f64> = fst.arcs(0).iter().map(|a| real(a.weight)).collect();
    assert!(fst.arcs(0)[0].weight.is_zero(), "{s:?}");
    assert!((s[1] - 1.0).abs() < 1e-12, "{s:?}");
    assert!(fst.arcs(1)[0].weight.is_one());
}

#[test]
fn tie_shares_room_left_by_locked_arcs() {
    let mut fst = load(
        r#"
        f
        (0 (1 "l" 0.2!) (1 "a" 1!1) (1 "b" 1))
        (1 (f "a" 1!1) (f "c" 3))
        "#,
    );
    fst.normalize(NormalizeMethod::Joint).unwrap();
    // Tie total 2 over state totals 2 + 4, scaled into the 0.8 left by the
    // heaviest locked mass.
    let tied = 2.0 * 0.8 / 6.0;
    let first = fst.arcs(0);
    assert!((real(first[0].weight) - 0.2).abs() < 1e-12);
    assert!((real(first[1].weight) - tied).abs() < 1e-12);
    assert!((real(first[2].weight) - (0.8 - tied)).abs() < 1e-12);
    let second = fst.arcs(1);
    assert!(second[0].weight.approx_eq(first[1].weight, 1e-12));
    assert!((real(second[1].weight) - (1.0 - tied)).abs() < 1e-12);
    assert!((out_sum(&fst, 0) - 1.0).abs() < 1e-12);
    assert!((out_sum(&fst, 1) - 1.0).abs() < 1e-12);
}

#[test]
fn zero_groups_stay_zero() {
    let mut fst = load("f (s (f \"a\" 0) (f \"b\" 0))");
    fst.normalize(NormalizeMethod::Joint).unwrap();
    assert!(fst.arcs(0).iter().all(|a| a.weight.is_zero()));
}

#[test]
fn none_leaves_weights_alone() {
    let text = "f (s (f \"a\" 5) (f \"b\" 7))";
    let mut fst = load(text);
    fst.normalize(NormalizeMethod::None).unwrap();
    assert_eq!(fst, load(text));
}

#[test]
fn tied_source_round_trip() {
    let mut source = load(
        r#"
        f
        (s (m "a" 1) (f "b" 1))
        (m (f "c" 1) (f "d" 1))
        "#,
    );
    let mut target = source.clone();
    let next = source.number_arcs_sequentially(1).unwrap();
    assert_eq!(next, 5);
    source.randomize_weights(&mut StdRng::seed_from_u64(7));

    target.number_arcs_sequentially(1).unwrap();
    target
        .add_arc(1, carmel_fst::FstArc::epsilon(2).with_group(Group::tied(99).unwrap()))
        .unwrap();
    let removed = target.assign_weights_from_tied_source(&source);
    assert_eq!(removed, 1);
    assert_eq!(target.num_arcs(), source.num_arcs());
    for ((_, a), (_, b)) in source.iter_arcs().zip(target.iter_arcs()) {
        assert_eq!(a.group, b.group);
        assert_eq!(a.weight, b.weight);
    }
}

#[test]
fn randomizing_respects_ties_and_locks() {
    let mut fst = load(
        r#"
        f
        (0 (1 "a" 1!3) (1 "b" 0.25!))
        (1 (f "a" 1!3) (f "c" 1))
        "#,
    );
    fst.randomize_weights(&mut StdRng::seed_from_u64(11));
    assert_eq!(fst.arcs(0)[0].weight, fst.arcs(1)[0].weight);
    assert!((real(fst.arcs(0)[1].weight) - 0.25).abs() < 1e-12);
    for (_, arc) in fst.iter_arcs() {
        let w = real(arc.weight);
        assert!(w > 0.0 && w <= 1.0);
    }
}
