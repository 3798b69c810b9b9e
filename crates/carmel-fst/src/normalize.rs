// Normalization with free, locked and tied arcs.
//
// A normalization group is either a whole state (joint) or the arcs of a
// state that read one input symbol (conditional). Locked arcs keep their
// weight and reserve their mass. Arcs of one tie group share a single
// weight computed from their totals over every normalization group they
// appear in, shrunk to leave room for the largest locked mass any of
// those groups holds. Free arcs split what is left in proportion to their
// current weights.
//
// Groups and arcs are visited in state order and arc order, so results
// are reproducible bit for bit.

use carmel_core::Weight;
use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::arc::Group;
use crate::wfst::Wfst;
use crate::{StateId, WfstError};

/// Slack allowed before an over-full group is reported.
const MASS_TOLERANCE: f64 = 1e-3;

/// How arcs are grouped for normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizeMethod {
    /// Leave weights alone.
    None,
    /// All arcs leaving a state sum to one.
    Joint,
    /// Arcs leaving a state with the same input symbol sum to one.
    #[default]
    Conditional,
}

impl std::str::FromStr for NormalizeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(NormalizeMethod::None),
            "joint" => Ok(NormalizeMethod::Joint),
            "conditional" => Ok(NormalizeMethod::Conditional),
            other => Err(format!("unknown normalization method `{other}`")),
        }
    }
}

/// Arc positions of one normalization group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormGroup {
    pub state: StateId,
    pub arcs: Vec<usize>,
}

/// Accumulated statistics of one tie group.
#[derive(Debug, Clone, Copy)]
struct TieTotals {
    arc_total: Weight,
    state_total: Weight,
    max_locked: Weight,
}

impl Wfst {
    /// The normalization groups under `method`, in state order. Within a
    /// state, conditional groups follow first appearance of each input.
    pub fn normalization_groups(&self, method: NormalizeMethod) -> Vec<NormGroup> {
        let mut groups = Vec::new();
        for (state, s) in self.states().iter().enumerate() {
            match method {
                NormalizeMethod::None => {}
                NormalizeMethod::Joint => {
                    if !s.is_empty() {
                        groups.push(NormGroup {
                            state,
                            arcs: (0..s.num_arcs()).collect(),
                        });
                    }
                }
                NormalizeMethod::Conditional => {
                    let index = s.input_index();
                    for &symbol in index.symbols() {
                        groups.push(NormGroup {
                            state,
                            arcs: index.positions(symbol).to_vec(),
                        });
                    }
                }
            }
        }
        groups
    }

    /// Normalize arc weights under `method`.
    pub fn normalize(&mut self, method: NormalizeMethod) -> Result<(), WfstError> {
        self.ensure_valid()?;
        if method == NormalizeMethod::None {
            return Ok(());
        }
        let groups = self.normalization_groups(method);

        // Pass 1: locked and unlocked sums per group, tie totals across groups.
        let mut ties: HashMap<u32, TieTotals> = HashMap::new();
        for group in &groups {
            let arcs = self.arcs(group.state);
            let mut locked_sum = Weight::zero();
            let mut free_sum = Weight::zero();
            for &i in &group.arcs {
                let arc = &arcs[i];
                if arc.group.is_locked() {
                    locked_sum += arc.weight;
                } else {
                    free_sum += arc.weight;
                }
            }
            for &i in &group.arcs {
                let arc = &arcs[i];
                let Some(tie) = arc.group.tie_id() else {
                    continue;
                };
                if arc.weight.is_zero() {
                    continue;
                }
                let totals = ties.entry(tie).or_insert(TieTotals {
                    arc_total: Weight::zero(),
                    state_total: Weight::zero(),
                    max_locked: Weight::zero(),
                });
                totals.arc_total += arc.weight;
                totals.state_total += free_sum;
                totals.max_locked = totals.max_locked.max(locked_sum);
            }
        }

        let tie_weights: HashMap<u32, Weight> = ties
            .iter()
            .map(|(&tie, t)| {
                let room = Weight::one() - t.max_locked;
                let w = if room.is_zero() || t.state_total.is_zero() {
                    Weight::zero()
                } else {
                    t.arc_total / (t.state_total / room)
                };
                (tie, w)
            })
            .collect();

        // Pass 2: nonzero tied arcs take the group weight, free arcs share the rest.
        for group in &groups {
            let state = &mut self.states[group.state];
            let arcs = state.arcs_in_place();
            let mut reserved = Weight::zero();
            let mut normal_sum = Weight::zero();
            for &i in &group.arcs {
                let arc = &mut arcs[i];
                match arc.group {
                    // A zero arc never gets mass back, and reserves none.
                    Group::Tied(_) if arc.weight.is_zero() => {}
                    Group::Tied(tie) => {
                        arc.weight = tie_weights.get(&tie.get()).copied().unwrap_or_default();
                        reserved += arc.weight;
                    }
                    Group::Locked => reserved += arc.weight,
                    Group::Free => normal_sum += arc.weight,
                }
            }
            if reserved.to_real() > 1.0 + MASS_TOLERANCE {
                warn!(
                    state = group.state,
                    reserved = reserved.to_real(),
                    "tied and locked arcs exceed total mass"
                );
            }
            let remaining = Weight::one() - reserved;
            let scale = if remaining.is_zero() || normal_sum.is_zero() {
                None
            } else {
                Some(normal_sum / remaining)
            };
            let mut total = reserved;
            for &i in &group.arcs {
                let arc = &mut arcs[i];
                if !arc.group.is_free() {
                    continue;
                }
                arc.weight = match scale {
                    Some(scale) => arc.weight / scale,
                    None => Weight::zero(),
                };
                total += arc.weight;
            }
            if total.to_real() > 1.0 + MASS_TOLERANCE {
                warn!(
                    state = group.state,
                    total = total.to_real(),
                    "normalized group sums above one"
                );
            }
        }
        debug!(groups = groups.len(), ties = ties.len(), ?method, "normalized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::WfstBuilder;

    fn close(w: Weight, x: f64) -> bool {
        (w.to_real() - x).abs() < 1e-9
    }

    fn state_sum(fst: &Wfst, state: StateId) -> f64 {
        fst.arcs(state).iter().map(|a| a.weight).sum::<Weight>().to_real()
    }

    #[test]
    fn joint_sums_to_one() {
        let mut b = WfstBuilder::new();
        b.arc("0", "1", "a", "a", 2.0)
            .arc("0", "1", "b", "b", 6.0)
            .arc("1", "2", "a", "a", 0.1)
            .final_state("2");
        let mut fst = b.build().unwrap();
        fst.normalize(NormalizeMethod::Joint).unwrap();
        assert!(close(fst.arcs(0)[0].weight, 0.25));
        assert!(close(fst.arcs(0)[1].weight, 0.75));
        assert!(close(fst.arcs(1)[0].weight, 1.0));
    }

    #[test]
    fn conditional_per_input() {
        let mut b = WfstBuilder::new();
        b.arc("0", "1", "a", "x", 1.0)
            .arc("0", "1", "a", "y", 3.0)
            .arc("0", "1", "b", "x", 5.0)
            .final_state("1");
        let mut fst = b.build().unwrap();
        fst.normalize(NormalizeMethod::Conditional).unwrap();
        let w: Vec<_> = fst.arcs(0).iter().map(|a| a.weight).collect();
        assert!(close(w[0], 0.25));
        assert!(close(w[1], 0.75));
        assert!(close(w[2], 1.0));
    }

    #[test]
    fn none_is_noop() {
        let mut b = WfstBuilder::new();
        b.arc("0", "1", "a", "a", 3.0).final_state("1");
        let mut fst = b.build().unwrap();
        fst.normalize(NormalizeMethod::None).unwrap();
        assert!(close(fst.arcs(0)[0].weight, 3.0));
    }

    #[test]
    fn locked_mass_is_reserved() {
        let mut b = WfstBuilder::new();
        b.arc_with("0", "1", "a", "a", Weight::from_real(0.4), Group::Locked)
            .arc("0", "1", "b", "b", 1.0)
            .arc("0", "1", "c", "c", 3.0)
            .final_state("1");
        let mut fst = b.build().unwrap();
        fst.normalize(NormalizeMethod::Joint).unwrap();
        let w: Vec<_> = fst.arcs(0).iter().map(|a| a.weight).collect();
        assert!(close(w[0], 0.4));
        assert!(close(w[1], 0.15));
        assert!(close(w[2], 0.45));
        assert!((state_sum(&fst, 0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn full_locked_mass_zeroes_free_arcs() {
        let mut b = WfstBuilder::new();
        b.arc_with("0", "1", "a", "a", Weight::one(), Group::Locked)
            .arc("0", "1", "b", "b", 0.5)
            .final_state("1");
        let mut fst = b.build().unwrap();
        fst.normalize(NormalizeMethod::Joint).unwrap();
        assert!(fst.arcs(0)[1].weight.is_zero());
        assert!(fst.arcs(0)[0].weight.is_one());
    }

    #[test]
    fn tied_arcs_share_weight() {
        let tie = Group::tied(1).unwrap();
        let mut b = WfstBuilder::new();
        b.arc("0", "1", "c", "c", 2.0)
            .arc_with("0", "2", "a", "a", Weight::from_real(1.0), tie)
            .arc("0", "2", "b", "b", 1.0)
            .arc_with("1", "2", "a", "a", Weight::from_real(3.0), tie)
            .arc("1", "2", "b", "b", 1.0)
            .final_state("2");
        let mut fst = b.build().unwrap();
        fst.normalize(NormalizeMethod::Joint).unwrap();
        let t0 = fst.arcs(0)[1].weight;
        let t1 = fst.arcs(1)[0].weight;
        assert_eq!(t0, t1);
        // (1 + 3) / (4 + 4)
        assert!(close(t0, 0.5));
        assert!((state_sum(&fst, 0) - 1.0).abs() < 1e-9);
        assert!((state_sum(&fst, 1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn tie_room_shrinks_for_locked_mass() {
        let tie = Group::tied(4).unwrap();
        let mut b = WfstBuilder::new();
        b.arc("0", "1", "c", "c", 1.0)
            .arc_with("0", "2", "a", "a", Weight::from_real(1.0), tie)
            .arc_with("0", "2", "l", "l", Weight::from_real(0.5), Group::Locked)
            .arc_with("1", "2", "a", "a", Weight::from_real(1.0), tie)
            .arc("1", "2", "b", "b", 1.0)
            .final_state("2");
        let mut fst = b.build().unwrap();
        fst.normalize(NormalizeMethod::Joint).unwrap();
        // arc total 2, state total 2 + 2, room 1 - 0.5
        let t = fst.arcs(0)[1].weight;
        assert!(close(t, 0.25));
        assert_eq!(fst.arcs(1)[0].weight, t);
        assert!((state_sum(&fst, 0) - 1.0).abs() < 1e-9);
        assert!((state_sum(&fst, 1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_arcs_stay_zero() {
        let mut b = WfstBuilder::new();
        b.arc("0", "1", "a", "a", 0.0)
            .arc("0", "1", "b", "b", 2.0)
            .final_state("1");
        let mut fst = b.build().unwrap();
        fst.normalize(NormalizeMethod::Joint).unwrap();
        assert!(fst.arcs(0)[0].weight.is_zero());
        assert!(close(fst.arcs(0)[1].weight, 1.0));
    }

    #[test]
    fn method_from_str() {
        assert_eq!("joint".parse::<NormalizeMethod>(), Ok(NormalizeMethod::Joint));
        assert!("bogus".parse::<NormalizeMethod>().is_err());
    }
}
