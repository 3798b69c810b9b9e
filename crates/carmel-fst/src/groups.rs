// Tie and lock management, and weight perturbation that respects ties.

use carmel_core::Weight;
use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use rand::Rng;

use crate::arc::Group;
use crate::wfst::Wfst;
use crate::WfstError;

/// A uniform draw from (0, 1].
fn random_fraction<R: Rng>(rng: &mut R) -> Weight {
    Weight::from_real(1.0 - rng.random::<f64>())
}

impl Wfst {
    fn set_groups(&mut self, group: Group) {
        for state in &mut self.states {
            for arc in state.arcs_in_place() {
                arc.group = group;
            }
        }
    }

    /// Make every arc free.
    pub fn untie_all_groups(&mut self) {
        self.set_groups(Group::Free);
    }

    /// Lock every arc.
    pub fn lock_all_arcs(&mut self) {
        self.set_groups(Group::Locked);
    }

    /// Put each arc in its own tie group, numbered from `start` in state
    /// and arc order. Returns the next unused label.
    pub fn number_arcs_sequentially(&mut self, start: u32) -> Result<u32, WfstError> {
        if start == 0 {
            return Err(WfstError::InvalidTieLabel(start));
        }
        let mut label = start;
        for state in &mut self.states {
            for arc in state.arcs_in_place() {
                arc.group = Group::tied(label).ok_or(WfstError::InvalidTieLabel(label))?;
                label = label.checked_add(1).ok_or(WfstError::InvalidTieLabel(label))?;
            }
        }
        Ok(label)
    }

    /// Copy the weight of each tie group in `source` onto the arcs of this
    /// automaton carrying the same tie id. Tied arcs whose id does not
    /// occur in `source` are removed; free and locked arcs are untouched.
    /// Returns the number of arcs removed.
    pub fn assign_weights_from_tied_source(&mut self, source: &Wfst) -> usize {
        let mut weights: HashMap<u32, Weight> = HashMap::new();
        for (_, arc) in source.iter_arcs() {
            if let Some(tie) = arc.group.tie_id() {
                weights.entry(tie).or_insert(arc.weight);
            }
        }
        let mut removed = 0;
        for state in &mut self.states {
            let before = state.num_arcs();
            state.arcs_mut().retain_mut(|arc| match arc.group.tie_id() {
                None => true,
                Some(tie) => match weights.get(&tie) {
                    Some(&w) => {
                        arc.weight = w;
                        true
                    }
                    None => false,
                },
            });
            removed += before - state.num_arcs();
        }
        removed
    }

    /// Replace each free arc weight, and each tie group's shared weight,
    /// with a random fraction in (0, 1]. Locked arcs keep their weight.
    pub fn randomize_weights<R: Rng>(&mut self, rng: &mut R) {
        self.perturb(rng, |_, draw| draw);
    }

    /// Multiply each free arc weight, and each tie group's shared weight,
    /// by a random fraction in (0, 1]. Locked arcs keep their weight.
    pub fn scale_weights_randomly<R: Rng>(&mut self, rng: &mut R) {
        self.perturb(rng, |w, draw| w * draw);
    }

    fn perturb<R: Rng>(&mut self, rng: &mut R, f: impl Fn(Weight, Weight) -> Weight) {
        let mut tied: HashMap<u32, Weight> = HashMap::new();
        for state in &mut self.states {
            for arc in state.arcs_in_place() {
                match arc.group {
                    Group::Locked => {}
                    Group::Free => arc.weight = f(arc.weight, random_fraction(rng)),
                    Group::Tied(tie) => {
                        arc.weight = match tied.entry(tie.get()) {
                            Entry::Occupied(e) => *e.get(),
                            Entry::Vacant(e) => *e.insert(f(arc.weight, random_fraction(rng))),
                        };
                    }
                }
            }
        }
    }
}
