// Structural mutators: pruning, reduction, consolidation, inversion and
// projection, plus path counting.

use std::mem;
use std::sync::Arc;

use carmel_core::{Alphabet, EPSILON, Weight};
use hashbrown::HashMap;
use tracing::debug;

use crate::arc::{FstArc, Group};
use crate::graph::ScalarGraph;
use crate::shortest_path::shortest_path_tree;
use crate::wfst::{Side, Wfst};
use crate::{StateId, WfstError};

impl Wfst {
    /// Remove arcs whose weight is below `threshold`. Returns how many
    /// were removed.
    pub fn prune_arcs(&mut self, threshold: Weight) -> usize {
        let mut removed = 0;
        for state in &mut self.states {
            let before = state.num_arcs();
            state.arcs_mut().retain(|arc| arc.weight >= threshold);
            removed += before - state.num_arcs();
        }
        removed
    }

    /// Drop arcs and states that lie on no start-to-final path weighing at
    /// least `best / keep_paths_within_ratio`, where `best` is the weight of
    /// the best path. Then, with `max_states`, keep only that many states
    /// ranked by the best path through them (start and final always stay),
    /// and reduce. Returns the number of states removed.
    ///
    /// `Weight::infinity()` as the ratio keeps every arc on some path.
    pub fn prune_paths(
        &mut self,
        max_states: Option<usize>,
        keep_paths_within_ratio: Weight,
    ) -> Result<usize, WfstError> {
        let final_state = self.ensure_valid()?;
        let start = self.start();
        let before = self.num_states();
        let graph = ScalarGraph::from_wfst(self, false);
        let to_final = shortest_path_tree(&graph, final_state)?;
        if !to_final.is_reachable(start) {
            self.clear();
            return Ok(before);
        }
        let from_start = shortest_path_tree(&graph.reverse(), start)?;

        let best = to_final.distance(start);
        let limit = best + keep_paths_within_ratio.ln().max(0.0) + 1e-9 * best.abs().max(1.0);
        let on_path = |s: StateId| from_start.is_reachable(s) && to_final.is_reachable(s);
        let through_state = |s: StateId| from_start.distance(s) + to_final.distance(s);

        let keep_edge: Vec<bool> = graph
            .edges()
            .iter()
            .map(|e| {
                e.is_usable()
                    && on_path(e.source)
                    && on_path(e.dest)
                    && from_start.distance(e.source) + e.cost + to_final.distance(e.dest) <= limit
            })
            .collect();
        let mut next_edge = 0;
        let mut arcs_removed = 0;
        for state in &mut self.states {
            let n = state.num_arcs();
            let keep = &keep_edge[next_edge..next_edge + n];
            next_edge += n;
            if keep.iter().all(|&k| k) {
                continue;
            }
            let mut i = 0;
            state.arcs_mut().retain(|_| {
                i += 1;
                keep[i - 1]
            });
            arcs_removed += n - state.num_arcs();
        }

        let mut remove: Vec<bool> = (0..before)
            .map(|s| !on_path(s) || through_state(s) > limit)
            .collect();
        if let Some(max) = max_states {
            let mut ranked: Vec<StateId> = (0..before).filter(|&s| !remove[s]).collect();
            ranked.sort_by(|&a, &b| through_state(a).total_cmp(&through_state(b)));
            for &s in ranked.iter().skip(max) {
                remove[s] = s != start && s != final_state;
            }
        }
        self.remove_marked_states(&remove);
        self.reduce()?;
        let removed = before - self.num_states();
        debug!(removed, arcs_removed, remaining = self.num_states(), "pruned paths");
        Ok(removed)
    }

    /// Number of start-to-final paths once every edge closing a cycle in a
    /// depth-first search from the start is ignored. Zero-weight arcs count.
    /// Kept as a weight since the count grows exponentially.
    pub fn num_no_cycle_paths(&self) -> Result<Weight, WfstError> {
        let final_state = self.ensure_valid()?;
        let graph = ScalarGraph::from_wfst(self, false);
        let (order, back) = graph.acyclic_order(self.start());
        let mut count = vec![Weight::zero(); self.num_states()];
        count[self.start()] = Weight::one();
        for &s in &order {
            let here = count[s];
            if here.is_zero() {
                continue;
            }
            for &id in graph.out_edge_ids(s) {
                if !back[id] {
                    count[graph.edge(id).dest] += here;
                }
            }
        }
        Ok(count[final_state])
    }

    /// Keep only states that lie on some start-to-final path, then drop
    /// empty epsilon self-loops. Returns the number of states removed.
    ///
    /// If the final state cannot be reached from the start, every state is
    /// removed and the automaton becomes invalid.
    pub fn reduce(&mut self) -> Result<usize, WfstError> {
        let final_state = self.ensure_valid()?;
        let graph = ScalarGraph::from_wfst(self, false);
        let forward = graph.reachable_from(self.start());
        let backward = graph.reverse().reachable_from(final_state);
        let before = self.num_states();

        if !forward[final_state] {
            self.clear();
            debug!(removed = before, "final state unreachable; automaton cleared");
            return Ok(before);
        }

        let remove: Vec<bool> = forward
            .iter()
            .zip(&backward)
            .map(|(&f, &b)| !(f && b))
            .collect();
        self.remove_marked_states(&remove);

        for (s, state) in self.states.iter_mut().enumerate() {
            if state.arcs().iter().any(|arc| arc.is_empty_self_loop(s)) {
                state.arcs_mut().retain(|arc| !arc.is_empty_self_loop(s));
            }
        }
        let removed = before - self.num_states();
        debug!(removed, remaining = self.num_states(), "reduced");
        Ok(removed)
    }

    /// Delete the states flagged in `remove`, together with every arc
    /// into them, and renumber the rest in order. If the final state is
    /// removed the automaton becomes invalid.
    pub fn remove_marked_states(&mut self, remove: &[bool]) {
        let mut new_index: Vec<Option<StateId>> = Vec::with_capacity(self.states.len());
        let mut next = 0;
        for s in 0..self.states.len() {
            if remove.get(s).copied().unwrap_or(false) {
                new_index.push(None);
            } else {
                new_index.push(Some(next));
                next += 1;
            }
        }
        if next == self.states.len() {
            return;
        }

        let names = self.state_names.take();
        let old_states = mem::take(&mut self.states);
        let mut kept_names = names.as_ref().map(|_| Alphabet::empty());
        for (s, mut state) in old_states.into_iter().enumerate() {
            if new_index[s].is_none() {
                continue;
            }
            state.arcs_mut().retain_mut(|arc| match new_index[arc.dest] {
                Some(dest) => {
                    arc.dest = dest;
                    true
                }
                None => false,
            });
            if let (Some(kept), Some(old)) = (kept_names.as_mut(), names.as_ref()) {
                let name = old.name(s as u32).map_or_else(|| s.to_string(), str::to_string);
                kept.get_or_insert(&name);
            }
            self.states.push(state);
        }
        self.state_names = kept_names;
        self.final_state = self.final_state.and_then(|f| new_index.get(f).copied().flatten());
    }

    /// Merge arcs of a state that share input, output, destination and
    /// group. The merged weight is the sum (or the maximum), optionally
    /// clamped to one. The first arc of each set keeps its position.
    /// Returns the number of arcs merged away.
    pub fn consolidate_arcs(&mut self, sum: bool, clamp: bool) -> usize {
        let mut merged = 0;
        for state in &mut self.states {
            let mut first: HashMap<(u32, u32, StateId, Group), usize> = HashMap::new();
            let mut out: Vec<FstArc> = Vec::with_capacity(state.num_arcs());
            for arc in state.arcs() {
                let key = (arc.input, arc.output, arc.dest, arc.group);
                match first.get(&key) {
                    Some(&at) => {
                        let kept = &mut out[at];
                        kept.weight = if sum {
                            kept.weight + arc.weight
                        } else {
                            kept.weight.max(arc.weight)
                        };
                        merged += 1;
                    }
                    None => {
                        first.insert(key, out.len());
                        out.push(*arc);
                    }
                }
            }
            if clamp {
                for arc in &mut out {
                    arc.weight = arc.weight.min(Weight::one());
                }
            }
            *state.arcs_mut() = out;
        }
        merged
    }

    /// Swap the input and output side of every arc, and the alphabets.
    pub fn invert(&mut self) {
        mem::swap(&mut self.input, &mut self.output);
        for state in &mut self.states {
            for arc in state.arcs_mut() {
                mem::swap(&mut arc.input, &mut arc.output);
            }
        }
    }

    /// Reduce to an acceptor over one side. With `identity` the other side
    /// copies the kept symbols and shares the kept alphabet; otherwise it
    /// becomes epsilon.
    pub fn project(&mut self, keep: Side, identity: bool) {
        for state in &mut self.states {
            for arc in state.arcs_mut() {
                let symbol = match keep {
                    Side::Input => arc.input,
                    Side::Output => arc.output,
                };
                let other = if identity { symbol } else { EPSILON };
                match keep {
                    Side::Input => arc.output = other,
                    Side::Output => arc.input = other,
                }
            }
        }
        if identity {
            match keep {
                Side::Input => self.output = Arc::clone(&self.input),
                Side::Output => self.input = Arc::clone(&self.output),
            }
        }
    }
}
