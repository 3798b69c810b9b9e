// Forward and backward dynamic-program tables over (input prefix, output
// prefix, state).
//
// `forward[i][o][s]` is the total weight of all partial derivations from
// the start state to `s` that read the first `i` input symbols and write
// the first `o` output symbols. `backward[i][o][s]` is the total weight of
// completing from `s` having consumed that much. Epsilon/epsilon arcs stay
// inside one (i, o) cell, so states are visited in a topological order of
// the epsilon-only projection.

use carmel_core::{EPSILON, Symbol, Weight};

use crate::graph::ScalarGraph;
use crate::wfst::Wfst;
use crate::{StateId, WfstError};

/// A dense `(n_in + 1) x (n_out + 1) x n_states` table of weights.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardTable {
    n_in: usize,
    n_out: usize,
    n_states: usize,
    cells: Vec<Weight>,
}

impl ForwardTable {
    pub fn new(n_in: usize, n_out: usize, n_states: usize) -> Self {
        ForwardTable {
            n_in,
            n_out,
            n_states,
            cells: vec![Weight::zero(); (n_in + 1) * (n_out + 1) * n_states],
        }
    }

    /// Input length the table was built for.
    pub fn input_len(&self) -> usize {
        self.n_in
    }

    pub fn output_len(&self) -> usize {
        self.n_out
    }

    pub fn num_states(&self) -> usize {
        self.n_states
    }

    #[inline]
    fn offset(&self, i: usize, o: usize, s: StateId) -> usize {
        debug_assert!(i <= self.n_in && o <= self.n_out && s < self.n_states);
        (i * (self.n_out + 1) + o) * self.n_states + s
    }

    #[inline]
    pub fn get(&self, i: usize, o: usize, s: StateId) -> Weight {
        self.cells[self.offset(i, o, s)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, o: usize, s: StateId, w: Weight) {
        let at = self.offset(i, o, s);
        self.cells[at] = w;
    }

    #[inline]
    pub fn add(&mut self, i: usize, o: usize, s: StateId, w: Weight) {
        let at = self.offset(i, o, s);
        self.cells[at] += w;
    }
}

/// Where an arc moves in the table from cell `(i, o)`, if it matches.
#[inline]
fn step(input: &[Symbol], output: &[Symbol], i: usize, o: usize, arc_in: Symbol, arc_out: Symbol) -> Option<(usize, usize)> {
    let i2 = if arc_in == EPSILON {
        i
    } else if input.get(i) == Some(&arc_in) {
        i + 1
    } else {
        return None;
    };
    let o2 = if arc_out == EPSILON {
        o
    } else if output.get(o) == Some(&arc_out) {
        o + 1
    } else {
        return None;
    };
    Some((i2, o2))
}

impl Wfst {
    /// States in an order where every epsilon/epsilon arc goes forward.
    fn epsilon_order(&self) -> Result<Vec<StateId>, WfstError> {
        ScalarGraph::from_wfst(self, true)
            .topological_order()
            .map_err(WfstError::EpsilonCycle)
    }

    /// Fill the forward table for the given input and output sequences.
    pub fn forward_table(&self, input: &[Symbol], output: &[Symbol]) -> Result<ForwardTable, WfstError> {
        self.ensure_valid()?;
        let order = self.epsilon_order()?;
        let mut table = ForwardTable::new(input.len(), output.len(), self.num_states());
        table.set(0, 0, self.start(), Weight::one());
        for i in 0..=input.len() {
            for o in 0..=output.len() {
                for &s in &order {
                    let here = table.get(i, o, s);
                    if here.is_zero() {
                        continue;
                    }
                    for arc in self.arcs(s) {
                        if let Some((i2, o2)) = step(input, output, i, o, arc.input, arc.output) {
                            table.add(i2, o2, arc.dest, here * arc.weight);
                        }
                    }
                }
            }
        }
        Ok(table)
    }

    /// Fill the backward table; `backward[0][0][start]` equals
    /// `forward[n_in][n_out][final]`.
    pub fn backward_table(&self, input: &[Symbol], output: &[Symbol]) -> Result<ForwardTable, WfstError> {
        let final_state = self.ensure_valid()?;
        let order = self.epsilon_order()?;
        let mut table = ForwardTable::new(input.len(), output.len(), self.num_states());
        table.set(input.len(), output.len(), final_state, Weight::one());
        for i in (0..=input.len()).rev() {
            for o in (0..=output.len()).rev() {
                for &s in order.iter().rev() {
                    let mut total = table.get(i, o, s);
                    for arc in self.arcs(s) {
                        if let Some((i2, o2)) = step(input, output, i, o, arc.input, arc.output) {
                            total += arc.weight * table.get(i2, o2, arc.dest);
                        }
                    }
                    table.set(i, o, s, total);
                }
            }
        }
        Ok(table)
    }

    /// Total weight of all derivations reading exactly `input` and writing
    /// exactly `output`.
    pub fn sum_of_all_paths(&self, input: &[Symbol], output: &[Symbol]) -> Result<Weight, WfstError> {
        let final_state = self.ensure_valid()?;
        let table = self.forward_table(input, output)?;
        Ok(table.get(input.len(), output.len(), final_state))
    }
}
