// Per-state arc storage with a lazily built input-symbol index.

use std::sync::OnceLock;

use carmel_core::Symbol;
use hashbrown::HashMap;

use crate::arc::FstArc;

/// Arc positions grouped by input symbol, in first-appearance order.
#[derive(Debug, Clone, Default)]
pub struct InputIndex {
    symbols: Vec<Symbol>,
    positions: HashMap<Symbol, Vec<usize>>,
}

impl InputIndex {
    fn build(arcs: &[FstArc]) -> Self {
        let mut index = InputIndex::default();
        for (pos, arc) in arcs.iter().enumerate() {
            index
                .positions
                .entry(arc.input)
                .or_insert_with(|| {
                    index.symbols.push(arc.input);
                    Vec::new()
                })
                .push(pos);
        }
        index
    }

    /// Distinct input symbols, first appearance first.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Positions of arcs reading `symbol`, in arc order.
    pub fn positions(&self, symbol: Symbol) -> &[usize] {
        self.positions
            .get(&symbol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// One automaton state: an ordered arc list.
///
/// Arc order is significant; normalization, path search tie-breaks and the
/// text writer all follow it.
#[derive(Debug, Clone, Default)]
pub struct State {
    arcs: Vec<FstArc>,
    index: OnceLock<InputIndex>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_arcs(arcs: Vec<FstArc>) -> Self {
        State {
            arcs,
            index: OnceLock::new(),
        }
    }

    #[inline]
    pub fn arcs(&self) -> &[FstArc] {
        &self.arcs
    }

    /// Mutable access to the arc list. Drops the input index.
    pub fn arcs_mut(&mut self) -> &mut Vec<FstArc> {
        self.index.take();
        &mut self.arcs
    }

    /// Mutable access to arc fields without changing the list shape.
    /// The input index survives, so callers must not change `input`.
    pub(crate) fn arcs_in_place(&mut self) -> &mut [FstArc] {
        &mut self.arcs
    }

    pub fn add_arc(&mut self, arc: FstArc) {
        self.arcs_mut().push(arc);
    }

    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// The input-symbol index, built on first use.
    pub fn input_index(&self) -> &InputIndex {
        self.index.get_or_init(|| InputIndex::build(&self.arcs))
    }

    /// Iterate over arcs reading `symbol`.
    pub fn arcs_with_input(&self, symbol: Symbol) -> impl Iterator<Item = &FstArc> + Clone {
        self.input_index()
            .positions(symbol)
            .iter()
            .map(move |&pos| &self.arcs[pos])
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.arcs == other.arcs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carmel_core::Weight;

    fn arc(input: Symbol, dest: usize) -> FstArc {
        FstArc::new(input, input, dest, Weight::one())
    }

    #[test]
    fn index_groups_by_input() {
        let state = State::from_arcs(vec![arc(2, 0), arc(1, 1), arc(2, 2)]);
        assert_eq!(state.input_index().symbols(), &[2, 1]);
        let dests: Vec<_> = state.arcs_with_input(2).map(|a| a.dest).collect();
        assert_eq!(dests, vec![0, 2]);
        assert_eq!(state.arcs_with_input(9).count(), 0);
    }

    #[test]
    fn mutation_invalidates_index() {
        let mut state = State::from_arcs(vec![arc(1, 0)]);
        assert_eq!(state.input_index().symbols(), &[1]);
        state.add_arc(arc(3, 1));
        assert_eq!(state.input_index().symbols(), &[1, 3]);
        state.arcs_mut().remove(0);
        assert_eq!(state.input_index().symbols(), &[3]);
        assert_eq!(state.input_index().positions(3), &[0]);
    }
}
