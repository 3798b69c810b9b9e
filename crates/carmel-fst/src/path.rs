// Paths extracted from an automaton.

use carmel_core::{EPSILON, Symbol, Weight};

use crate::StateId;
use crate::arc::FstArc;
use crate::wfst::{Side, Wfst};

/// One step of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathArc {
    pub source: StateId,
    pub input: Symbol,
    pub output: Symbol,
    pub dest: StateId,
    pub weight: Weight,
}

/// A sequence of arcs with the product of their weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub weight: Weight,
    pub arcs: Vec<PathArc>,
}

impl Path {
    pub fn new() -> Self {
        Path {
            weight: Weight::one(),
            arcs: Vec::new(),
        }
    }

    pub fn push(&mut self, source: StateId, arc: &FstArc) {
        self.weight *= arc.weight;
        self.arcs.push(PathArc {
            source,
            input: arc.input,
            output: arc.output,
            dest: arc.dest,
            weight: arc.weight,
        });
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// `-ln` of the path weight.
    pub fn cost(&self) -> f64 {
        self.weight.cost()
    }

    /// The non-epsilon symbols of one side, in order.
    pub fn symbols(&self, side: Side) -> Vec<Symbol> {
        self.arcs
            .iter()
            .map(|arc| match side {
                Side::Input => arc.input,
                Side::Output => arc.output,
            })
            .filter(|&s| s != EPSILON)
            .collect()
    }

    /// The states visited, starting with the first source.
    pub fn states(&self) -> Vec<StateId> {
        let mut states: Vec<StateId> = self.arcs.first().map(|a| a.source).into_iter().collect();
        states.extend(self.arcs.iter().map(|a| a.dest));
        states
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::new()
    }
}

impl Wfst {
    /// The non-epsilon symbols of `path` on one side, space separated.
    pub fn yield_of(&self, path: &Path, side: Side) -> String {
        let alphabet = self.alphabet(side);
        path.symbols(side)
            .into_iter()
            .map(|s| alphabet.name(s).unwrap_or("?"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::WfstBuilder;

    #[test]
    fn yields_skip_epsilon() {
        let mut b = WfstBuilder::new();
        b.arc("0", "1", "a", "*e*", 0.5)
            .arc("1", "2", "*e*", "y", 0.5)
            .arc("2", "3", "b", "z", 1.0)
            .final_state("3");
        let fst = b.build().unwrap();
        let mut path = Path::new();
        for (s, arc) in fst.iter_arcs() {
            path.push(s, arc);
        }
        assert_eq!(fst.yield_of(&path, Side::Input), "a b");
        assert_eq!(fst.yield_of(&path, Side::Output), "y z");
        assert!((path.weight.to_real() - 0.25).abs() < 1e-12);
        assert_eq!(path.states(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_path_has_weight_one() {
        let path = Path::default();
        assert!(path.is_empty());
        assert!(path.weight.is_one());
        assert!(path.states().is_empty());
    }
}
