// The automaton type: alphabets, states and the final-state designation.

use std::borrow::Cow;
use std::sync::Arc;

use carmel_core::{Alphabet, Symbol, Weight};

use crate::arc::FstArc;
use crate::state::State;
use crate::{StateId, WfstError};

/// Which side of an arc (or which alphabet) an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Input,
    Output,
}

/// A weighted finite-state transducer.
///
/// State 0 is the start state. An automaton is *valid* when it has a final
/// state within range; every algorithm checks this before running.
///
/// Alphabets are reference counted and may be shared between automata
/// (for example after [`Wfst::project`] with `identity`). Mutating one goes
/// through [`Arc::make_mut`], so a shared table is copied first.
#[derive(Debug, Clone, PartialEq)]
pub struct Wfst {
    pub(crate) input: Arc<Alphabet>,
    pub(crate) output: Arc<Alphabet>,
    pub(crate) state_names: Option<Alphabet>,
    pub(crate) states: Vec<State>,
    pub(crate) final_state: Option<StateId>,
}

impl Wfst {
    /// An empty automaton with fresh alphabets. It has no final state yet
    /// and is therefore not valid.
    pub fn new() -> Self {
        Self::with_alphabets(Arc::new(Alphabet::new()), Arc::new(Alphabet::new()))
    }

    /// An empty automaton sharing existing alphabets.
    pub fn with_alphabets(input: Arc<Alphabet>, output: Arc<Alphabet>) -> Self {
        Wfst {
            input,
            output,
            state_names: None,
            states: Vec::new(),
            final_state: None,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn is_valid(&self) -> bool {
        self.final_state.is_some_and(|f| f < self.states.len())
    }

    /// The final state, or [`WfstError::Invalid`].
    pub fn ensure_valid(&self) -> Result<StateId, WfstError> {
        match self.final_state {
            Some(f) if f < self.states.len() => Ok(f),
            _ => Err(WfstError::Invalid),
        }
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_arcs(&self) -> usize {
        self.states.iter().map(State::num_arcs).sum()
    }

    pub fn start(&self) -> StateId {
        0
    }

    pub fn final_state(&self) -> Option<StateId> {
        self.final_state
    }

    pub fn is_final(&self, state: StateId) -> bool {
        self.final_state == Some(state)
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, state: StateId) -> Option<&State> {
        self.states.get(state)
    }

    /// Arcs leaving `state`; empty for an out-of-range index.
    pub fn arcs(&self, state: StateId) -> &[FstArc] {
        self.states.get(state).map(State::arcs).unwrap_or(&[])
    }

    /// Every arc with its source state, grouped by source.
    pub fn iter_arcs(&self) -> impl Iterator<Item = (StateId, &FstArc)> {
        self.states
            .iter()
            .enumerate()
            .flat_map(|(s, state)| state.arcs().iter().map(move |arc| (s, arc)))
    }

    pub fn input_alphabet(&self) -> &Alphabet {
        &self.input
    }

    pub fn output_alphabet(&self) -> &Alphabet {
        &self.output
    }

    pub fn alphabet(&self, side: Side) -> &Alphabet {
        match side {
            Side::Input => &self.input,
            Side::Output => &self.output,
        }
    }

    /// The shared handle of one alphabet, for building automata over the
    /// same symbol table.
    pub fn shared_alphabet(&self, side: Side) -> Arc<Alphabet> {
        match side {
            Side::Input => Arc::clone(&self.input),
            Side::Output => Arc::clone(&self.output),
        }
    }

    /// Mutable access to one alphabet, copying it first if shared.
    pub fn alphabet_mut(&mut self, side: Side) -> &mut Alphabet {
        match side {
            Side::Input => Arc::make_mut(&mut self.input),
            Side::Output => Arc::make_mut(&mut self.output),
        }
    }

    /// Whether both automata use the very same table for `side`.
    pub fn shares_alphabet(&self, other: &Wfst, side: Side) -> bool {
        match side {
            Side::Input => Arc::ptr_eq(&self.input, &other.input),
            Side::Output => Arc::ptr_eq(&self.output, &other.output),
        }
    }

    /// The state's name, or its decimal index when the automaton is anonymous.
    pub fn state_name(&self, state: StateId) -> Cow<'_, str> {
        match self
            .state_names
            .as_ref()
            .and_then(|names| names.name(state as Symbol))
        {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(state.to_string()),
        }
    }

    pub fn has_state_names(&self) -> bool {
        self.state_names.is_some()
    }

    /// Map space-separated symbol names to ids of one alphabet.
    pub fn symbol_list(&self, text: &str, side: Side) -> Result<Vec<Symbol>, WfstError> {
        let alphabet = self.alphabet(side);
        text.split_whitespace()
            .map(|name| {
                alphabet
                    .index_of(name)
                    .ok_or_else(|| WfstError::UnknownSymbol(name.to_string()))
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Structural mutators
    // -----------------------------------------------------------------------

    /// Append a state and return its index. Naming one state of an
    /// anonymous automaton names all earlier states by their index.
    pub fn add_state(&mut self, name: Option<&str>) -> StateId {
        let id = self.states.len();
        self.states.push(State::new());
        if let Some(name) = name {
            let names = self.state_names.get_or_insert_with(Alphabet::empty);
            while names.len() < id {
                let filler = names.len().to_string();
                names.get_or_insert(&filler);
            }
            names.get_or_insert(name);
        } else if let Some(names) = self.state_names.as_mut() {
            names.get_or_insert(&id.to_string());
        }
        id
    }

    pub fn add_arc(&mut self, source: StateId, arc: FstArc) -> Result<(), WfstError> {
        let num_states = self.states.len();
        if arc.dest >= num_states {
            return Err(WfstError::DestinationOutOfRange {
                state: source,
                dest: arc.dest,
                num_states,
            });
        }
        self.states
            .get_mut(source)
            .ok_or(WfstError::UnknownState(source))?
            .add_arc(arc);
        Ok(())
    }

    pub fn set_final(&mut self, state: StateId) -> Result<(), WfstError> {
        if state >= self.states.len() {
            return Err(WfstError::UnknownState(state));
        }
        self.final_state = Some(state);
        Ok(())
    }

    /// Remove every state, leaving the automaton invalid. Alphabets stay.
    pub fn clear(&mut self) {
        self.states.clear();
        self.state_names = None;
        self.final_state = None;
    }

    /// Make sure the final state has no outgoing arcs by moving finality to
    /// a fresh state reached by an epsilon arc. Returns the final state.
    pub fn ensure_final_sink(&mut self) -> Result<StateId, WfstError> {
        let old_final = self.ensure_valid()?;
        if self.states[old_final].is_empty() {
            return Ok(old_final);
        }
        let name = self
            .state_names
            .as_ref()
            .map(|_| format!("{}_final", self.state_name(old_final)));
        let sink = self.add_state(name.as_deref());
        self.states[old_final].add_arc(FstArc::epsilon(sink));
        self.final_state = Some(sink);
        Ok(sink)
    }

    // -----------------------------------------------------------------------
    // Whole-automaton weight edits
    // -----------------------------------------------------------------------

    /// Apply `f` to every arc weight.
    pub fn map_weights(&mut self, mut f: impl FnMut(&FstArc) -> Weight) {
        for state in &mut self.states {
            for arc in state.arcs_in_place() {
                arc.weight = f(arc);
            }
        }
    }

    /// Raise every arc weight to `exponent`.
    pub fn raise_power(&mut self, exponent: f64) {
        self.map_weights(|arc| arc.weight.pow(exponent));
    }

    pub fn set_constant_weights(&mut self, weight: Weight) {
        self.map_weights(|_| weight);
    }

    pub fn zero_arcs(&mut self) {
        self.set_constant_weights(Weight::zero());
    }
}

impl Default for Wfst {
    fn default() -> Self {
        Self::new()
    }
}
