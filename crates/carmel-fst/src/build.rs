// Validated construction of automata.
//
// Every constructor either returns a consistent automaton or an error;
// there is no partially built result.

use std::sync::Arc;

use carmel_core::{Alphabet, Symbol, Weight};

use crate::arc::{FstArc, Group};
use crate::state::State;
use crate::wfst::Wfst;
use crate::{StateId, WfstError};

/// Builds an automaton from named states and symbols.
///
/// States are numbered in order of first mention, so the source of the
/// first arc becomes the start state. Naming the final state does not
/// count as a mention.
#[derive(Debug)]
pub struct WfstBuilder {
    input: Alphabet,
    output: Alphabet,
    names: Alphabet,
    arcs: Vec<Vec<FstArc>>,
    final_name: Option<String>,
}

impl WfstBuilder {
    pub fn new() -> Self {
        WfstBuilder {
            input: Alphabet::new(),
            output: Alphabet::new(),
            names: Alphabet::empty(),
            arcs: Vec::new(),
            final_name: None,
        }
    }

    /// Index of the named state, adding it if new.
    pub fn state(&mut self, name: &str) -> StateId {
        let id = self.names.get_or_insert(name) as StateId;
        if id == self.arcs.len() {
            self.arcs.push(Vec::new());
        }
        id
    }

    pub fn final_state(&mut self, name: &str) -> &mut Self {
        self.final_name = Some(name.to_string());
        self
    }

    pub fn input_symbol(&mut self, name: &str) -> Symbol {
        self.input.get_or_insert(name)
    }

    pub fn output_symbol(&mut self, name: &str) -> Symbol {
        self.output.get_or_insert(name)
    }

    /// Add a free arc between named states.
    pub fn arc(
        &mut self,
        source: &str,
        dest: &str,
        input: &str,
        output: &str,
        weight: f64,
    ) -> &mut Self {
        self.arc_with(source, dest, input, output, Weight::from_real(weight), Group::Free)
    }

    pub fn arc_with(
        &mut self,
        source: &str,
        dest: &str,
        input: &str,
        output: &str,
        weight: Weight,
        group: Group,
    ) -> &mut Self {
        let source = self.state(source);
        let dest = self.state(dest);
        let input = self.input.get_or_insert(input);
        let output = self.output.get_or_insert(output);
        self.arcs[source].push(FstArc::new(input, output, dest, weight).with_group(group));
        self
    }

    pub fn num_states(&self) -> usize {
        self.arcs.len()
    }

    /// Finish construction. A final state never mentioned by an arc is
    /// appended as a new state.
    pub fn build(mut self) -> Result<Wfst, WfstError> {
        let final_name = self.final_name.take().ok_or(WfstError::MissingFinal)?;
        let final_state = self.state(&final_name);
        let states = self.arcs.into_iter().map(State::from_arcs).collect();
        Ok(Wfst {
            input: Arc::new(self.input),
            output: Arc::new(self.output),
            state_names: Some(self.names),
            states,
            final_state: Some(final_state),
        })
    }
}

impl Default for WfstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Wfst {
    /// Build an anonymous automaton from `(source, arcs)` records over
    /// existing alphabets. Records for the same source are concatenated in
    /// order.
    pub fn from_records(
        input: Arc<Alphabet>,
        output: Arc<Alphabet>,
        num_states: usize,
        records: impl IntoIterator<Item = (StateId, Vec<FstArc>)>,
        final_state: StateId,
    ) -> Result<Wfst, WfstError> {
        if final_state >= num_states {
            return Err(WfstError::UnknownState(final_state));
        }
        let mut states = vec![State::new(); num_states];
        for (source, arcs) in records {
            let state = states
                .get_mut(source)
                .ok_or(WfstError::UnknownState(source))?;
            for arc in arcs {
                if arc.dest >= num_states {
                    return Err(WfstError::DestinationOutOfRange {
                        state: source,
                        dest: arc.dest,
                        num_states,
                    });
                }
                if !input.contains(arc.input) {
                    return Err(WfstError::UnknownSymbol(arc.input.to_string()));
                }
                if !output.contains(arc.output) {
                    return Err(WfstError::UnknownSymbol(arc.output.to_string()));
                }
                state.add_arc(arc);
            }
        }
        Ok(Wfst {
            input,
            output,
            state_names: None,
            states,
            final_state: Some(final_state),
        })
    }

    /// The straight-line identity acceptor `0 -s1-> 1 -s2-> ... -> n`.
    /// Input and output share one fresh alphabet.
    pub fn from_sequence<S: AsRef<str>>(symbols: &[S]) -> Wfst {
        let mut alphabet = Alphabet::new();
        let ids: Vec<Symbol> = symbols
            .iter()
            .map(|s| alphabet.get_or_insert(s.as_ref()))
            .collect();
        let shared = Arc::new(alphabet);
        Self::sequence_over(Arc::clone(&shared), shared, &ids)
    }

    /// The straight-line identity acceptor over existing symbol ids, which
    /// must all belong to `alphabet`.
    pub fn from_symbol_sequence(
        alphabet: Arc<Alphabet>,
        symbols: &[Symbol],
    ) -> Result<Wfst, WfstError> {
        if let Some(&bad) = symbols.iter().find(|&&s| !alphabet.contains(s)) {
            return Err(WfstError::UnknownSymbol(bad.to_string()));
        }
        Ok(Self::sequence_over(Arc::clone(&alphabet), alphabet, symbols))
    }

    fn sequence_over(input: Arc<Alphabet>, output: Arc<Alphabet>, symbols: &[Symbol]) -> Wfst {
        let mut states: Vec<State> = symbols
            .iter()
            .enumerate()
            .map(|(i, &s)| State::from_arcs(vec![FstArc::new(s, s, i + 1, Weight::one())]))
            .collect();
        states.push(State::new());
        Wfst {
            input,
            output,
            state_names: None,
            final_state: Some(symbols.len()),
            states,
        }
    }
}
