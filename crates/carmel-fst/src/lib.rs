//! Weighted finite-state transducer engine.
//!
//! Automata are held in memory as a vector of states, each owning an ordered
//! arc list. Path searches run over a scalar projection of the automaton and
//! map their results back to arcs.
//!
//! # Architecture
//!
//! - [`arc`] -- Arcs and their normalization group
//! - [`state`] -- Per-state arc list with a lazy input-symbol index
//! - [`wfst`] -- The automaton type and its basic mutators
//! - [`build`] -- Validated construction from records, names or sequences
//! - [`config`] -- Per-call limits and text output options
//! - [`graph`] -- Scalar-cost digraph projection
//! - [`shortest_path`] -- Shortest-path tree toward a sink
//! - [`sidetrack`] -- Persistent sidetrack heaps
//! - [`kbest`] -- Eppstein k-shortest paths
//! - [`path`] -- Extracted paths and their yields
//! - [`normalize`] -- Normalization with tied and locked arcs
//! - [`groups`] -- Tie/lock management and weight perturbation
//! - [`sample`] -- Random paths and bounded generation
//! - [`forward`] -- Forward/backward dynamic-program tables
//! - [`ops`] -- Pruning, reduction, consolidation, inversion, projection
//! - [`text`] -- Legible text reader and writer

pub mod arc;
pub mod build;
pub mod config;
pub mod forward;
pub mod graph;
pub mod groups;
pub mod kbest;
pub mod normalize;
pub mod ops;
pub mod path;
pub mod sample;
pub mod shortest_path;
pub mod sidetrack;
pub mod state;
pub mod text;
pub mod wfst;

pub use arc::{FstArc, Group};
pub use build::WfstBuilder;
pub use config::{BestPathsConfig, GenerateConfig, RandomPathConfig, TextFormat};
pub use forward::ForwardTable;
pub use kbest::BestPathVisitor;
pub use normalize::NormalizeMethod;
pub use path::{Path, PathArc};
pub use text::{read_wfst, write_wfst};
pub use wfst::{Side, Wfst};

pub use carmel_core::{Alphabet, EPSILON, Symbol, Weight};

/// Index of a state within its automaton.
pub type StateId = usize;

/// Error type for automaton construction and algorithms.
#[derive(Debug, thiserror::Error)]
pub enum WfstError {
    #[error("automaton is invalid (no final state)")]
    Invalid,
    #[error("arc from state {state} points to state {dest}, but there are only {num_states} states")]
    DestinationOutOfRange {
        state: StateId,
        dest: StateId,
        num_states: usize,
    },
    #[error("no final state was set")]
    MissingFinal,
    #[error("unknown state {0}")]
    UnknownState(StateId),
    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),
    #[error("tie group labels must start at 1, got {0}")]
    InvalidTieLabel(u32),
    #[error("epsilon cycle through state {0}")]
    EpsilonCycle(StateId),
    #[error("negative-cost cycle reaches the final state")]
    NegativeCycle,
    #[error("best path {rank} repeats an arc out of state {state}")]
    BestPathCycle { rank: usize, state: StateId },
    #[error("no arc chosen out of state {0} despite positive total weight")]
    NoArcChosen(StateId),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("internal error: {0}")]
    Internal(&'static str),
}
