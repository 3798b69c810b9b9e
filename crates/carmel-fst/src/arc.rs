// Arcs and normalization groups.

use std::num::NonZeroU32;

use carmel_core::{EPSILON, Symbol, Weight};

use crate::StateId;

/// How an arc takes part in normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Group {
    /// Normalized independently.
    #[default]
    Free,
    /// Fixed weight; its mass is reserved before free arcs are normalized.
    Locked,
    /// Shares one weight with every arc carrying the same id.
    Tied(NonZeroU32),
}

impl Group {
    /// Tie group `id`, or `None` for id 0.
    pub fn tied(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Group::Tied)
    }

    pub fn tie_id(self) -> Option<u32> {
        match self {
            Group::Tied(id) => Some(id.get()),
            _ => None,
        }
    }

    #[inline]
    pub fn is_free(self) -> bool {
        self == Group::Free
    }

    #[inline]
    pub fn is_locked(self) -> bool {
        self == Group::Locked
    }

    #[inline]
    pub fn is_tied(self) -> bool {
        matches!(self, Group::Tied(_))
    }
}

/// A transition out of some state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FstArc {
    pub input: Symbol,
    pub output: Symbol,
    pub dest: StateId,
    pub weight: Weight,
    pub group: Group,
}

impl FstArc {
    pub fn new(input: Symbol, output: Symbol, dest: StateId, weight: Weight) -> Self {
        FstArc {
            input,
            output,
            dest,
            weight,
            group: Group::Free,
        }
    }

    /// An epsilon/epsilon arc of weight one.
    pub fn epsilon(dest: StateId) -> Self {
        Self::new(EPSILON, EPSILON, dest, Weight::one())
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.group = group;
        self
    }

    #[inline]
    pub fn is_epsilon(&self) -> bool {
        self.input == EPSILON && self.output == EPSILON
    }

    /// An epsilon/epsilon loop back to `source`; it changes nothing on any path.
    #[inline]
    pub fn is_empty_self_loop(&self, source: StateId) -> bool {
        self.is_epsilon() && self.dest == source
    }
}
