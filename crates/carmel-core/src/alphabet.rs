// Symbol alphabet: interned strings indexed by dense ids.

use hashbrown::HashMap;

/// Dense symbol id. Id 0 is always epsilon.
pub type Symbol = u32;

/// The epsilon symbol id.
pub const EPSILON: Symbol = 0;

/// Printed name of the epsilon symbol.
pub const EPSILON_NAME: &str = "*e*";

/// A bidirectional map between symbol names and dense ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    names: Vec<String>,
    ids: HashMap<String, Symbol>,
}

impl Alphabet {
    /// A new alphabet containing only epsilon.
    pub fn new() -> Self {
        Self::with_first(EPSILON_NAME)
    }

    /// A new alphabet whose id 0 is `name` instead of epsilon.
    /// Used for state-name tables where id 0 is an ordinary name.
    pub fn with_first(name: &str) -> Self {
        let mut ids = HashMap::new();
        ids.insert(name.to_string(), 0);
        Alphabet {
            names: vec![name.to_string()],
            ids,
        }
    }

    /// An alphabet with no entries at all.
    pub fn empty() -> Self {
        Alphabet {
            names: Vec::new(),
            ids: HashMap::new(),
        }
    }

    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut alphabet = Self::new();
        for name in names {
            alphabet.get_or_insert(name);
        }
        alphabet
    }

    pub fn index_of(&self, name: &str) -> Option<Symbol> {
        self.ids.get(name).copied()
    }

    /// Return the id of `name`, adding it at the end if missing.
    pub fn get_or_insert(&mut self, name: &str) -> Symbol {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len() as Symbol;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn name(&self, id: Symbol) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn contains(&self, id: Symbol) -> bool {
        (id as usize) < self.names.len()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over `(id, name)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (i as Symbol, n.as_str()))
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsilon_is_zero() {
        let a = Alphabet::new();
        assert_eq!(a.index_of(EPSILON_NAME), Some(EPSILON));
        assert_eq!(a.name(EPSILON), Some("*e*"));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn insert_is_idempotent() {
        let mut a = Alphabet::new();
        let x = a.get_or_insert("x");
        let y = a.get_or_insert("y");
        assert_eq!(x, 1);
        assert_eq!(y, 2);
        assert_eq!(a.get_or_insert("x"), 1);
        assert_eq!(a.len(), 3);
        assert!(a.contains(2));
        assert!(!a.contains(3));
    }

    #[test]
    fn from_names_keeps_order() {
        let a = Alphabet::from_names(["b", "a", "b"]);
        let names: Vec<_> = a.iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["*e*", "b", "a"]);
    }

    #[test]
    fn state_name_table() {
        let mut names = Alphabet::with_first("start");
        assert_eq!(names.get_or_insert("mid"), 1);
        assert_eq!(names.name(0), Some("start"));
        assert!(Alphabet::empty().is_empty());
    }
}
