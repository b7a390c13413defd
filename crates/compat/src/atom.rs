//! Atom interning.
//!
//! Interns short names (interpretation sections, indicator names, vmod
//! names) to small integer ids so records can be compared and hashed
//! cheaply instead of carrying owned strings around. Mirrors the upstream
//! `xkb_context` atom table; §6 lists `intern`/`lookup` as an external
//! collaborator, but since no shared context type exists in this standalone
//! crate, interning is owned locally by whichever accumulator needs it
//! (chiefly [`crate::indicator::IndicatorAccumulator`] and
//! [`crate::keymap::Keymap::indicator_names`]).

use std::collections::HashMap;

/// An interned string id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Atom(u32);

/// A simple bidirectional string interner.
#[derive(Debug, Default)]
pub struct AtomTable {
    by_name: HashMap<String, Atom>,
    names: Vec<String>,
}

impl AtomTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name`, returning its existing atom if already known.
    pub fn intern(&mut self, name: &str) -> Atom {
        if let Some(atom) = self.by_name.get(name) {
            return *atom;
        }

        let atom = Atom(self.names.len() as u32);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), atom);
        atom
    }

    /// Looks up an already-interned name without creating a new atom.
    pub fn lookup(&self, name: &str) -> Option<Atom> {
        self.by_name.get(name).copied()
    }

    /// Returns the string behind an atom.
    pub fn name(&self, atom: Atom) -> &str {
        &self.names[atom.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut table = AtomTable::new();
        let a = table.intern("Caps Lock");
        let b = table.intern("Caps Lock");
        assert_eq!(a, b);
        assert_eq!(table.name(a), "Caps Lock");
    }

    #[test]
    fn distinct_names_get_distinct_atoms() {
        let mut table = AtomTable::new();
        let a = table.intern("Caps Lock");
        let b = table.intern("Num Lock");
        assert_ne!(a, b);
    }
}
