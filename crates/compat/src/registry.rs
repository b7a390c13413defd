//! Support registries consumed from outside the core compile (§6).
//!
//! In a full deployment these are shared with the rest of the keymap
//! compiler (symbols, geometry, keycodes sections all resolve keysyms and
//! virtual modifiers against the same tables). This crate defines narrow,
//! self-contained stand-ins so it can be exercised without those siblings.

use std::collections::HashMap;

use crate::action::Action;

/// Resolves a keysym name to its numeric code.
///
/// A production keymap compiler backs this with the full `ks_tables.h`
/// database (thousands of names); this crate only needs the seam.
pub trait KeysymRegistry {
    /// Resolves `name`, or `None` if it is not a known keysym.
    fn resolve(&self, name: &str) -> Option<u32>;
}

/// A small, illustrative keysym table covering the names used in this
/// crate's own tests and docs. Real deployments substitute their own
/// [`KeysymRegistry`] implementation.
#[derive(Debug, Default)]
pub struct BuiltinKeysyms {
    extra: HashMap<String, u32>,
}

impl BuiltinKeysyms {
    /// Creates a table seeded with the handful of well-known names this
    /// crate's tests reference.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an additional name, overriding the builtin table if the
    /// name collides.
    pub fn register(&mut self, name: &str, keysym: u32) {
        self.extra.insert(name.to_string(), keysym);
    }
}

impl KeysymRegistry for BuiltinKeysyms {
    fn resolve(&self, name: &str) -> Option<u32> {
        if let Some(&code) = self.extra.get(name) {
            return Some(code);
        }

        // A tiny slice of the real X11 keysym space, enough to exercise the
        // predicate/priority-flush logic without needing the full database.
        Some(match name {
            "Return" => 0xff0d,
            "space" | "Space" => 0x0020,
            "Tab" => 0xff09,
            "Escape" | "Esc" => 0xff1b,
            "BackSpace" => 0xff08,
            "Caps_Lock" => 0xffe5,
            "Num_Lock" => 0xff7f,
            "Shift_L" => 0xffe1,
            "Shift_R" => 0xffe2,
            "Control_L" => 0xffe3,
            "Control_R" => 0xffe4,
            "Super_L" => 0xffeb,
            "Super_R" => 0xffec,
            "Alt_L" => 0xffe9,
            "Alt_R" => 0xffea,
            other if other.len() == 1 && other.is_ascii() => other.as_bytes()[0] as u32,
            _ => return None,
        })
    }
}

/// Sentinel index meaning "no virtual modifier" for [`crate::interp::SymInterp::virtual_mod`].
pub const NUM_VMODS: usize = 16;

/// Maps virtual modifier names to small indices in `0..NUM_VMODS`.
///
/// Real resolution of a vmod's mask happens later, in the whole-keymap
/// fixup (§4.10 step 2) — this registry only owns the name↔index mapping,
/// mirroring the upstream `vmod.c` table.
#[derive(Debug, Default)]
pub struct VirtualModRegistry {
    names: Vec<String>,
}

impl VirtualModRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name`, assigning it the next free index. Returns `None` if
    /// the registry is already at [`NUM_VMODS`] capacity.
    pub fn intern(&mut self, name: &str) -> Option<u8> {
        if let Some(index) = self.index_of(name) {
            return Some(index);
        }
        if self.names.len() >= NUM_VMODS {
            return None;
        }
        self.names.push(name.to_string());
        Some((self.names.len() - 1) as u8)
    }

    /// Looks up an already-registered vmod's index.
    pub fn index_of(&self, name: &str) -> Option<u8> {
        self.names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|i| i as u8)
    }

    /// The name behind an index, if any.
    pub fn name_of(&self, index: u8) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }

    /// Number of distinct virtual modifiers registered so far.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if no virtual modifiers have been registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A chain of user-defined named action templates (`action Foo = ...;`),
/// looked up by name when a body assigns `action = Foo`.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    templates: HashMap<String, Action>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines (or replaces) a named action template.
    pub fn define(&mut self, name: &str, action: Action) {
        self.templates.insert(name.to_string(), action);
    }

    /// Looks up a named action template.
    pub fn get(&self, name: &str) -> Option<&Action> {
        self.templates.get(name)
    }
}
