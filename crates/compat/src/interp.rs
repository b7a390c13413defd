//! Symbol-interpretation records and their accumulator (§3 SymInterp, §4.2,
//! §4.8).

use bitflags::bitflags;

use crate::action::Action;
use crate::ast::{FileId, MergeMode};
use crate::diagnostics;
use crate::merge::{self, Outcome};
use crate::predicate::Predicate;

bitflags! {
    /// Behavior flags carried by a [`SymInterp`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InterpFlags: u8 {
        const AUTO_REPEAT = 1 << 0;
        const LOCKING_KEY = 1 << 1;
    }
}

bitflags! {
    /// Which fields of a [`SymInterp`] the accumulator has seen an explicit
    /// assignment for. Named after the upstream `_SI_*` bit defines.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct Defined: u8 {
        const VIRTUAL_MOD    = 1 << 0;
        const ACTION         = 1 << 1;
        const AUTO_REPEAT    = 1 << 2;
        const LOCKING_KEY    = 1 << 3;
        const LEVEL_ONE_ONLY = 1 << 4;
    }
}

/// A flat symbol-interpretation record, as flushed into
/// [`crate::keymap::Keymap::sym_interpret`].
#[derive(Debug, Clone, PartialEq)]
pub struct SymInterp {
    /// Keysym this interpretation matches, or 0 for the wildcard.
    pub sym: u32,
    /// Real-modifier mask the predicate operates on.
    pub mods: u8,
    /// Which of the five predicates to apply.
    pub predicate: Predicate,
    /// Whether this interpretation only applies effective-mods at level 0
    /// (§4.11: "the interpretation does NOT have LevelOneOnly").
    pub level_one_only: bool,
    /// Behavior flags.
    pub flags: InterpFlags,
    /// Virtual modifier this interpretation contributes to a key's
    /// `vmodmap`, if any.
    pub virtual_mod: Option<u8>,
    /// The action to bind when this interpretation wins.
    pub action: Action,
}

impl std::fmt::Display for SymInterp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}+{:?}({:#04x})", self.sym, self.predicate, self.mods)
    }
}

/// One entry in the accumulator: a [`SymInterp`] plus the bookkeeping the
/// merge algebra needs (§3, "Accumulator-only fields").
#[derive(Debug, Clone)]
pub struct InterpEntry {
    pub(crate) interp: SymInterp,
    defined: Defined,
    file_id: FileId,
    merge: MergeMode,
}

impl InterpEntry {
    /// Starts a blank entry for key `(sym, mods, predicate)`, to be
    /// populated by the default and then the statement body.
    pub fn new(sym: u32, mods: u8, predicate: Predicate, level_one_only: bool, file_id: FileId, merge: MergeMode) -> Self {
        Self {
            interp: SymInterp {
                sym,
                mods,
                predicate,
                level_one_only,
                flags: InterpFlags::empty(),
                virtual_mod: None,
                action: Action::NoAction,
            },
            defined: Defined::empty(),
            file_id,
            merge,
        }
    }

    /// Applies this crate's equivalent of `interpret.<field> = <value>`:
    /// sets one of the five mergeable fields and marks it defined.
    pub fn set_virtual_mod(&mut self, vmod: u8) {
        self.interp.virtual_mod = Some(vmod);
        self.defined |= Defined::VIRTUAL_MOD;
    }

    /// Sets the bound action.
    pub fn set_action(&mut self, action: Action) {
        self.interp.action = action;
        self.defined |= Defined::ACTION;
    }

    /// Sets the auto-repeat flag.
    pub fn set_auto_repeat(&mut self, value: bool) {
        self.interp.flags.set(InterpFlags::AUTO_REPEAT, value);
        self.defined |= Defined::AUTO_REPEAT;
    }

    /// Sets the locking-key flag.
    pub fn set_locking_key(&mut self, value: bool) {
        self.interp.flags.set(InterpFlags::LOCKING_KEY, value);
        self.defined |= Defined::LOCKING_KEY;
    }

    /// Sets the level-one-only flag.
    pub fn set_level_one_only(&mut self, value: bool) {
        self.interp.level_one_only = value;
        self.defined |= Defined::LEVEL_ONE_ONLY;
    }

    /// Returns a fresh entry for a new `(sym, mods, predicate)` key, seeded
    /// with this entry's already-defined body fields — the default-seeding
    /// rule of §4.2 ("each new interpretation statement is seeded from
    /// `dflt`").
    pub fn seed(&self, sym: u32, mods: u8, predicate: Predicate, level_one_only: bool, file_id: FileId, merge: MergeMode) -> Self {
        Self {
            interp: SymInterp {
                sym,
                mods,
                predicate,
                level_one_only,
                ..self.interp.clone()
            },
            defined: self.defined,
            file_id,
            merge,
        }
    }
}

/// Accumulates, deduplicates, and merges [`SymInterp`] records for one
/// compile scope (§4.2), draining them in priority order (§4.8).
#[derive(Debug)]
pub struct InterpAccumulator {
    entries: Vec<InterpEntry>,
    default: InterpEntry,
}

impl InterpAccumulator {
    /// Creates an empty accumulator with the default record seeded for
    /// `file_id`.
    pub fn new(file_id: FileId) -> Self {
        Self {
            entries: Vec::new(),
            default: InterpEntry::new(0, 0, Predicate::AnyOfOrNone, false, file_id, MergeMode::Override),
        }
    }

    /// The scope's default record (`interpret.<field> = <value>` at top
    /// level seeds this).
    pub fn default_entry_mut(&mut self) -> &mut InterpEntry {
        &mut self.default
    }

    /// Seeds a new entry from the current default, for the dispatcher to
    /// populate from one `InterpDef`'s body.
    pub fn seed_from_default(&self, sym: u32, mods: u8, predicate: Predicate, level_one_only: bool, file_id: FileId, merge: MergeMode) -> InterpEntry {
        self.default.seed(sym, mods, predicate, level_one_only, file_id, merge)
    }

    /// Creates a nested accumulator for a freshly-included file, carrying
    /// forward this scope's default record under the included file's own
    /// id and merge mode (`info->dflt` inheritance in `HandleIncludeCompatMap`).
    pub fn child(&self, file_id: FileId, merge: MergeMode) -> Self {
        let mut default = self.default.clone();
        default.file_id = file_id;
        default.merge = merge;
        Self {
            entries: Vec::new(),
            default,
        }
    }

    /// Folds every record of `self` into `into`, optionally forcing a merge
    /// mode on each one first (`MergeIncludedCompatMaps`).
    pub fn fold_into(self, into: &mut InterpAccumulator, merge_override: Option<MergeMode>, verbosity: u8) {
        for mut entry in self.entries {
            if let Some(merge) = merge_override {
                entry.merge = merge;
            }
            into.add(entry, verbosity);
        }
    }

    /// Implements `AddInterp` (§4.2).
    pub fn add(&mut self, new: InterpEntry, verbosity: u8) {
        let existing = self.entries.iter().position(|e| {
            e.interp.sym == new.interp.sym && e.interp.mods == new.interp.mods && e.interp.predicate == new.interp.predicate
        });

        let Some(pos) = existing else {
            self.entries.push(new);
            return;
        };

        if new.merge == MergeMode::Replace {
            let should_report = (self.entries[pos].file_id == new.file_id && verbosity > 0) || verbosity > 9;
            if should_report {
                diagnostics::replaced(new.file_id, new.interp.clone());
            }
            self.entries[pos] = new;
            return;
        }

        let mut collided = false;
        let old = &mut self.entries[pos];

        macro_rules! merge_field {
            ($bit:expr, $apply:expr) => {
                let resolution = merge::resolve_field(old.defined.contains($bit), new.defined.contains($bit), old.file_id, new.file_id, new.merge, verbosity);
                if resolution.collision.is_some() {
                    collided = true;
                }
                if resolution.outcome == Outcome::UseNew {
                    $apply(old, &new);
                    old.defined |= $bit;
                }
            };
        }

        merge_field!(Defined::VIRTUAL_MOD, |old: &mut InterpEntry, new: &InterpEntry| {
            old.interp.virtual_mod = new.interp.virtual_mod;
        });
        merge_field!(Defined::ACTION, |old: &mut InterpEntry, new: &InterpEntry| {
            old.interp.action = new.interp.action.clone();
        });
        merge_field!(Defined::AUTO_REPEAT, |old: &mut InterpEntry, new: &InterpEntry| {
            old.interp.flags.set(InterpFlags::AUTO_REPEAT, new.interp.flags.contains(InterpFlags::AUTO_REPEAT));
        });
        merge_field!(Defined::LOCKING_KEY, |old: &mut InterpEntry, new: &InterpEntry| {
            old.interp.flags.set(InterpFlags::LOCKING_KEY, new.interp.flags.contains(InterpFlags::LOCKING_KEY));
        });
        merge_field!(Defined::LEVEL_ONE_ONLY, |old: &mut InterpEntry, new: &InterpEntry| {
            old.interp.level_one_only = new.interp.level_one_only;
        });

        if collided {
            let chose = if new.merge != MergeMode::Augment { "last" } else { "first" };
            diagnostics::collision(new.file_id, new.interp.clone(), "interpretation", chose);
        }
    }

    /// Number of accumulated records (for tests and diagnostics).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no records have been accumulated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drains the accumulator into the eight-pass priority order of §4.8,
    /// ready to become [`crate::keymap::Keymap::sym_interpret`].
    pub fn flush(self) -> Vec<SymInterp> {
        let mut by_sym: Vec<SymInterp> = Vec::new();
        let mut wildcards: Vec<SymInterp> = Vec::new();

        for entry in self.entries {
            if entry.interp.sym != 0 {
                by_sym.push(entry.interp);
            } else {
                wildcards.push(entry.interp);
            }
        }

        let mut out = Vec::with_capacity(by_sym.len() + wildcards.len());
        for pass in [Predicate::Exactly, Predicate::AllOf, Predicate::AnyOf, Predicate::AnyOfOrNone] {
            flush_pass(&mut out, &by_sym, pass);
        }
        for pass in [Predicate::Exactly, Predicate::AllOf, Predicate::AnyOf, Predicate::AnyOfOrNone] {
            flush_pass(&mut out, &wildcards, pass);
        }
        out
    }
}

fn flush_pass(out: &mut Vec<SymInterp>, records: &[SymInterp], pass: Predicate) {
    for record in records {
        let matches_pass = match pass {
            Predicate::AllOf => matches!(record.predicate, Predicate::AllOf | Predicate::NoneOf),
            other => record.predicate == other,
        };
        if matches_pass {
            out.push(record.clone());
        }
    }
}
