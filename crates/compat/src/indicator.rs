//! Indicator (LED) maps and their binding to numbered slots (§3 LEDInfo,
//! §4.3, §4.9).

use bitflags::bitflags;

use crate::ast::{FileId, MergeMode};
use crate::atom::Atom;
use crate::config::NUM_INDICATORS;
use crate::diagnostics;

bitflags! {
    /// Behavior flags carried by an [`LedInfo`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LedFlags: u8 {
        /// This indicator was explicitly bound by name in source and must
        /// not be touched by automatic binding (§4.9 phase B).
        const EXPLICIT = 1 << 0;
        /// Eligible for automatic binding to a free slot (§4.9 phase B).
        const AUTOMATIC = 1 << 1;
        /// This indicator drives physical keyboard hardware rather than a
        /// purely virtual state.
        const DRIVES_KBD = 1 << 2;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct Defined: u8 {
        const INDEX      = 1 << 0;
        const MODS       = 1 << 1;
        const GROUPS     = 1 << 2;
        const CTRLS      = 1 << 3;
        const EXPLICIT   = 1 << 4;
        const AUTOMATIC  = 1 << 5;
        const DRIVES_KBD = 1 << 6;
    }
}

/// A single numbered indicator's resolved binding, as flushed into
/// [`crate::keymap::Keymap::indicators`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedInfo {
    /// `real_mods | VModsToReal(vmods)`, recomputed by the fixup pass.
    pub mask: u8,
    /// Real-modifier mask that lights this indicator.
    pub real_mods: u8,
    /// Virtual-modifier mask that lights this indicator.
    pub vmods: u16,
    /// Which state components (`base`, `latched`, `locked`, `effective`,
    /// `compat`, `any`) `real_mods`/`vmods` are checked against (§3 LEDInfo,
    /// `whichModState`). An empty mask means "not mod-driven".
    pub which_mods: crate::mask::StateComponent,
    /// Group mask that lights this indicator.
    pub groups: u32,
    /// Same-shaped state-component mask for `groups` (`whichGroupState`).
    pub which_groups: crate::mask::StateComponent,
    /// Controls mask (keyboard control flags, e.g. RepeatKeys) that lights
    /// this indicator.
    pub ctrls: u32,
    /// Behavior flags.
    pub flags: LedFlags,
}

/// One accumulated indicator-map record prior to slot binding.
#[derive(Debug, Clone)]
pub struct LedEntry {
    name: Atom,
    indicator: Option<u8>,
    info: LedInfo,
    defined: Defined,
    file_id: FileId,
    merge: MergeMode,
}

impl LedEntry {
    /// Starts a blank record for `name`.
    pub fn new(name: Atom, file_id: FileId, merge: MergeMode) -> Self {
        Self {
            name,
            indicator: None,
            info: LedInfo::default(),
            defined: Defined::empty(),
            file_id,
            merge,
        }
    }

    /// Sets the explicit 1-based slot index this indicator is bound to.
    pub fn set_index(&mut self, indicator: u8) {
        self.indicator = Some(indicator);
        self.defined |= Defined::INDEX;
    }

    /// Sets the real/virtual modifier mask (the `modifiers`/`mods` field).
    pub fn set_mods(&mut self, real_mods: u8, vmods: u16) {
        self.info.real_mods = real_mods;
        self.info.vmods = vmods;
        self.defined |= Defined::MODS;
    }

    /// Sets which state components `real_mods`/`vmods` are checked against
    /// (the `whichModState`/`whichModifierState` field). Bundled under the
    /// same `Defined::MODS` bit as `set_mods` — §4.3 lists `Mods` as one
    /// composite merge field covering `which_mods`, `real_mods`, `vmods`.
    pub fn set_which_mods(&mut self, which: crate::mask::StateComponent) {
        self.info.which_mods = which;
        self.defined |= Defined::MODS;
    }

    /// Sets the group mask (the `groups` field).
    pub fn set_groups(&mut self, groups: u32) {
        self.info.groups = groups;
        self.defined |= Defined::GROUPS;
    }

    /// Sets which state components `groups` is checked against (the
    /// `whichGroupState` field), bundled under `Defined::GROUPS` for the
    /// same reason as `set_which_mods` above.
    pub fn set_which_groups(&mut self, which: crate::mask::StateComponent) {
        self.info.which_groups = which;
        self.defined |= Defined::GROUPS;
    }

    /// Sets the controls mask.
    pub fn set_ctrls(&mut self, ctrls: u32) {
        self.info.ctrls = ctrls;
        self.defined |= Defined::CTRLS;
    }

    /// Sets the explicit flag.
    pub fn set_explicit(&mut self, value: bool) {
        self.info.flags.set(LedFlags::EXPLICIT, value);
        self.defined |= Defined::EXPLICIT;
    }

    /// Sets the automatic flag.
    pub fn set_automatic(&mut self, value: bool) {
        self.info.flags.set(LedFlags::AUTOMATIC, value);
        self.defined |= Defined::AUTOMATIC;
    }

    /// Sets the drives-keyboard flag.
    pub fn set_drives_kbd(&mut self, value: bool) {
        self.info.flags.set(LedFlags::DRIVES_KBD, value);
        self.defined |= Defined::DRIVES_KBD;
    }

    /// Returns a fresh entry for indicator map `name`, seeded with this
    /// entry's already-defined body fields — the same default-seeding rule
    /// §4.2 describes for interpretations, applied to `ledDflt` (§4.3).
    pub fn seed(&self, name: Atom, file_id: FileId, merge: MergeMode) -> Self {
        Self {
            name,
            indicator: self.indicator,
            info: self.info,
            defined: self.defined,
            file_id,
            merge,
        }
    }

    /// Carries this scope's `ledDflt` forward into a nested include's own
    /// scope, under the included file's id and merge mode (mirrors
    /// `InterpAccumulator::child`'s inheritance for `dflt`).
    pub fn seed_for_child(&self, file_id: FileId, merge: MergeMode) -> Self {
        Self { file_id, merge, ..self.clone() }
    }
}

/// Accumulates indicator-map definitions by name (§4.3), prior to the
/// slot-binding pass of §4.9.
#[derive(Debug, Default)]
pub struct IndicatorAccumulator {
    entries: Vec<LedEntry>,
}

impl IndicatorAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds every record of `self` into `into`, optionally forcing a merge
    /// mode on each one first (`MergeIncludedCompatMaps`), mirroring
    /// `InterpAccumulator::fold_into`.
    pub fn fold_into(self, into: &mut IndicatorAccumulator, merge_override: Option<MergeMode>, verbosity: u8) {
        for mut entry in self.entries {
            if let Some(merge) = merge_override {
                entry.merge = merge;
            }
            into.add(entry, verbosity);
        }
    }

    /// Implements `AddIndicatorMap` (§4.3).
    pub fn add(&mut self, new: LedEntry, verbosity: u8) {
        let existing = self.entries.iter().position(|e| e.name == new.name);

        let Some(pos) = existing else {
            self.entries.push(new);
            return;
        };

        let old = &mut self.entries[pos];

        // Fast path: every merge-relevant value field matches, so only the
        // defined-bits need OR-ing in; flags are left untouched even if the
        // new record specifies different ones.
        if old.info.real_mods == new.info.real_mods
            && old.info.vmods == new.info.vmods
            && old.info.groups == new.info.groups
            && old.info.ctrls == new.info.ctrls
            && old.info.which_mods == new.info.which_mods
            && old.info.which_groups == new.info.which_groups
        {
            old.defined |= new.defined;
            return;
        }

        if new.merge == MergeMode::Replace {
            let should_report = (old.file_id == new.file_id && verbosity > 0) || verbosity > 9;
            if should_report {
                diagnostics::warn(new.file_id, format!("map for indicator {:?} redefined; earlier definition ignored", new.name));
            }
            let name = old.name;
            *old = new;
            old.name = name;
            return;
        }

        let mut collided = false;

        macro_rules! merge_field {
            ($bit:expr, $apply:expr) => {
                let resolution = crate::merge::resolve_field(old.defined.contains($bit), new.defined.contains($bit), old.file_id, new.file_id, new.merge, verbosity);
                if resolution.collision.is_some() {
                    collided = true;
                }
                if resolution.outcome == crate::merge::Outcome::UseNew {
                    $apply(old, &new);
                    old.defined |= $bit;
                }
            };
        }

        merge_field!(Defined::INDEX, |old: &mut LedEntry, new: &LedEntry| old.indicator = new.indicator);
        merge_field!(Defined::MODS, |old: &mut LedEntry, new: &LedEntry| {
            old.info.which_mods = new.info.which_mods;
            old.info.real_mods = new.info.real_mods;
            old.info.vmods = new.info.vmods;
        });
        merge_field!(Defined::GROUPS, |old: &mut LedEntry, new: &LedEntry| {
            old.info.which_groups = new.info.which_groups;
            old.info.groups = new.info.groups;
        });
        merge_field!(Defined::CTRLS, |old: &mut LedEntry, new: &LedEntry| old.info.ctrls = new.info.ctrls);
        merge_field!(Defined::EXPLICIT, |old: &mut LedEntry, new: &LedEntry| old.info.flags.set(LedFlags::EXPLICIT, new.info.flags.contains(LedFlags::EXPLICIT)));
        merge_field!(Defined::AUTOMATIC, |old: &mut LedEntry, new: &LedEntry| old.info.flags.set(LedFlags::AUTOMATIC, new.info.flags.contains(LedFlags::AUTOMATIC)));
        merge_field!(Defined::DRIVES_KBD, |old: &mut LedEntry, new: &LedEntry| old.info.flags.set(LedFlags::DRIVES_KBD, new.info.flags.contains(LedFlags::DRIVES_KBD)));

        if collided {
            let chose = if new.merge == MergeMode::Augment { "first" } else { "last" };
            diagnostics::warn(new.file_id, format!("map for indicator {:?} redefined; using {chose} definition for duplicate fields", new.name));
        }
    }

    /// Binds every accumulated record to a numbered slot (§4.9), writing
    /// directly into the keymap's own `indicator_names`/`indicators`
    /// tables so that a pre-existing binding (from an earlier compat
    /// section, or from some other part of the keymap compiler this crate
    /// doesn't implement) is visible to phase A.
    ///
    /// Records whose [`LedEntry::set_index`] was called are flushed first,
    /// unconditionally claiming their slot (`CopyIndicatorMapDefs`); this
    /// mirrors the upstream source exactly and is why an explicit index
    /// never produces a "multiple names" diagnostic — only the phases
    /// below, run over the remaining unbound records, can.
    ///
    /// (A) each remaining record binds to the slot already named after it,
    ///     if one exists.
    /// (B) each still-unbound record claims the lowest-numbered free slot,
    ///     claiming the name for it.
    /// (C) a record that could not be placed at all is dropped with "no
    ///     unnamed indicators found"; a record whose resolved slot turns
    ///     out to carry a different name than its own (only reachable if
    ///     two records raced for the same slot across phases A/B) is
    ///     dropped with "multiple names bound".
    pub fn bind(self, names: &mut [Option<Atom>; NUM_INDICATORS], infos: &mut [LedInfo; NUM_INDICATORS], atoms: &crate::atom::AtomTable) {
        let mut unbound: Vec<LedEntry> = Vec::new();
        for entry in self.entries {
            match entry.indicator {
                Some(slot) if (slot as usize) < NUM_INDICATORS => {
                    let slot = slot as usize;
                    names[slot] = Some(entry.name);
                    infos[slot] = entry.info;
                }
                Some(slot) => {
                    diagnostics::err(entry.file_id, format!("indicator index {slot} out of range; map for {:?} not compiled", atoms.name(entry.name)));
                }
                None => unbound.push(entry),
            }
        }

        for entry in &mut unbound {
            if let Some(slot) = names.iter().position(|n| *n == Some(entry.name)) {
                entry.indicator = Some(slot as u8);
            }
        }

        for entry in &mut unbound {
            if entry.indicator.is_none() {
                if let Some(free) = names.iter().position(Option::is_none) {
                    names[free] = Some(entry.name);
                    entry.indicator = Some(free as u8);
                }
            }
        }

        for entry in unbound {
            let Some(slot) = entry.indicator.map(usize::from) else {
                diagnostics::warn(entry.file_id, format!("no unnamed indicators found; virtual indicator map {:?} not bound", atoms.name(entry.name)));
                continue;
            };

            if names[slot] != Some(entry.name) {
                diagnostics::err(
                    entry.file_id,
                    format!(
                        "multiple names bound to indicator {}; using {}, ignoring {}",
                        slot + 1,
                        names[slot].map_or("<none>", |n| atoms.name(n)),
                        atoms.name(entry.name),
                    ),
                );
                continue;
            }

            infos[slot] = entry.info;
        }
    }
}
