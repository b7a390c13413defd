//! Key actions bound by symbol interpretations.
//!
//! The real action-definition grammar (`HandleActionDef`/`SetActionField` in
//! §1's "out of scope" list) belongs to a parser/action-compiler pair this
//! crate doesn't implement. What this crate does own is the small set of
//! action *variants* that the virtual-modifier fixup (§4.10 step 4) knows
//! how to rewrite, because they carry a modifier mask that must be resolved
//! from virtual to real mods.

use bitflags::bitflags;

bitflags! {
    /// Flags carried by a modifier-affecting action.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ActionFlags: u8 {
        /// Use the key's own `modmap` as the action's real-modifier mask
        /// instead of the mask written in the definition (§4.10 step 4).
        const USE_MOD_MAP_MODS = 1 << 0;
        /// Clear any locked modifiers/group when this action runs (relevant
        /// to `LockMods`/`ISOLock` only; fixup-inert, carried for fidelity).
        const CLEAR_LOCKS = 1 << 1;
        /// Latch to the next key press rather than the next press+release.
        const LATCH_TO_LOCK = 1 << 2;
    }
}

/// A modifier-affecting action payload: real mods, virtual mods, and the
/// resolved `mask` the fixup pass keeps in sync with `vmods`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModAction {
    /// Real-modifier mask from the definition.
    pub real_mods: u8,
    /// Virtual-modifier mask from the definition.
    pub vmods: u16,
    /// `real_mods | VModsToReal(vmods)`, recomputed by the fixup pass.
    pub mask: u8,
    /// Behavior flags.
    pub flags: ActionFlags,
}

/// The action bound to a single (group, level) slot of a key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Action {
    /// No action bound.
    #[default]
    NoAction,
    /// Sets modifiers while the key is held.
    SetMods(ModAction),
    /// Latches modifiers for the next key press.
    LatchMods(ModAction),
    /// Locks (toggles) modifiers.
    LockMods(ModAction),
    /// ISO-level-lock style combined group/mod lock.
    IsoLock {
        /// The shared mod payload.
        mods: ModAction,
        /// Group delta/target, interpreted by the runtime.
        group: i8,
    },
    /// An action bound by name from [`crate::registry::ActionRegistry`] that
    /// this crate does not interpret further (opaque payload preserved for
    /// the runtime to dispatch).
    Named {
        /// The action's template name.
        name: String,
    },
}

impl Action {
    /// True for the four action kinds the fixup pass rewrites (§4.10 step 4).
    pub fn is_mod_action(&self) -> bool {
        matches!(
            self,
            Action::SetMods(_) | Action::LatchMods(_) | Action::LockMods(_) | Action::IsoLock { .. }
        )
    }

    /// Applies §4.10 step 4 to this action in place: if
    /// [`ActionFlags::USE_MOD_MAP_MODS`] is set, replace `real_mods` with the
    /// key's `modmap`; then recompute `mask = real_mods | VModsToReal(vmods)`.
    pub fn fixup_mods(&mut self, key_modmap: u8, vmods_to_real: impl Fn(u16) -> u8) {
        let payload = match self {
            Action::SetMods(m) | Action::LatchMods(m) | Action::LockMods(m) => Some(m),
            Action::IsoLock { mods, .. } => Some(mods),
            Action::NoAction | Action::Named { .. } => None,
        };

        if let Some(m) = payload {
            if m.flags.contains(ActionFlags::USE_MOD_MAP_MODS) {
                m.real_mods = key_modmap;
            }
            m.mask = m.real_mods | vmods_to_real(m.vmods);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixup_recomputes_mask() {
        let mut action = Action::SetMods(ModAction {
            real_mods: 0x01,
            vmods: 0b10,
            mask: 0,
            flags: ActionFlags::empty(),
        });

        action.fixup_mods(0, |vmods| if vmods & 0b10 != 0 { 0x40 } else { 0 });

        assert_eq!(
            action,
            Action::SetMods(ModAction {
                real_mods: 0x01,
                vmods: 0b10,
                mask: 0x41,
                flags: ActionFlags::empty(),
            })
        );
    }

    #[test]
    fn use_mod_map_mods_replaces_real_mods() {
        let mut action = Action::LockMods(ModAction {
            real_mods: 0xff,
            vmods: 0,
            mask: 0,
            flags: ActionFlags::USE_MOD_MAP_MODS,
        });

        action.fixup_mods(0x04, |_| 0);

        assert_eq!(
            action,
            Action::LockMods(ModAction {
                real_mods: 0x04,
                vmods: 0,
                mask: 0x04,
                flags: ActionFlags::USE_MOD_MAP_MODS,
            })
        );
    }

    #[test]
    fn non_mod_actions_are_untouched() {
        let mut action = Action::Named {
            name: "Redraw".into(),
        };
        action.fixup_mods(0xff, |_| 0xff);
        assert_eq!(action, Action::Named { name: "Redraw".into() });
    }
}
