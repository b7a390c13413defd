//! The compiled output shape: the slice of `struct xkb_keymap` this crate
//! populates (§3 Keymap (partial)).

use bitflags::bitflags;

use crate::action::Action;
use crate::atom::Atom;
use crate::config::NUM_INDICATORS;
use crate::group::GroupCompat;
use crate::indicator::LedInfo;
use crate::interp::SymInterp;
use crate::registry::NUM_VMODS;

bitflags! {
    /// Marks fields a key's own definition set explicitly, so the §4.10/4.11
    /// fixup passes know not to overwrite them from compat-map inference.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KeyExplicit: u8 {
        /// Don't bind symbol interpretations to this key at all.
        const INTERPRET  = 1 << 0;
        /// `key.repeats` was set explicitly; don't infer it.
        const AUTO_REPEAT = 1 << 1;
        /// `key.behavior` was set explicitly; don't infer it.
        const BEHAVIOR   = 1 << 2;
        /// `key.vmodmap` was set explicitly; don't accumulate into it.
        const VMOD_MAP   = 1 << 3;
    }
}

/// A key's inferred or explicit locking behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyBehavior {
    #[default]
    Default,
    /// This key toggles a lock (e.g. Caps Lock) when pressed.
    Lock,
}

/// A single key's compat-relevant state: its symbol table (supplied by an
/// external symbol compiler this crate doesn't implement) and the fields the
/// fixup pass reads or writes.
#[derive(Debug, Clone)]
pub struct Key {
    /// Number of keyboard groups this key defines levels for.
    pub num_groups: u8,
    /// Number of levels in each group, indexed by group.
    pub group_width: Vec<u8>,
    /// Real-modifier mask from this key's entry in the keyboard's modmap.
    pub modmap: u8,
    /// Virtual-modifier mask accumulated from bound interpretations (or set
    /// explicitly, per [`KeyExplicit::VMOD_MAP`]).
    pub vmodmap: u16,
    /// Which fields were set explicitly by this key's own definition.
    pub explicit: KeyExplicit,
    /// Whether this key auto-repeats.
    pub repeats: bool,
    /// This key's locking behavior.
    pub behavior: KeyBehavior,
    /// Keysyms bound to this key, flattened `group * width + level`. An
    /// empty slot is `XKB_KEY_NoSymbol`.
    pub syms: Vec<Vec<u32>>,
    /// Actions bound to this key, same flattened indexing as `syms`. Starts
    /// empty; populated (or left empty) by [`crate::fixup::apply_interps_to_key`].
    pub actions: Vec<Action>,
}

impl Key {
    /// Returns the maximum level width across this key's groups — the
    /// stride used to flatten `(group, level)` into `syms`/`actions`.
    pub fn width(&self) -> u8 {
        self.group_width.iter().copied().max().unwrap_or(0)
    }

    /// Flattened slot index for `(group, level)`.
    pub fn slot(&self, group: u8, level: u8) -> usize {
        (group as usize) * (self.width() as usize) + (level as usize)
    }

    /// The keysyms bound at `(group, level)`, or an empty slice if out of
    /// range or unbound.
    pub fn syms_at(&self, group: u8, level: u8) -> &[u32] {
        self.syms.get(self.slot(group, level)).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A real/virtual modifier pair, as resolved by the fixup pass
/// (`mask = real_mods | VModsToReal(vmods)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModsRecord {
    pub mask: u8,
    pub real_mods: u8,
    pub vmods: u16,
}

/// One entry of a key type's level-to-modifier-combination map, fixed up in
/// lockstep with [`crate::keymap::Keymap`]'s `vmods` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyTypeMapEntry {
    pub mods: ModsRecord,
    pub level: u8,
}

/// A key type, carrying only the fields the fixup pass touches.
#[derive(Debug, Clone, Default)]
pub struct KeyType {
    pub mods: ModsRecord,
    pub map: Vec<KeyTypeMapEntry>,
}

/// The compat-relevant slice of a compiled keymap: everything this crate's
/// pipeline produces or mutates.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    /// Ordered symbol-interpretation table (§4.8 flush order).
    pub sym_interpret: Vec<SymInterp>,
    /// Indicator names by numbered slot (§4.9).
    pub indicator_names: [Option<Atom>; NUM_INDICATORS],
    /// Indicator bindings by numbered slot (§4.9).
    pub indicators: [LedInfo; NUM_INDICATORS],
    /// Group-compatibility modifier masks, one per keyboard group (§4.4).
    pub groups: Vec<GroupCompat>,
    /// Virtual-to-real modifier mapping, rebuilt by the fixup pass (§4.10
    /// step 2).
    pub vmods: [u8; NUM_VMODS],
    /// Key types referenced by keys, fixed up in place (§4.10 step 3).
    pub types: Vec<KeyType>,
    /// The compat section's name, if the source gave it one.
    pub compat_section_name: Option<String>,
    /// Every key in the keymap.
    pub keys: Vec<Key>,
}

impl Keymap {
    /// Looks up a real-modifier mask for a virtual-modifier mask
    /// (`VModsToReal`, §4.10).
    pub fn vmods_to_real(&self, vmodmask: u16) -> u8 {
        crate::fixup::vmods_to_real(&self.vmods, vmodmask)
    }
}
