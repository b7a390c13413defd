//! The whole-keymap virtual-modifier fixup pass (§4.10, §4.11).
//!
//! Everything in this module runs once, after every per-section accumulator
//! has already flushed into a [`Keymap`], and converges every mask the
//! compat map touches on `mask = real_mods | VModsToReal(vmods)`.

use crate::action::Action;
use crate::config::CompileOptions;
use crate::error::{CompatError, Result};
use crate::interp::{InterpFlags, SymInterp};
use crate::keymap::{Key, KeyExplicit, Keymap};
use crate::registry::NUM_VMODS;

/// Resolves a virtual-modifier mask to the real modifiers it maps to
/// (`VModsToReal`).
pub fn vmods_to_real(vmods: &[u8; NUM_VMODS], vmodmask: u16) -> u8 {
    if vmodmask == 0 {
        return 0;
    }
    let mut ret = 0u8;
    for (i, &real) in vmods.iter().enumerate() {
        if vmodmask & (1 << i) != 0 {
            ret |= real;
        }
    }
    ret
}

/// Finds the interpretation that applies to one `(group, level)` slot of a
/// key (`FindInterpForKey`, §4.11).
///
/// `interps` must already be in the §4.8 priority-flush order: the first
/// matching specific-symbol interpretation wins outright; a matching
/// wildcard (`sym == 0`) is remembered but only returned if no specific
/// match is ever found.
pub fn find_interp_for_key(interps: &[SymInterp], syms: &[u32], modmap: u8, level: u8) -> Option<&SymInterp> {
    if syms.is_empty() {
        return None;
    }

    let mut fallback = None;
    for interp in interps {
        if (syms.len() > 1 || interp.sym != syms[0]) && interp.sym != 0 {
            continue;
        }

        let mods = if level == 0 || !interp.level_one_only { modmap } else { 0 };
        let found = interp.predicate.matches(interp.mods, mods);

        if found && interp.sym != 0 {
            return Some(interp);
        } else if found && fallback.is_none() {
            fallback = Some(interp);
        }
    }

    fallback
}

/// Binds every `(group, level)` slot of one key to its interpretation's
/// action, inferring auto-repeat/locking behavior from the base level and
/// accumulating the key's `vmodmap` (`ApplyInterpsToKey`, §4.11).
pub fn apply_interps_to_key(key: &mut Key, interps: &[SymInterp], cap: usize) -> Result<()> {
    if key.explicit.contains(KeyExplicit::INTERPRET) {
        return Ok(());
    }

    let width = key.width() as usize;
    let total = key.num_groups as usize * width;
    if total > cap {
        return Err(CompatError::TooManyLevels { levels: total, cap });
    }

    let mut found: Vec<Option<SymInterp>> = vec![None; total];
    let mut num_found = 0;

    for group in 0..key.num_groups {
        let group_width = key.group_width.get(group as usize).copied().unwrap_or(0);
        for level in 0..group_width {
            let i = key.slot(group, level);
            let hit = find_interp_for_key(interps, key.syms_at(group, level), key.modmap, level);
            if let Some(interp) = hit {
                found[i] = Some(interp.clone());
                num_found += 1;
            }
        }
    }

    key.actions = if num_found > 0 { vec![Action::NoAction; total] } else { Vec::new() };

    let mut vmodmask = 0u16;
    for group in 0..key.num_groups {
        let group_width = key.group_width.get(group as usize).copied().unwrap_or(0);
        for level in 0..group_width {
            let i = key.slot(group, level);
            let interp = found[i].clone();

            if group == 0 && level == 0 {
                let auto_repeats = interp.as_ref().is_none_or(|i| i.flags.contains(InterpFlags::AUTO_REPEAT));
                if !key.explicit.contains(KeyExplicit::AUTO_REPEAT) && auto_repeats {
                    key.repeats = true;
                }
                if !key.explicit.contains(KeyExplicit::BEHAVIOR) {
                    if let Some(interp) = &interp {
                        if interp.flags.contains(InterpFlags::LOCKING_KEY) {
                            key.behavior = crate::keymap::KeyBehavior::Lock;
                        }
                    }
                }
            }

            let Some(interp) = interp else { continue };

            if (group == 0 && level == 0) || !interp.level_one_only {
                if let Some(vmod) = interp.virtual_mod {
                    vmodmask |= 1 << vmod;
                }
            }

            if !key.actions.is_empty() {
                key.actions[i] = interp.action;
            }
        }
    }

    if !key.explicit.contains(KeyExplicit::VMOD_MAP) {
        key.vmodmap = vmodmask;
    }

    Ok(())
}

/// Runs the full whole-keymap fixup (`UpdateModifiersFromCompat`, §4.10):
///
/// 1. Binds interpretations to every key, updating `vmodmap`.
/// 2. Rebuilds `keymap.vmods[]` from every key's `(vmodmap, modmap)`.
/// 3. Recomputes every key type's (and its level-map entries') `mask`.
/// 4. Recomputes every modifier-affecting action's `mask`.
/// 5. Recomputes every group's and indicator's `mask`.
pub fn update_modifiers_from_compat(keymap: &mut Keymap, options: &CompileOptions) -> Result<()> {
    for key in &mut keymap.keys {
        apply_interps_to_key(key, &keymap.sym_interpret, options.max_interps_per_key)?;
    }

    keymap.vmods = [0; NUM_VMODS];
    for key in &keymap.keys {
        if key.vmodmap == 0 {
            continue;
        }
        for i in 0..NUM_VMODS {
            if key.vmodmap & (1 << i) != 0 {
                keymap.vmods[i] |= key.modmap;
            }
        }
    }

    for ty in &mut keymap.types {
        ty.mods.mask = ty.mods.real_mods | vmods_to_real(&keymap.vmods, ty.mods.vmods);
        for entry in &mut ty.map {
            entry.mods.mask = entry.mods.real_mods | vmods_to_real(&keymap.vmods, entry.mods.vmods);
        }
    }

    for key in &mut keymap.keys {
        let modmap = key.modmap;
        for action in &mut key.actions {
            action.fixup_mods(modmap, |vmods| vmods_to_real(&keymap.vmods, vmods));
        }
    }

    for group in &mut keymap.groups {
        group.mask = group.real_mods | vmods_to_real(&keymap.vmods, group.vmods);
    }

    for led in &mut keymap.indicators {
        led.mask = led.real_mods | vmods_to_real(&keymap.vmods, led.vmods);
    }

    Ok(())
}
