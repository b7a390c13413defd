//! Mask types and the expression evaluator that resolves [`Expr`] trees
//! against them.
//!
//! The upstream compiler calls this "mask expression resolution" — turning
//! an `ExprDef` like `Shift+Control` or `~LockMods` into an integer mask
//! against one of several enumerated lookup tables (real modifiers, groups,
//! controls, state components). §4.7 calls this the "mod-mask expression
//! evaluator"; this module is the one evaluator shared by predicates, group
//! masks, and indicator fields.

use bitflags::bitflags;

use crate::ast::Expr;
use crate::error::{CompatError, Result};

bitflags! {
    /// The eight real (physical) modifier bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ModMask: u8 {
        const SHIFT   = 1 << 0;
        const LOCK    = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1    = 1 << 3;
        const MOD2    = 1 << 4;
        const MOD3    = 1 << 5;
        const MOD4    = 1 << 6;
        const MOD5    = 1 << 7;
    }
}

bitflags! {
    /// One bit per keyboard group, up to the 8 groups XKB allows.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GroupMask: u8 {
        const GROUP1 = 1 << 0;
        const GROUP2 = 1 << 1;
        const GROUP3 = 1 << 2;
        const GROUP4 = 1 << 3;
        const GROUP5 = 1 << 4;
        const GROUP6 = 1 << 5;
        const GROUP7 = 1 << 6;
        const GROUP8 = 1 << 7;
    }
}

bitflags! {
    /// Boolean controls mask, as referenced by an indicator's `controls` field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CtrlMask: u32 {
        const REPEAT_KEYS       = 1 << 0;
        const SLOW_KEYS         = 1 << 1;
        const BOUNCE_KEYS       = 1 << 2;
        const STICKY_KEYS       = 1 << 3;
        const MOUSE_KEYS        = 1 << 4;
        const MOUSE_KEYS_ACCEL  = 1 << 5;
        const ACCESS_X_KEYS     = 1 << 6;
        const ACCESS_X_TIMEOUT  = 1 << 7;
        const ACCESS_X_FEEDBACK = 1 << 8;
        const AUDIBLE_BELL      = 1 << 9;
        const OVERLAY1          = 1 << 10;
        const OVERLAY2          = 1 << 11;
        const GROUPS_WRAP       = 1 << 12;
        const INTERNAL_MODS     = 1 << 13;
        const IGNORE_GROUP_LOCK = 1 << 14;
        const PER_KEY_REPEAT    = 1 << 15;
    }
}

bitflags! {
    /// State-component mask used for both `which_mods` and `which_groups` on
    /// an indicator map. `ANY` means "AnyMods" in a `which_mods` field and
    /// "AnyGroup" in a `which_groups` field — the bit is shared, the meaning
    /// is contextual (§3, LEDInfo).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StateComponent: u8 {
        const BASE      = 1 << 0;
        const LATCHED   = 1 << 1;
        const LOCKED    = 1 << 2;
        const EFFECTIVE = 1 << 3;
        const COMPAT    = 1 << 4;
        const ANY       = 1 << 7;
    }
}

/// Looks up a single real-modifier name, case-insensitively.
pub fn mod_by_name(name: &str) -> Option<ModMask> {
    match_ci(
        name,
        &[
            ("shift", ModMask::SHIFT),
            ("lock", ModMask::LOCK),
            ("control", ModMask::CONTROL),
            ("ctrl", ModMask::CONTROL),
            ("mod1", ModMask::MOD1),
            ("mod2", ModMask::MOD2),
            ("mod3", ModMask::MOD3),
            ("mod4", ModMask::MOD4),
            ("mod5", ModMask::MOD5),
        ],
    )
}

/// Looks up a single controls name, case-insensitively.
pub fn ctrl_by_name(name: &str) -> Option<CtrlMask> {
    match_ci(
        name,
        &[
            ("repeatkeys", CtrlMask::REPEAT_KEYS),
            ("slowkeys", CtrlMask::SLOW_KEYS),
            ("bouncekeys", CtrlMask::BOUNCE_KEYS),
            ("stickykeys", CtrlMask::STICKY_KEYS),
            ("mousekeys", CtrlMask::MOUSE_KEYS),
            ("mousekeysaccel", CtrlMask::MOUSE_KEYS_ACCEL),
            ("accessxkeys", CtrlMask::ACCESS_X_KEYS),
            ("accessxtimeout", CtrlMask::ACCESS_X_TIMEOUT),
            ("accessxfeedback", CtrlMask::ACCESS_X_FEEDBACK),
            ("audiblebell", CtrlMask::AUDIBLE_BELL),
            ("overlay1", CtrlMask::OVERLAY1),
            ("overlay2", CtrlMask::OVERLAY2),
            ("groupswrap", CtrlMask::GROUPS_WRAP),
            ("internalmods", CtrlMask::INTERNAL_MODS),
            ("ignoregrouplock", CtrlMask::IGNORE_GROUP_LOCK),
            ("perkeyrepeat", CtrlMask::PER_KEY_REPEAT),
        ],
    )
}

/// Looks up a single state-component name, case-insensitively. `any`
/// resolves to [`StateComponent::ANY`]; callers decide whether that means
/// "AnyMods" or "AnyGroup".
pub fn state_component_by_name(name: &str) -> Option<StateComponent> {
    match_ci(
        name,
        &[
            ("base", StateComponent::BASE),
            ("latched", StateComponent::LATCHED),
            ("locked", StateComponent::LOCKED),
            ("effective", StateComponent::EFFECTIVE),
            ("compat", StateComponent::COMPAT),
            ("compatstate", StateComponent::COMPAT),
            ("any", StateComponent::ANY),
            ("anymods", StateComponent::ANY),
            ("anygroup", StateComponent::ANY),
        ],
    )
}

fn match_ci<T: Copy>(name: &str, table: &[(&str, T)]) -> Option<T> {
    table
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| *v)
}

/// Resolves a real-modifier mask expression: identifiers look up
/// [`mod_by_name`], `any`/`all` mean every real modifier, `none` means zero,
/// numbers are used verbatim, `+` unions, `~`/`!` complements within the
/// 8-bit mask.
pub fn resolve_mod_mask(expr: &Expr) -> Result<u8> {
    match expr {
        Expr::Ident(name) if name.eq_ignore_ascii_case("any") || name.eq_ignore_ascii_case("all") => {
            Ok(ModMask::all().bits())
        }
        Expr::Ident(name) if name.eq_ignore_ascii_case("none") => Ok(0),
        Expr::Ident(name) => mod_by_name(name)
            .map(|m| m.bits())
            .ok_or_else(|| CompatError::UnknownModifier(name.clone())),
        Expr::Number(n) => Ok(*n as u8),
        Expr::Or(a, b) => Ok(resolve_mod_mask(a)? | resolve_mod_mask(b)?),
        Expr::Not(a) => Ok(!resolve_mod_mask(a)?),
        other => Err(CompatError::UnknownModifier(format!("{other:?}"))),
    }
}

/// Resolves a controls mask expression, mirroring [`resolve_mod_mask`] but
/// against the [`CtrlMask`] table.
pub fn resolve_ctrl_mask(expr: &Expr) -> Result<u32> {
    match expr {
        Expr::Ident(name) if name.eq_ignore_ascii_case("any") || name.eq_ignore_ascii_case("all") => {
            Ok(CtrlMask::all().bits())
        }
        Expr::Ident(name) if name.eq_ignore_ascii_case("none") => Ok(0),
        Expr::Ident(name) => ctrl_by_name(name)
            .map(|m| m.bits())
            .ok_or_else(|| CompatError::UnknownModifier(name.clone())),
        Expr::Number(n) => Ok(*n as u32),
        Expr::Or(a, b) => Ok(resolve_ctrl_mask(a)? | resolve_ctrl_mask(b)?),
        Expr::Not(a) => Ok(!resolve_ctrl_mask(a)?),
        other => Err(CompatError::UnknownModifier(format!("{other:?}"))),
    }
}

/// Resolves a group mask expression (e.g. `group1+group3`) against
/// [`GroupMask`].
pub fn resolve_group_mask(expr: &Expr) -> Result<u8> {
    match expr {
        Expr::Ident(name) if name.eq_ignore_ascii_case("any") || name.eq_ignore_ascii_case("all") => {
            Ok(GroupMask::all().bits())
        }
        Expr::Ident(name) if name.eq_ignore_ascii_case("none") => Ok(0),
        Expr::Ident(name) => {
            let trimmed = name.strip_prefix("group").unwrap_or(name);
            trimmed
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=8).contains(n))
                .map(|n| 1u8 << (n - 1))
                .ok_or_else(|| CompatError::UnknownModifier(name.clone()))
        }
        Expr::Number(n) => Ok(*n as u8),
        Expr::Or(a, b) => Ok(resolve_group_mask(a)? | resolve_group_mask(b)?),
        Expr::Not(a) => Ok(!resolve_group_mask(a)?),
        other => Err(CompatError::UnknownModifier(format!("{other:?}"))),
    }
}

/// Resolves a which-mods/which-groups state-component mask expression.
pub fn resolve_state_component_mask(expr: &Expr) -> Result<StateComponent> {
    match expr {
        Expr::Ident(name) if name.eq_ignore_ascii_case("all") => Ok(StateComponent::all()),
        Expr::Ident(name) if name.eq_ignore_ascii_case("none") => Ok(StateComponent::empty()),
        Expr::Ident(name) => state_component_by_name(name)
            .ok_or_else(|| CompatError::UnknownModifier(name.clone())),
        Expr::Or(a, b) => Ok(resolve_state_component_mask(a)? | resolve_state_component_mask(b)?),
        Expr::Not(a) => Ok(StateComponent::all().difference(resolve_state_component_mask(a)?)),
        other => Err(CompatError::UnknownModifier(format!("{other:?}"))),
    }
}
