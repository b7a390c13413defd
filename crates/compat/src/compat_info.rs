//! The statement dispatcher and include-file resolver (§4.5, §4.6).
//!
//! [`CompatInfo`] is the root accumulator for one compat-map compile: it
//! owns one of each section accumulator (`interps`, `groups`, `indicators`)
//! plus the running `error_count` the abort policy checks. The registries
//! and collaborators every statement handler needs (keysyms, virtual
//! modifiers, atoms, the include locator) live in [`CompileEnv`], borrowed
//! for the duration of one `handle_file` call — mirroring how the upstream
//! compiler threads a single `xkb_context` through every handler via
//! `info->keymap->ctx`.

use crate::action::{Action, ActionFlags, ModAction};
use crate::ast::{Expr, FileId, IncludeItem, MergeMode, Statement, VarDef, XkbFile};
use crate::atom::AtomTable;
use crate::config::CompileOptions;
use crate::diagnostics;
use crate::error::{CompatError, Result};
use crate::group::GroupCompatAccumulator;
use crate::indicator::{IndicatorAccumulator, LedEntry};
use crate::interp::{InterpAccumulator, InterpEntry};
use crate::mask::{resolve_ctrl_mask, resolve_group_mask, resolve_mod_mask, resolve_state_component_mask};
use crate::predicate::parse_predicate;
use crate::registry::{ActionRegistry, KeysymRegistry, VirtualModRegistry};

/// Resolves an `include "foo(bar)+baz"` item to its parsed file.
///
/// This is the seam the specification calls out as an external
/// collaborator (§6): a real deployment backs this with its own search-path
/// and file-cache logic.
pub trait IncludeLocator {
    /// Resolves one chain item, or fails with a human-readable reason that
    /// becomes [`CompatError::IncludeFailed`]'s `reason`.
    fn resolve(&self, item: &IncludeItem) -> std::result::Result<XkbFile, String>;
}

/// An in-memory [`IncludeLocator`] keyed by file name, sufficient for tests
/// and for embedders that pre-load their own include set.
#[derive(Debug, Default)]
pub struct InMemoryLocator {
    files: std::collections::HashMap<String, XkbFile>,
}

impl InMemoryLocator {
    /// Creates an empty locator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `file` under `name`, available to later `include` statements.
    pub fn insert(&mut self, name: impl Into<String>, file: XkbFile) {
        self.files.insert(name.into(), file);
    }
}

impl IncludeLocator for InMemoryLocator {
    fn resolve(&self, item: &IncludeItem) -> std::result::Result<XkbFile, String> {
        self.files
            .get(&item.file_name)
            .cloned()
            .ok_or_else(|| format!("no such compat map file \"{}\"", item.file_name))
    }
}

/// The shared collaborators every statement handler needs, borrowed once
/// per `handle_file` call instead of duplicated per nested include.
pub struct CompileEnv<'a> {
    pub keysyms: &'a dyn KeysymRegistry,
    pub locator: &'a dyn IncludeLocator,
    pub vmods: &'a mut VirtualModRegistry,
    pub atoms: &'a mut AtomTable,
    pub actions: &'a ActionRegistry,
}

/// Resolves a real/virtual modifier mask expression, splitting real-modifier
/// names from virtual-modifier names already known to `vmods`
/// (`ExprResolveVModMask`).
fn resolve_vmod_mask(expr: &Expr, vmods: &VirtualModRegistry) -> Result<(u8, u16)> {
    match expr {
        Expr::Or(a, b) => {
            let (ra, va) = resolve_vmod_mask(a, vmods)?;
            let (rb, vb) = resolve_vmod_mask(b, vmods)?;
            Ok((ra | rb, va | vb))
        }
        Expr::Ident(name) if name.eq_ignore_ascii_case("none") => Ok((0, 0)),
        Expr::Ident(name) if name.eq_ignore_ascii_case("any") || name.eq_ignore_ascii_case("all") => Ok((0xff, 0)),
        Expr::Ident(name) => {
            if let Some(index) = vmods.index_of(name) {
                Ok((0, 1u16 << index))
            } else {
                resolve_mod_mask(expr).map(|m| (m, 0))
            }
        }
        other => resolve_mod_mask(other).map(|m| (m, 0)),
    }
}

/// Resolves a single virtual-modifier name to its registry index
/// (`ResolveVirtualModifier`).
fn resolve_single_vmod(expr: &Expr, vmods: &mut VirtualModRegistry) -> Result<u8> {
    match expr {
        Expr::Ident(name) => vmods.intern(name).ok_or_else(|| CompatError::UnknownModifier(name.clone())),
        other => Err(CompatError::UnknownModifier(format!("{other:?}"))),
    }
}

fn resolve_bool(expr: &Expr) -> Result<bool> {
    match expr {
        Expr::Boolean(b) => Ok(*b),
        Expr::Number(n) => Ok(*n != 0),
        Expr::Ident(name) if name.eq_ignore_ascii_case("true") || name.eq_ignore_ascii_case("yes") => Ok(true),
        Expr::Ident(name) if name.eq_ignore_ascii_case("false") || name.eq_ignore_ascii_case("no") => Ok(false),
        other => Err(CompatError::WrongFieldType {
            field: format!("{other:?}"),
            context: "boolean",
        }),
    }
}

fn resolve_action(expr: &Expr, registry: &ActionRegistry) -> Result<Action> {
    match expr {
        Expr::Action { name, args } => {
            let mut mods = ModAction::default();
            let mut group = 0i8;
            for (key, value) in args {
                match key.to_ascii_lowercase().as_str() {
                    "modifiers" | "mods" => mods.real_mods = resolve_mod_mask(value)?,
                    "usemodmapmods" => {
                        if resolve_bool(value)? {
                            mods.flags |= ActionFlags::USE_MOD_MAP_MODS;
                        }
                    }
                    "clearlocks" => {
                        if resolve_bool(value)? {
                            mods.flags |= ActionFlags::CLEAR_LOCKS;
                        }
                    }
                    "latchtolock" => {
                        if resolve_bool(value)? {
                            mods.flags |= ActionFlags::LATCH_TO_LOCK;
                        }
                    }
                    "group" => {
                        if let Expr::Number(n) = value {
                            group = *n as i8;
                        }
                    }
                    _ => {}
                }
            }

            match name.to_ascii_lowercase().as_str() {
                "setmods" => Ok(Action::SetMods(mods)),
                "latchmods" => Ok(Action::LatchMods(mods)),
                "lockmods" => Ok(Action::LockMods(mods)),
                "isolock" => Ok(Action::IsoLock { mods, group }),
                _ => {
                    if let Some(template) = registry.get(name) {
                        Ok(template.clone())
                    } else {
                        Ok(Action::Named { name: name.clone() })
                    }
                }
            }
        }
        Expr::Ident(name) => Ok(Action::Named { name: name.clone() }),
        other => Err(CompatError::WrongFieldType {
            field: format!("{other:?}"),
            context: "action",
        }),
    }
}

/// Sets one field of the symbol-interpretation body currently being built
/// (`SetInterpField`).
fn set_interp_field(field: &str, value: &Expr, entry: &mut InterpEntry, env: &mut CompileEnv) -> Result<()> {
    match field.to_ascii_lowercase().as_str() {
        "action" => entry.set_action(resolve_action(value, env.actions)?),
        "virtualmodifier" | "virtualmod" => entry.set_virtual_mod(resolve_single_vmod(value, env.vmods)?),
        "repeat" => entry.set_auto_repeat(resolve_bool(value)?),
        "locking" => entry.set_locking_key(resolve_bool(value)?),
        "usemodmap" | "usemodmapmods" => entry.set_level_one_only(resolve_bool(value)?),
        other => {
            return Err(CompatError::UnknownField {
                field: other.to_string(),
                context: "interpret",
            })
        }
    }
    Ok(())
}

/// Sets one field of the indicator-map body currently being built
/// (`SetIndicatorMapField`).
fn set_indicator_field(field: &str, value: &Expr, entry: &mut LedEntry, vmods: &VirtualModRegistry) -> Result<()> {
    match field.to_ascii_lowercase().as_str() {
        "modifiers" | "mods" => {
            let (real, virt) = resolve_vmod_mask(value, vmods)?;
            entry.set_mods(real, virt);
        }
        "groups" => entry.set_groups(resolve_group_mask(value)? as u32),
        "controls" | "ctrls" => entry.set_ctrls(resolve_ctrl_mask(value)?),
        "allowexplicit" => entry.set_explicit(resolve_bool(value)?),
        "whichmodstate" | "whichmodifierstate" => entry.set_which_mods(resolve_state_component_mask(value)?),
        "whichgroupstate" => entry.set_which_groups(resolve_state_component_mask(value)?),
        "driveskbd" | "driveskeyboard" | "leddriveskbd" | "leddriveskeyboard" | "indicatordriveskbd" | "indicatordriveskeyboard" => {
            entry.set_drives_kbd(resolve_bool(value)?)
        }
        "index" => {
            let Expr::Number(n) = value else {
                return Err(CompatError::WrongFieldType {
                    field: field.to_string(),
                    context: "indicator",
                });
            };
            if *n < 1 || *n > 32 {
                return Err(CompatError::IndicatorIndexOutOfRange { index: *n });
            }
            entry.set_index((*n - 1) as u8);
        }
        other => {
            return Err(CompatError::UnknownField {
                field: other.to_string(),
                context: "indicator",
            })
        }
    }
    Ok(())
}

/// The root accumulator for one compat-map compile: one interpretation
/// table, one group-compat table, and one indicator table, plus the
/// bookkeeping the dispatcher and include resolver need.
pub struct CompatInfo {
    file_id: FileId,
    name: Option<String>,
    error_count: u32,
    interps: InterpAccumulator,
    groups: GroupCompatAccumulator,
    indicators: IndicatorAccumulator,
    led_default: LedEntry,
    options: CompileOptions,
}

impl CompatInfo {
    /// Creates a fresh accumulator for `file_id` (`InitCompatInfo`).
    pub fn new(file_id: FileId, options: CompileOptions) -> Self {
        Self {
            file_id,
            name: None,
            error_count: 0,
            interps: InterpAccumulator::new(file_id),
            groups: GroupCompatAccumulator::new(options.num_groups),
            indicators: IndicatorAccumulator::new(),
            led_default: LedEntry::new(crate::atom::Atom::default(), file_id, MergeMode::Override),
            options,
        }
    }

    /// Running count of recoverable errors accumulated so far.
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    fn bump_error(&mut self) {
        self.error_count += 1;
    }

    /// Processes every statement of `file` (`HandleCompatMapFile`). `merge`
    /// is the file-level default, folded into `MergeMode::Default`
    /// statements; a nested include dispatches its resolved file with
    /// `merge = MergeMode::Override` forced, per §4.5.
    pub fn handle_file(&mut self, file: &XkbFile, merge: MergeMode, env: &mut CompileEnv) {
        let merge = if merge == MergeMode::Default { MergeMode::Augment } else { merge };
        self.name = Some(file.name.clone());

        for statement in &file.statements {
            let ok = self.handle_statement(statement, merge, env);
            if !ok {
                self.bump_error();
            }
            if self.error_count > self.options.abandon_after {
                diagnostics::err(self.file_id, format!("abandoning compatibility map \"{}\"", file.name));
                break;
            }
        }
    }

    fn handle_statement(&mut self, statement: &Statement, merge: MergeMode, env: &mut CompileEnv) -> bool {
        match statement {
            Statement::Include(stmt) => self.handle_include(stmt, env),
            Statement::Interp(def) => self.handle_interp_def(def, merge, env),
            Statement::GroupCompat(def) => self.handle_group_compat_def(def, merge, env),
            Statement::IndicatorMap(def) => self.handle_indicator_map_def(def, merge, env),
            Statement::Var(def) => self.handle_var(def, env),
            Statement::VMod(def) => {
                env.vmods.intern(&def.name);
                true
            }
            Statement::Keycode(_) => {
                diagnostics::err(self.file_id, "interpretation files may not include other types; ignoring definition of key name");
                false
            }
        }
    }

    fn handle_var(&mut self, def: &VarDef, env: &mut CompileEnv) -> bool {
        match def.elem.as_deref() {
            Some(elem) if elem.eq_ignore_ascii_case("interpret") => {
                let result = set_interp_field(&def.field, &def.value, self.interps.default_entry_mut(), env);
                self.report(result)
            }
            Some(elem) if elem.eq_ignore_ascii_case("indicator") => {
                let result = set_indicator_field(&def.field, &def.value, &mut self.led_default, env.vmods);
                self.report(result)
            }
            Some(elem) => {
                diagnostics::err(self.file_id, CompatError::ElementDefault(elem.to_string()));
                false
            }
            None => {
                diagnostics::err(
                    self.file_id,
                    format!("cannot set {} without an element reference; ignored", def.field),
                );
                false
            }
        }
    }

    fn handle_interp_def(&mut self, def: &crate::ast::InterpDef, outer_merge: MergeMode, env: &mut CompileEnv) -> bool {
        let (predicate, mods) = match parse_predicate(def.predicate.as_ref()) {
            Ok(v) => v,
            Err(e) => {
                diagnostics::err(self.file_id, format!("couldn't determine matching modifiers: {e}; symbol interpretation ignored"));
                return false;
            }
        };

        let merge = if def.merge != MergeMode::Default { def.merge } else { outer_merge };

        let sym = match &def.sym {
            None => 0,
            Some(name) => match env.keysyms.resolve(name) {
                Some(code) => code,
                None => {
                    diagnostics::err(self.file_id, format!("could not resolve keysym {name}; symbol interpretation ignored"));
                    return false;
                }
            },
        };

        let mut entry = self.interps.seed_from_default(sym, mods, predicate, false, self.file_id, merge);

        for var in &def.body {
            let result = if let Some(elem) = &var.elem {
                if elem.eq_ignore_ascii_case("interpret") {
                    set_interp_field(&var.field, &var.value, self.interps.default_entry_mut(), env)
                } else {
                    Err(CompatError::ElementDefault(elem.clone()))
                }
            } else {
                set_interp_field(&var.field, &var.value, &mut entry, env)
            };

            if !self.report(result) {
                return false;
            }
        }

        self.interps.add(entry, self.options.verbosity);
        true
    }

    fn handle_group_compat_def(&mut self, def: &crate::ast::GroupCompatDef, outer_merge: MergeMode, env: &mut CompileEnv) -> bool {
        let merge = if def.merge != MergeMode::Default { def.merge } else { outer_merge };

        if def.group < 1 || def.group > self.options.num_groups as i64 {
            diagnostics::err(
                self.file_id,
                CompatError::GroupOutOfRange {
                    group: def.group,
                    max: self.options.num_groups,
                },
            );
            return false;
        }

        let (real_mods, vmods) = match resolve_vmod_mask(&def.expr, env.vmods) {
            Ok(v) => v,
            Err(e) => {
                diagnostics::err(self.file_id, format!("expected a modifier mask in group compatibility definition: {e}"));
                return false;
            }
        };

        self.groups.add((def.group - 1) as usize, real_mods, vmods, self.file_id, merge, self.options.verbosity);
        true
    }

    fn handle_indicator_map_def(&mut self, def: &crate::ast::IndicatorMapDef, outer_merge: MergeMode, env: &mut CompileEnv) -> bool {
        let merge = if def.merge != MergeMode::Default { def.merge } else { outer_merge };
        let name = env.atoms.intern(&def.name);

        let mut entry = self.led_default.seed(name, self.file_id, merge);

        for var in &def.body {
            if let Some(elem) = &var.elem {
                diagnostics::err(self.file_id, CompatError::ElementDefault(elem.clone()));
                return false;
            }
            if !self.report(set_indicator_field(&var.field, &var.value, &mut entry, env.vmods)) {
                return false;
            }
        }

        self.indicators.add(entry, self.options.verbosity);
        true
    }

    fn handle_include(&mut self, stmt: &crate::ast::IncludeStmt, env: &mut CompileEnv) -> bool {
        let mut included = CompatInfo::new(self.file_id, self.options);
        let mut last_merge = MergeMode::Default;

        for item in &stmt.items {
            last_merge = item.merge;
            let file = match env.locator.resolve(item) {
                Ok(file) => file,
                Err(reason) => {
                    diagnostics::err(
                        self.file_id,
                        CompatError::IncludeFailed {
                            name: item.file_name.clone(),
                            reason,
                        },
                    );
                    self.error_count += 10;
                    return false;
                }
            };

            let mut next = CompatInfo::new(file.file_id, self.options);
            next.interps = self.interps.child(file.file_id, item.merge);
            next.led_default = self.led_default.seed_for_child(file.file_id, item.merge);

            next.handle_file(&file, MergeMode::Override, env);

            if next.error_count > 0 {
                included.error_count += next.error_count;
            } else {
                included.merge_from(next, item.merge, self.options.verbosity);
            }
        }

        let had_errors = included.error_count > 0;
        self.merge_from(included, last_merge, self.options.verbosity);
        !had_errors && self.error_count == 0
    }

    /// Folds another (already-compiled) accumulator's records into this one,
    /// optionally forcing every record's merge mode first
    /// (`MergeIncludedCompatMaps`).
    fn merge_from(&mut self, from: CompatInfo, merge: MergeMode, verbosity: u8) {
        if self.name.is_none() {
            self.name = from.name;
        }
        self.error_count += from.error_count;
        let merge_override = (merge != MergeMode::Default).then_some(merge);
        from.interps.fold_into(&mut self.interps, merge_override, verbosity);
        from.groups.fold_into(&mut self.groups, merge_override, verbosity);
        from.indicators.fold_into(&mut self.indicators, merge_override, verbosity);
    }

    /// Drains this accumulator into a [`crate::keymap::Keymap`] under
    /// construction (§4.8, §4.4, §4.9). Indicator binding writes through
    /// `keymap.indicator_names`/`keymap.indicators` in place so that a
    /// binding already present on `keymap` (from an earlier compat section)
    /// is visible to phase A of `BindIndicators`.
    pub fn finish(self, keymap: &mut crate::keymap::Keymap, atoms: &AtomTable) {
        keymap.sym_interpret = self.interps.flush();
        keymap.groups = self.groups.flush();
        self.indicators.bind(&mut keymap.indicator_names, &mut keymap.indicators, atoms);
        if keymap.compat_section_name.is_none() {
            keymap.compat_section_name = self.name;
        }
    }

    fn report(&mut self, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                diagnostics::err(self.file_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::{GroupCompatDef, IndicatorMapDef, InterpDef};
    use crate::registry::BuiltinKeysyms;

    fn env<'a>(keysyms: &'a BuiltinKeysyms, locator: &'a InMemoryLocator, vmods: &'a mut VirtualModRegistry, atoms: &'a mut AtomTable, actions: &'a ActionRegistry) -> CompileEnv<'a> {
        CompileEnv { keysyms, locator, vmods, atoms, actions }
    }

    #[test]
    fn simple_interp_def_flows_through_to_flush() {
        let keysyms = BuiltinKeysyms::new();
        let locator = InMemoryLocator::new();
        let mut vmods = VirtualModRegistry::new();
        let mut atoms = AtomTable::new();
        let actions = ActionRegistry::new();

        let mut info = CompatInfo::new(FileId(1), CompileOptions::default());
        let file = XkbFile {
            name: "test".into(),
            file_id: FileId(1),
            statements: vec![Statement::Interp(InterpDef {
                merge: MergeMode::Default,
                predicate: None,
                sym: Some("Return".into()),
                body: vec![VarDef {
                    merge: MergeMode::Default,
                    elem: None,
                    field: "repeat".into(),
                    value: Expr::Boolean(true),
                }],
            })],
        };

        let mut e = env(&keysyms, &locator, &mut vmods, &mut atoms, &actions);
        info.handle_file(&file, MergeMode::Default, &mut e);
        assert_eq!(info.error_count(), 0);

        let mut keymap = crate::keymap::Keymap::default();
        info.finish(&mut keymap, &atoms);
        assert_eq!(keymap.sym_interpret.len(), 1);
        assert_eq!(keymap.sym_interpret[0].sym, 0xff0d);
    }

    #[test]
    fn group_out_of_range_is_reported_and_counted() {
        let keysyms = BuiltinKeysyms::new();
        let locator = InMemoryLocator::new();
        let mut vmods = VirtualModRegistry::new();
        let mut atoms = AtomTable::new();
        let actions = ActionRegistry::new();

        let mut info = CompatInfo::new(FileId(1), CompileOptions::default());
        let file = XkbFile {
            name: "test".into(),
            file_id: FileId(1),
            statements: vec![Statement::GroupCompat(GroupCompatDef {
                merge: MergeMode::Default,
                group: 99,
                expr: Expr::Ident("Shift".into()),
            })],
        };

        let mut e = env(&keysyms, &locator, &mut vmods, &mut atoms, &actions);
        info.handle_file(&file, MergeMode::Default, &mut e);
        assert_eq!(info.error_count(), 1);
    }

    #[test]
    fn keycode_statement_is_rejected() {
        let keysyms = BuiltinKeysyms::new();
        let locator = InMemoryLocator::new();
        let mut vmods = VirtualModRegistry::new();
        let mut atoms = AtomTable::new();
        let actions = ActionRegistry::new();

        let mut info = CompatInfo::new(FileId(1), CompileOptions::default());
        let file = XkbFile {
            name: "test".into(),
            file_id: FileId(1),
            statements: vec![Statement::Keycode(crate::ast::KeycodeDef)],
        };

        let mut e = env(&keysyms, &locator, &mut vmods, &mut atoms, &actions);
        info.handle_file(&file, MergeMode::Default, &mut e);
        assert_eq!(info.error_count(), 1);
    }

    #[test]
    fn indicator_map_def_binds_through_finish() {
        let keysyms = BuiltinKeysyms::new();
        let locator = InMemoryLocator::new();
        let mut vmods = VirtualModRegistry::new();
        let mut atoms = AtomTable::new();
        let actions = ActionRegistry::new();

        let mut info = CompatInfo::new(FileId(1), CompileOptions::default());
        let file = XkbFile {
            name: "test".into(),
            file_id: FileId(1),
            statements: vec![Statement::IndicatorMap(IndicatorMapDef {
                merge: MergeMode::Default,
                name: "Caps Lock".into(),
                body: vec![VarDef {
                    merge: MergeMode::Default,
                    elem: None,
                    field: "index".into(),
                    value: Expr::Number(1),
                }],
            })],
        };

        let mut e = env(&keysyms, &locator, &mut vmods, &mut atoms, &actions);
        info.handle_file(&file, MergeMode::Default, &mut e);
        assert_eq!(info.error_count(), 0);

        let mut keymap = crate::keymap::Keymap::default();
        info.finish(&mut keymap, &atoms);
        assert!(keymap.indicator_names[0].is_some());
    }

    #[test]
    fn include_failure_adds_ten_to_error_count() {
        let keysyms = BuiltinKeysyms::new();
        let locator = InMemoryLocator::new();
        let mut vmods = VirtualModRegistry::new();
        let mut atoms = AtomTable::new();
        let actions = ActionRegistry::new();

        let mut info = CompatInfo::new(FileId(1), CompileOptions::default());
        let file = XkbFile {
            name: "test".into(),
            file_id: FileId(1),
            statements: vec![Statement::Include(crate::ast::IncludeStmt {
                items: vec![IncludeItem {
                    file_name: "missing".into(),
                    map: None,
                    merge: MergeMode::Augment,
                }],
            })],
        };

        let mut e = env(&keysyms, &locator, &mut vmods, &mut atoms, &actions);
        info.handle_file(&file, MergeMode::Default, &mut e);
        assert_eq!(info.error_count(), 10);
    }
}
