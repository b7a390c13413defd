//! Compatibility-map compiler for an XKB-style keymap compiler.
//!
//! Consumes a parsed `compat` section (§1) and produces, on a [`Keymap`]
//! under construction: an ordered table of symbol interpretations, indicator
//! (LED) maps bound to numbered slots, group-compatibility modifier masks,
//! and — via the whole-keymap virtual-modifier fixup — real modifier masks
//! resolved onto every key's actions, key types, group masks, and indicator
//! maps.
//!
//! The entry point is [`compile_compat`]. Everything upstream of it (the AST
//! parser, the include-file locator, keysym name resolution, the
//! action-definition grammar, atom interning proper) is an external
//! collaborator per §6; this crate defines minimal stand-ins for those seams
//! (see [`ast`] and [`registry`]) so it can be exercised standalone.

pub mod action;
pub mod ast;
pub mod atom;
pub mod compat_info;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fixup;
pub mod group;
pub mod indicator;
pub mod interp;
pub mod keymap;
pub mod mask;
pub mod merge;
pub mod predicate;
pub mod registry;

pub use action::{Action, ActionFlags, ModAction};
pub use ast::{MergeMode, XkbFile};
pub use compat_info::{CompatInfo, CompileEnv, IncludeLocator, InMemoryLocator};
pub use config::CompileOptions;
pub use error::{CompatError, Result};
pub use keymap::Keymap;

/// Compiles one parsed compat-map file onto `keymap` (`CompileCompatMap`,
/// §2's top-level flow).
///
/// Runs the statement dispatcher (§4.6) over `file`, drains the resulting
/// accumulator into `keymap`'s interpretation table, group-compat masks,
/// and indicator bindings, then runs the whole-keymap virtual-modifier
/// fixup (§4.10) so every key, type, action, group, and indicator map
/// converges on `mask = real_mods | VModsToReal(vmods)`.
///
/// On success, returns `Ok(())`. If any statement in `file` (or a file it
/// includes) failed, returns `Err(CompatError::Abandoned)` carrying the
/// final error count — per §6's exit-style contract, the caller must then
/// discard whatever this call wrote onto `keymap`, since partial writes are
/// not rolled back.
pub fn compile_compat(file: &XkbFile, keymap: &mut Keymap, merge: MergeMode, env: &mut CompileEnv, options: CompileOptions) -> Result<()> {
    let mut info = CompatInfo::new(file.file_id, options);
    info.handle_file(file, merge, env);
    let error_count = info.error_count();

    info.finish(keymap, env.atoms);
    fixup::update_modifiers_from_compat(keymap, &options)?;

    if error_count > 0 {
        return Err(CompatError::Abandoned { error_count });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::{Expr, FileId, InterpDef, Statement, VarDef};
    use crate::atom::AtomTable;
    use crate::registry::{ActionRegistry, BuiltinKeysyms, VirtualModRegistry};

    #[test]
    fn compile_compat_runs_dispatch_then_fixup() {
        let keysyms = BuiltinKeysyms::new();
        let locator = InMemoryLocator::new();
        let mut vmods = VirtualModRegistry::new();
        let mut atoms = AtomTable::new();
        let actions = ActionRegistry::new();

        let file = XkbFile {
            name: "basic".into(),
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

        let mut env = CompileEnv {
            keysyms: &keysyms,
            locator: &locator,
            vmods: &mut vmods,
            atoms: &mut atoms,
            actions: &actions,
        };

        let mut keymap = Keymap::default();
        keymap.keys.push(crate::keymap::Key {
            num_groups: 1,
            group_width: vec![1],
            modmap: 0,
            vmodmap: 0,
            explicit: crate::keymap::KeyExplicit::empty(),
            repeats: false,
            behavior: crate::keymap::KeyBehavior::Default,
            syms: vec![vec![0xff0d]],
            actions: Vec::new(),
        });

        compile_compat(&file, &mut keymap, MergeMode::Default, &mut env, CompileOptions::default()).unwrap();

        assert_eq!(keymap.sym_interpret.len(), 1);
        assert!(keymap.keys[0].repeats);
    }

    #[test]
    fn compile_compat_reports_failure_without_losing_error_count() {
        let keysyms = BuiltinKeysyms::new();
        let locator = InMemoryLocator::new();
        let mut vmods = VirtualModRegistry::new();
        let mut atoms = AtomTable::new();
        let actions = ActionRegistry::new();

        let file = XkbFile {
            name: "broken".into(),
            file_id: FileId(1),
            statements: vec![Statement::Keycode(crate::ast::KeycodeDef)],
        };

        let mut env = CompileEnv {
            keysyms: &keysyms,
            locator: &locator,
            vmods: &mut vmods,
            atoms: &mut atoms,
            actions: &actions,
        };

        let mut keymap = Keymap::default();
        let err = compile_compat(&file, &mut keymap, MergeMode::Default, &mut env, CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompatError::Abandoned { error_count: 1 }));
    }

    #[test]
    fn no_matching_interp_leaves_key_with_no_actions() {
        let keysyms = BuiltinKeysyms::new();
        let locator = InMemoryLocator::new();
        let mut vmods = VirtualModRegistry::new();
        let mut atoms = AtomTable::new();
        let actions = ActionRegistry::new();

        let file = XkbFile {
            name: "empty".into(),
            file_id: FileId(1),
            statements: vec![],
        };

        let mut env = CompileEnv {
            keysyms: &keysyms,
            locator: &locator,
            vmods: &mut vmods,
            atoms: &mut atoms,
            actions: &actions,
        };

        let mut keymap = Keymap::default();
        keymap.keys.push(crate::keymap::Key {
            num_groups: 1,
            group_width: vec![1],
            modmap: 0,
            vmodmap: 0,
            explicit: crate::keymap::KeyExplicit::empty(),
            repeats: false,
            behavior: crate::keymap::KeyBehavior::Default,
            syms: vec![vec![b'a' as u32]],
            actions: Vec::new(),
        });

        compile_compat(&file, &mut keymap, MergeMode::Default, &mut env, CompileOptions::default()).unwrap();
        assert!(keymap.keys[0].actions.is_empty());
    }
}
