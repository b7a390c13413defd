//! End-to-end scenarios (spec §8 "End-to-end scenarios", S1-S6).
//!
//! Each test drives the pieces the unit tests already exercise in
//! isolation (the accumulators, the priority flush, the binder, the
//! fixup pass) together, the way a single `compile_compat` call would.

use pretty_assertions::assert_eq;
use xeno_xkbcomp_compat::action::{Action, ActionFlags, ModAction};
use xeno_xkbcomp_compat::atom::AtomTable;
use xeno_xkbcomp_compat::config::NUM_INDICATORS;
use xeno_xkbcomp_compat::fixup::{apply_interps_to_key, find_interp_for_key, update_modifiers_from_compat};
use xeno_xkbcomp_compat::indicator::{IndicatorAccumulator, LedEntry, LedInfo};
use xeno_xkbcomp_compat::interp::{InterpAccumulator, InterpEntry, InterpFlags};
use xeno_xkbcomp_compat::keymap::{Key, KeyBehavior, KeyExplicit, Keymap};
use xeno_xkbcomp_compat::predicate::Predicate;
use xeno_xkbcomp_compat::{ast::FileId, ast::MergeMode, config::CompileOptions};

const F1: FileId = FileId(1);

/// Installs a `tracing` subscriber so `err`/`warn`/`wsgo` diagnostics emitted
/// during these scenarios are visible under `--nocapture`; safe to call from
/// every test since only the first call wins.
fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

fn blank_key(num_groups: u8, group_width: Vec<u8>, syms: Vec<Vec<u32>>) -> Key {
    Key {
        num_groups,
        group_width,
        modmap: 0,
        vmodmap: 0,
        explicit: KeyExplicit::empty(),
        repeats: false,
        behavior: KeyBehavior::Default,
        syms,
        actions: Vec::new(),
    }
}

/// S1 - Exact predicate, symbol match. Base-level inference only ever
/// *forces* `repeats` to true (when nothing matched, or the winning
/// interpretation has `AutoRepeat`) - it never forces it false. So a key that
/// already repeats by default keeps repeating even though the winning
/// interpretation here doesn't carry `AutoRepeat` itself.
#[test]
fn s1_exact_predicate_symbol_match() {
    init_tracing();
    let mut acc = InterpAccumulator::new(F1);
    let mut entry = InterpEntry::new(0xff0d, 0x01, Predicate::Exactly, false, F1, MergeMode::Override);
    entry.set_action(Action::NoAction);
    acc.add(entry, 0);
    let interps = acc.flush();

    let mut key = blank_key(1, vec![1], vec![vec![0xff0d]]);
    key.modmap = 0x01;
    key.repeats = true;

    apply_interps_to_key(&mut key, &interps, 32).unwrap();

    assert_eq!(key.actions[0], Action::NoAction);
    assert!(key.repeats);
}

/// S2 - AnyOfOrNone fallback: a key whose keysym doesn't match the specific
/// interpretation falls back to the wildcard `AnyOfOrNone` record.
#[test]
fn s2_any_of_or_none_fallback() {
    init_tracing();
    let mut acc = InterpAccumulator::new(F1);
    acc.add(InterpEntry::new(b'a' as u32, 0x02, Predicate::Exactly, false, F1, MergeMode::Override), 0);
    acc.add(InterpEntry::new(0, 0, Predicate::AnyOfOrNone, false, F1, MergeMode::Override), 0);
    let interps = acc.flush();

    let key = blank_key(1, vec![1], vec![vec![b'b' as u32]]);
    let found = find_interp_for_key(&interps, key.syms_at(0, 0), key.modmap, 0).unwrap();

    assert_eq!(found.sym, 0);
    assert_eq!(found.predicate, Predicate::AnyOfOrNone);
}

/// S3 - LevelOneOnly gating: the interpretation matches at both levels, but
/// only contributes to `vmodmap` at the base level.
#[test]
fn s3_level_one_only_gating() {
    init_tracing();
    let mut acc = InterpAccumulator::new(F1);
    let mut entry = InterpEntry::new(0, 0, Predicate::AnyOfOrNone, false, F1, MergeMode::Override);
    entry.set_level_one_only(true);
    entry.set_virtual_mod(2);
    acc.add(entry, 0);
    let interps = acc.flush();

    let mut key = blank_key(1, vec![2], vec![vec![0x58], vec![0x59]]);

    apply_interps_to_key(&mut key, &interps, 32).unwrap();

    assert!(!key.actions.is_empty(), "both levels should still match the wildcard");
    assert_eq!(key.vmodmap, 1 << 2, "level 1's match must not contribute, since LevelOneOnly excludes it");
}

/// S4 - Merge-Override collision: a same-file-id Override redefinition wins
/// field by field, leaving the other fields from the first definition intact.
#[test]
fn s4_merge_override_collision() {
    init_tracing();
    let mut acc = InterpAccumulator::new(F1);

    let mut first = InterpEntry::new(0xff0d, 0x01, Predicate::Exactly, false, F1, MergeMode::Override);
    first.set_action(Action::NoAction);
    first.set_auto_repeat(true);
    acc.add(first, 0);

    let mut second = InterpEntry::new(0xff0d, 0x01, Predicate::Exactly, false, F1, MergeMode::Override);
    second.set_auto_repeat(false);
    acc.add(second, 0);

    let flushed = acc.flush();
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].action, Action::NoAction);
    assert!(!flushed[0].flags.contains(InterpFlags::AUTO_REPEAT));
}

/// S5 - Indicator binding against a pre-existing slot name.
///
/// The spec's own narrative for this scenario has the *second*, explicit-index
/// LED produce a "multiple names bound" diagnostic against an empty slot.
/// That can't happen under either this crate's algorithm or the upstream
/// `CopyIndicatorMapDefs`/`BindIndicators` split it's grounded on: an
/// explicit index unconditionally claims (and renames) its slot before
/// `BindIndicators` ever runs, so it can never be rejected by the
/// name-mismatch check (see `DESIGN.md`, indicator-binding open question).
/// What the spec's prose and the upstream source agree on is the part this
/// test actually exercises: an *unbound* LED reuses a slot already named
/// after it.
#[test]
fn s5_unbound_led_reuses_a_preexisting_slot_name() {
    init_tracing();
    let mut atoms = AtomTable::new();
    let caps_lock = atoms.intern("Caps Lock");

    let mut names = [None; NUM_INDICATORS];
    let mut infos = [LedInfo::default(); NUM_INDICATORS];
    names[2] = Some(caps_lock);

    let mut acc = IndicatorAccumulator::new();
    acc.add(LedEntry::new(caps_lock, F1, MergeMode::Override), 0);
    acc.bind(&mut names, &mut infos, &atoms);

    assert_eq!(names[2], Some(caps_lock));
    assert!((0..NUM_INDICATORS).filter(|&i| i != 2).all(|i| names[i].is_none()));
}

/// An explicit index unconditionally claims its slot, the other half of the
/// behavior S5 is describing (see the doc comment above).
#[test]
fn explicit_index_overwrites_regardless_of_existing_name() {
    init_tracing();
    let mut atoms = AtomTable::new();
    let scroll_lock = atoms.intern("Scroll Lock");
    let other = atoms.intern("Something Else");

    let mut names = [None; NUM_INDICATORS];
    let mut infos = [LedInfo::default(); NUM_INDICATORS];
    names[4] = Some(other);

    let mut acc = IndicatorAccumulator::new();
    let mut entry = LedEntry::new(scroll_lock, F1, MergeMode::Override);
    entry.set_index(4);
    acc.add(entry, 0);
    acc.bind(&mut names, &mut infos, &atoms);

    assert_eq!(names[4], Some(scroll_lock));
}

/// S6 - Virtual-mod propagation through the whole fixup pass.
#[test]
fn s6_virtual_mod_propagation() {
    init_tracing();
    let mut keymap = Keymap::default();

    let interp = xeno_xkbcomp_compat::interp::SymInterp {
        sym: 0xffeb, // Super_L
        mods: 0xff,
        predicate: Predicate::AnyOfOrNone,
        level_one_only: false,
        flags: Default::default(),
        virtual_mod: Some(3), // Meta
        action: Action::SetMods(ModAction {
            real_mods: 0,
            vmods: 1 << 3,
            mask: 0,
            flags: ActionFlags::empty(),
        }),
    };
    keymap.sym_interpret = vec![interp];

    let mut key = blank_key(1, vec![1], vec![vec![0xffeb]]);
    key.modmap = 0x40;
    keymap.keys = vec![key];

    update_modifiers_from_compat(&mut keymap, &CompileOptions::default()).unwrap();

    assert_eq!(keymap.vmods[3], 0x40);
    match &keymap.keys[0].actions[0] {
        Action::SetMods(m) => assert_eq!(m.mask, 0x40),
        other => panic!("expected SetMods, got {other:?}"),
    }
}
