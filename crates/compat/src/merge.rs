//! The merge algebra (§4.1): field-level resolution shared by the
//! interpretation, indicator, and group-compat accumulators.

use crate::ast::{FileId, MergeMode};

/// Which side of a field collision won.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Keep the old value.
    KeepOld,
    /// Take the new value.
    UseNew,
}

/// The result of resolving one field: which side won, and whether a
/// collision diagnostic should be emitted (and under what label).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldResolution {
    /// Which side's value the caller should keep.
    pub outcome: Outcome,
    /// `Some("first" | "last")` if a collision diagnostic should be logged.
    pub collision: Option<&'static str>,
}

/// Implements `UseNewField` (§4.1):
///
/// 1. If `old` is undefined, use new, no collision.
/// 2. Else if `new` is defined: collide if same file id at `verbosity > 0`,
///    or `verbosity > 9` regardless; use new iff `new_merge != Augment`.
/// 3. Else keep old.
pub fn resolve_field(
    old_defined: bool,
    new_defined: bool,
    old_file_id: FileId,
    new_file_id: FileId,
    new_merge: MergeMode,
    verbosity: u8,
) -> FieldResolution {
    if !old_defined {
        return FieldResolution {
            outcome: Outcome::UseNew,
            collision: None,
        };
    }

    if !new_defined {
        return FieldResolution {
            outcome: Outcome::KeepOld,
            collision: None,
        };
    }

    let same_file = old_file_id == new_file_id;
    let should_report = (same_file && verbosity > 0) || verbosity > 9;
    let use_new = new_merge != MergeMode::Augment;

    FieldResolution {
        outcome: if use_new { Outcome::UseNew } else { Outcome::KeepOld },
        collision: should_report.then_some(if use_new { "last" } else { "first" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: FileId = FileId(1);
    const B: FileId = FileId(2);

    #[test]
    fn undefined_old_always_takes_new_silently() {
        let r = resolve_field(false, true, A, A, MergeMode::Override, 5);
        assert_eq!(r.outcome, Outcome::UseNew);
        assert_eq!(r.collision, None);
    }

    #[test]
    fn undefined_new_keeps_old_silently() {
        let r = resolve_field(true, false, A, A, MergeMode::Override, 5);
        assert_eq!(r.outcome, Outcome::KeepOld);
        assert_eq!(r.collision, None);
    }

    #[test]
    fn augment_keeps_old_on_conflict() {
        let r = resolve_field(true, true, A, A, MergeMode::Augment, 5);
        assert_eq!(r.outcome, Outcome::KeepOld);
        assert_eq!(r.collision, Some("first"));
    }

    #[test]
    fn override_takes_new_on_conflict() {
        let r = resolve_field(true, true, A, A, MergeMode::Override, 5);
        assert_eq!(r.outcome, Outcome::UseNew);
        assert_eq!(r.collision, Some("last"));
    }

    #[test]
    fn cross_file_collision_suppressed_at_low_verbosity() {
        let r = resolve_field(true, true, A, B, MergeMode::Override, 5);
        assert_eq!(r.collision, None);

        let loud = resolve_field(true, true, A, B, MergeMode::Override, 10);
        assert_eq!(loud.collision, Some("last"));
    }

    #[test]
    fn same_file_collision_suppressed_at_zero_verbosity() {
        let r = resolve_field(true, true, A, A, MergeMode::Override, 0);
        assert_eq!(r.collision, None);
    }
}
