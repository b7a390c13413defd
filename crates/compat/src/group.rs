//! Group-compatibility modifier masks (§3 GroupCompat, §4.4).

use crate::ast::{FileId, MergeMode};
use crate::diagnostics;

/// The resolved modifier mask for one keyboard group's compatibility state
/// (`group N = <mask-expr>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupCompat {
    /// `real_mods | VModsToReal(vmods)`, recomputed by the fixup pass.
    pub mask: u8,
    /// Real-modifier mask.
    pub real_mods: u8,
    /// Virtual-modifier mask.
    pub vmods: u16,
}

#[derive(Debug, Clone, Copy, Default)]
struct GroupCompatEntry {
    compat: GroupCompat,
    defined: bool,
    file_id: FileId,
    merge: MergeMode,
}

/// Accumulates the fixed-size per-group compat table (§4.4). Indexed
/// 0-based; the spec's groups are written 1-based by authors and converted
/// by the caller before reaching here.
#[derive(Debug)]
pub struct GroupCompatAccumulator {
    groups: Vec<GroupCompatEntry>,
}

impl GroupCompatAccumulator {
    /// Creates an accumulator sized for `num_groups` keyboard groups.
    pub fn new(num_groups: u8) -> Self {
        Self {
            groups: vec![GroupCompatEntry::default(); num_groups as usize],
        }
    }

    /// Implements `AddGroupCompat` (§4.4). `group` is 0-based.
    pub fn add(&mut self, group: usize, real_mods: u8, vmods: u16, file_id: FileId, merge: MergeMode, verbosity: u8) {
        let entry = &mut self.groups[group];

        if entry.defined && entry.compat.real_mods == real_mods && entry.compat.vmods == vmods {
            return;
        }

        if entry.defined {
            let should_report = (entry.file_id == file_id && verbosity > 0) || verbosity > 9;
            if should_report {
                let chose = if merge == MergeMode::Augment { "old" } else { "new" };
                diagnostics::warn(file_id, format!("compat map for group {} redefined; using {chose} definition", group + 1));
            }
        }

        if merge != MergeMode::Augment || !entry.defined {
            entry.compat = GroupCompat { mask: 0, real_mods, vmods };
            entry.file_id = file_id;
            entry.merge = merge;
            entry.defined = true;
        }
    }

    /// Folds every defined group of `self` into `into`, optionally forcing
    /// a merge mode first (`MergeIncludedCompatMaps`).
    pub fn fold_into(self, into: &mut GroupCompatAccumulator, merge_override: Option<MergeMode>, verbosity: u8) {
        for (group, mut entry) in self.groups.into_iter().enumerate() {
            if !entry.defined {
                continue;
            }
            if let Some(merge) = merge_override {
                entry.merge = merge;
            }
            into.add(group, entry.compat.real_mods, entry.compat.vmods, entry.file_id, entry.merge, verbosity);
        }
    }

    /// Flushes into the fixed-size table the keymap carries (§4.4,
    /// undefined groups default to an empty mask).
    pub fn flush(self) -> Vec<GroupCompat> {
        self.groups.into_iter().map(|entry| entry.compat).collect()
    }
}
