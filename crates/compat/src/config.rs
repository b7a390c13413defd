//! Compiler-wide configuration (ambient stack — see `SPEC_FULL.md` §A.3).
//!
//! This is the compat compiler's own tuning knobs, not an end-user
//! keybinding configuration format: no file I/O, no environment variables,
//! matching §6 ("no files are opened directly by the core; no environment
//! variables are read").

/// Number of numbered indicator (LED) slots, fixed by the wire format.
pub const NUM_INDICATORS: usize = 32;

/// Options controlling a single compat-map compile.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Diagnostic verbosity. Drives the §4.1 collision-reporting rule:
    /// collisions within the same file are only reported above 0; cross-file
    /// collisions only above 9.
    pub verbosity: u8,
    /// Number of keyboard groups the keymap under construction has.
    pub num_groups: u8,
    /// Cap on `num_groups * key.width` slots `ApplyInterpsToKey` (§4.11) will
    /// flatten per key before erroring out (source uses 32).
    pub max_interps_per_key: usize,
    /// Running error-count threshold past which the statement dispatcher
    /// abandons the compile (§4.6).
    pub abandon_after: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            verbosity: 0,
            num_groups: 4,
            max_interps_per_key: 32,
            abandon_after: 10,
        }
    }
}

impl CompileOptions {
    /// Returns whether a collision between two definitions should be
    /// reported, given whether they share a file id (§4.1 field rule step 2).
    pub fn should_report_collision(&self, same_file: bool) -> bool {
        (same_file && self.verbosity > 0) || self.verbosity > 9
    }
}
